pub mod distributions;
pub mod params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use distributions::{DistributionSet, LesionDistribution};
pub use params::{LayerOptics, ParamError, SimParams};
pub use snapshot::{Recording, RecordingFormat, ScanSnapshot};
pub use vecmath::{Ellipse, Vec2, direction_from_degrees};
