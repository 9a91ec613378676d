//! Monte Carlo simulation of a reflectance skin scanner.
//!
//! Photons are emitted from a source resting on the skin surface, random-walk
//! through the epidermis, dermis and an optional embedded nevus, and are
//! counted by a row of detectors when they re-emerge. The lesion is moved
//! past the source between scan steps; the final counter values are the
//! simulation's output.

pub mod dataset;
pub mod detector;
pub mod distribution;
pub mod lesion;
pub mod photon;
pub mod recorder;
pub mod report;
pub mod scanner;

pub use dataset::{DatasetSample, Label};
pub use detector::DetectorArray;
pub use distribution::RandomDistribution;
pub use lesion::Lesion;
pub use photon::{Photon, PhotonSource, Region, WalkEvent};
pub use recorder::FrameRecorder;
pub use scanner::{ScanObserver, ScanStatus, ScannerEngine, WalkTally};
pub use skinseer_common::SimParams;
