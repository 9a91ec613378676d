use skinseer_common::{Ellipse, SimParams, Vec2};

/// Subsurface nevus modelled as an axis-aligned ellipse.
///
/// The stored frame keeps `y` at the lesion's surface-side edge, with the
/// body hanging `height` below it. Geometric queries go through
/// [`Lesion::tissue_ellipse`], which converts that frame to a tissue-space
/// ellipse spanning `[y - height, y]` vertically.
#[derive(Debug, Clone, PartialEq)]
pub struct Lesion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub valid: bool,
    initial_x: f32,
}

impl Lesion {
    pub fn new(x: f32, y: f32, width: f32, height: f32, valid: bool) -> Self {
        Lesion { x, y, width, height, valid, initial_x: x }
    }

    pub fn from_params(params: &SimParams) -> Self {
        Self::new(
            params.nevus_x,
            params.lesion_top_y(),
            params.nevus_width,
            params.nevus_height,
            params.nevus_valid,
        )
    }

    /// Deep edge of the lesion in tissue coordinates.
    pub fn bottom(&self) -> f32 {
        self.y - self.height
    }

    /// Coordinate flip from the stored frame into tissue space.
    pub fn tissue_ellipse(&self) -> Ellipse {
        Ellipse::from_bounds(self.x, self.bottom(), self.width, self.height)
    }

    /// True if a probe disk of `probe_radius` around `p` touches the lesion.
    /// An invalid lesion never contains anything.
    pub fn contains_point(&self, p: Vec2, probe_radius: f32) -> bool {
        if !self.valid {
            return false;
        }
        self.tissue_ellipse().intersects_disk(p, probe_radius)
    }

    /// Moves the lesion horizontally, mirroring scanner motion.
    pub fn advance(&mut self, dx: f32) {
        self.x += dx;
    }

    /// Restores the initial horizontal position only.
    pub fn reset(&mut self) {
        self.x = self.initial_x;
    }

    /// True once the lesion has moved past the scanner's horizontal extent.
    pub fn out_of_range(&self, scanner_width: u32) -> bool {
        self.x >= scanner_width as f32
    }

    /// The lesion reaches below the epidermis/dermis boundary.
    pub fn penetrates_dermis(&self, dermis_thickness: f32) -> bool {
        self.bottom() < dermis_thickness
    }
}
