use skinseer_common::{SimParams, Vec2};

/// Row of adjacent photon counters lying on the tissue surface.
///
/// Counter `i` covers the half-open band `[x0 + i*w, x0 + (i+1)*w)`.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorArray {
    origin_x: f32,
    band_width: f32,
    counts: Vec<u32>,
}

impl DetectorArray {
    pub fn new(origin_x: f32, band_width: f32, num_counters: usize) -> Self {
        DetectorArray {
            origin_x,
            band_width,
            counts: vec![0; num_counters],
        }
    }

    pub fn from_params(params: &SimParams) -> Self {
        Self::new(
            params.photon_detector_x,
            params.photon_detector_width,
            params.num_photon_counters as usize,
        )
    }

    /// Left edge of counter `idx`.
    pub fn band_start(&self, idx: usize) -> f32 {
        self.origin_x + self.band_width * idx as f32
    }

    pub fn band_width(&self) -> f32 {
        self.band_width
    }

    /// Total horizontal extent covered by the array.
    pub fn span(&self) -> f32 {
        self.band_width * self.counts.len() as f32
    }

    /// Counts the photon at `point` in the first band containing `point.x`.
    ///
    /// Returns the counter index, or `None` when the point misses every band.
    pub fn detect(&mut self, point: Vec2) -> Option<usize> {
        for idx in 0..self.counts.len() {
            let start = self.band_start(idx);
            if point.x >= start && point.x < start + self.band_width {
                self.counts[idx] += 1;
                return Some(idx);
            }
        }
        None
    }

    pub fn reset(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }
}
