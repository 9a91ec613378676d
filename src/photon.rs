use crate::detector::DetectorArray;
use crate::distribution::RandomDistribution;
use crate::lesion::Lesion;
use log::trace;
use skinseer_common::{direction_from_degrees, LayerOptics, SimParams, Vec2};

/// A photon in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct Photon {
    /// Heading in degrees, accumulated across scatter events.
    pub angle: f64,
    pub direction: Vec2,
    /// Positions visited so far; the last entry is the current position.
    pub trace: Vec<Vec2>,
}

impl Photon {
    fn new(angle: f64, position: Vec2) -> Self {
        Photon {
            angle,
            direction: direction_from_degrees(angle),
            trace: vec![position],
        }
    }

    pub fn position(&self) -> Vec2 {
        // Trace is never empty while the photon exists.
        self.trace[self.trace.len() - 1]
    }

    fn turn(&mut self, delta_deg: f64) {
        self.angle += delta_deg;
        self.direction = direction_from_degrees(self.angle);
    }
}

/// Tissue region a photon occupies at the start of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Lesion,
    Epidermis,
    Dermis,
    Outside,
}

/// Result of one walker invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkEvent {
    Emitted,
    Moved,
    Absorbed(Region),
    Exited,
    Detected(usize),
}

impl WalkEvent {
    /// False once the photon has terminated.
    pub fn is_alive(self) -> bool {
        matches!(self, WalkEvent::Emitted | WalkEvent::Moved)
    }
}

/// Emits photons and walks each one through the tissue until it terminates.
#[derive(Debug, Clone)]
pub struct PhotonSource {
    center: Vec2,
    epidermis_y: f32,
    dermis_y: f32,
    scanner_width: f32,
    scanner_height: f32,
    photon_radius: f32,
    photon_speed: f32,
    min_emission_angle: f64,
    max_emission_angle: f64,
    epidermis: LayerOptics,
    dermis: LayerOptics,
    nevus: LayerOptics,
    photon: Option<Photon>,
    random: RandomDistribution,
}

impl PhotonSource {
    pub fn new(params: &SimParams, random: RandomDistribution) -> Self {
        PhotonSource {
            center: params.source_center(),
            epidermis_y: params.epidermis_y(),
            dermis_y: params.dermis_y(),
            scanner_width: params.scanner_width as f32,
            scanner_height: params.scanner_height as f32,
            photon_radius: params.photon_radius,
            photon_speed: params.photon_speed,
            min_emission_angle: params.photon_min_emission_angle as f64,
            max_emission_angle: params.photon_max_emission_angle as f64,
            epidermis: params.epidermis_optics(),
            dermis: params.dermis_optics(),
            nevus: params.nevus_optics(),
            photon: None,
            random,
        }
    }

    /// Center of the source disk resting on the surface.
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Surface plane; upward photons above it may be detected.
    pub fn epidermis_y(&self) -> f32 {
        self.epidermis_y
    }

    /// Epidermis/dermis boundary.
    pub fn dermis_y(&self) -> f32 {
        self.dermis_y
    }

    /// The photon currently in flight, if any.
    pub fn photon(&self) -> Option<&Photon> {
        self.photon.as_ref()
    }

    /// Drops any in-flight photon and its trace.
    pub fn clear_photon(&mut self) {
        self.photon = None;
    }

    /// Emits a photon when none is live, otherwise advances it one step.
    /// Returns false once the photon has terminated.
    pub fn update_photon(&mut self, lesion: &Lesion, detector: &mut DetectorArray) -> bool {
        self.advance(lesion, detector).is_alive()
    }

    /// Same as [`PhotonSource::update_photon`] but reports what happened.
    pub fn advance(&mut self, lesion: &Lesion, detector: &mut DetectorArray) -> WalkEvent {
        match self.photon.take() {
            None => {
                self.emit();
                WalkEvent::Emitted
            }
            Some(photon) => self.step(photon, lesion, detector),
        }
    }

    fn emit(&mut self) {
        let angle = self.random.between(self.min_emission_angle, self.max_emission_angle);
        let direction = direction_from_degrees(angle);
        let start = self.center + direction * self.photon_radius;
        self.photon = Some(Photon::new(angle, start));
    }

    /// Region that governs interactions at `p`. The lesion wins over the
    /// layers, including where it rises above the epidermis boundary.
    pub fn classify(&self, p: Vec2, lesion: &Lesion) -> Region {
        if lesion.contains_point(p, self.photon_radius) {
            return Region::Lesion;
        }
        if p.x >= 0.0 && p.x < self.scanner_width {
            if p.y <= self.epidermis_y && p.y > self.dermis_y {
                return Region::Epidermis;
            }
            if p.y <= self.dermis_y && p.y >= 0.0 {
                return Region::Dermis;
            }
        }
        Region::Outside
    }

    fn optics(&self, region: Region) -> Option<LayerOptics> {
        match region {
            Region::Lesion => Some(self.nevus),
            Region::Epidermis => Some(self.epidermis),
            Region::Dermis => Some(self.dermis),
            Region::Outside => None,
        }
    }

    fn step(&mut self, mut photon: Photon, lesion: &Lesion, detector: &mut DetectorArray) -> WalkEvent {
        let p1 = photon.position();
        let region = self.classify(p1, lesion);

        // Absorption and scatter are independent coin flips, in that order.
        if let Some(optics) = self.optics(region) {
            if self.random.chance(optics.absorption_probability) {
                trace!("Photon absorbed in {:?} at ({:.1}, {:.1})", region, p1.x, p1.y);
                return WalkEvent::Absorbed(region);
            }
            if self.random.chance(optics.scatter_probability) {
                let delta = self
                    .random
                    .scatter_offset(optics.scatter_angle_mean, optics.scatter_angle_sigma);
                photon.turn(delta);
            }
        }

        let p2 = p1 + photon.direction * self.photon_speed;
        if p2.x < 0.0 || p2.x >= self.scanner_width || p2.y < 0.0 || p2.y >= self.scanner_height {
            trace!("Photon left the scanner at ({:.1}, {:.1})", p2.x, p2.y);
            return WalkEvent::Exited;
        }

        if p2.y > self.epidermis_y && photon.direction.y > 0.0 {
            if let Some(idx) = detector.detect(p2) {
                trace!("Photon detected by counter {} at x={:.1}", idx, p2.x);
                return WalkEvent::Detected(idx);
            }
        }

        photon.trace.push(p2);
        self.photon = Some(photon);
        WalkEvent::Moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(params: &SimParams, seed: u64) -> PhotonSource {
        PhotonSource::new(params, RandomDistribution::seeded(seed))
    }

    fn place(source: &mut PhotonSource, angle: f64, at: Vec2) {
        source.photon = Some(Photon::new(angle, at));
    }

    #[test]
    fn first_call_emits_within_angle_range() {
        let params = SimParams::default();
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        for seed in 0..50 {
            let mut source = source_with(&params, seed);
            assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Emitted);
            let photon = source.photon().unwrap();
            assert!((270.0..360.0).contains(&photon.angle));
            assert_eq!(photon.trace.len(), 1);
            let offset = photon.position().distance(source.center());
            assert!((offset - params.photon_radius).abs() < 1e-4);
        }
    }

    #[test]
    fn classification_regions() {
        let params = SimParams::default();
        let mut lesion = Lesion::from_params(&params);
        let source = source_with(&params, 1);
        assert_eq!(source.classify(Vec2::new(230.0, 95.0), &lesion), Region::Lesion);
        assert_eq!(source.classify(Vec2::new(50.0, 175.0), &lesion), Region::Epidermis);
        assert_eq!(source.classify(Vec2::new(50.0, 75.0), &lesion), Region::Dermis);
        assert_eq!(source.classify(Vec2::new(50.0, 0.0), &lesion), Region::Dermis);
        assert_eq!(source.classify(Vec2::new(50.0, 190.0), &lesion), Region::Outside);
        assert_eq!(source.classify(Vec2::new(-1.0, 100.0), &lesion), Region::Outside);
        assert_eq!(source.classify(Vec2::new(230.0, 60.0), &lesion), Region::Lesion);
        lesion.valid = false;
        assert_eq!(source.classify(Vec2::new(230.0, 60.0), &lesion), Region::Dermis);
    }

    #[test]
    fn absorbing_lesion_terminates_entering_photon() {
        let params = SimParams {
            nevus_photon_absorption_probability: 1.0,
            nevus_photon_scatter_probability: 0.0,
            ..SimParams::default()
        };
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 2);
        place(&mut source, 0.0, Vec2::new(230.0, 95.0));
        assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Absorbed(Region::Lesion));
        assert!(source.photon().is_none());
        assert_eq!(det.total(), 0);
    }

    #[test]
    fn transparent_layers_move_in_a_straight_line() {
        let params = SimParams {
            epidermis_photon_scatter_probability: 0.0,
            dermis_photon_scatter_probability: 0.0,
            nevus_valid: false,
            ..SimParams::default()
        };
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 4);
        place(&mut source, 0.0, Vec2::new(50.0, 100.0));
        for i in 1..=10 {
            assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Moved);
            let p = source.photon().unwrap().position();
            assert!((p.x - (50.0 + i as f32)).abs() < 1e-4);
            assert!((p.y - 100.0).abs() < 1e-4);
        }
        assert_eq!(source.photon().unwrap().trace.len(), 11);
    }

    #[test]
    fn leaving_the_scanner_ends_the_walk() {
        let params = SimParams::default();
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 5);
        place(&mut source, 180.0, Vec2::new(0.5, 200.0));
        assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Exited);
        assert!(source.photon().is_none());
    }

    #[test]
    fn upward_photon_over_band_is_detected() {
        let params = SimParams::default();
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 6);
        place(&mut source, 90.0, Vec2::new(160.0, 175.5));
        assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Detected(0));
        assert_eq!(det.counts()[0], 1);
        assert!(source.photon().is_none());
    }

    #[test]
    fn upward_photon_outside_bands_keeps_flying() {
        let params = SimParams::default();
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 6);
        place(&mut source, 90.0, Vec2::new(100.0, 175.5));
        assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Moved);
        assert_eq!(det.total(), 0);
    }

    #[test]
    fn downward_photon_above_surface_is_not_detected() {
        let params = SimParams::default();
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 8);
        place(&mut source, 270.0, Vec2::new(160.0, 180.0));
        assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Moved);
        assert_eq!(det.total(), 0);
    }

    /// Parameters with every absorption and scatter probability zeroed.
    fn inert_params() -> SimParams {
        SimParams {
            epidermis_photon_absorption_probability: 0.0,
            epidermis_photon_scatter_probability: 0.0,
            dermis_photon_absorption_probability: 0.0,
            dermis_photon_scatter_probability: 0.0,
            nevus_photon_absorption_probability: 0.0,
            nevus_photon_scatter_probability: 0.0,
            ..SimParams::default()
        }
    }

    const EPIDERMIS_POINT: Vec2 = Vec2 { x: 50.0, y: 150.0 };
    const DERMIS_POINT: Vec2 = Vec2 { x: 50.0, y: 50.0 };
    const LESION_POINT: Vec2 = Vec2 { x: 230.0, y: 95.0 };

    fn assert_turns_at(params: &SimParams, at: Vec2) {
        let lesion = Lesion::from_params(params);
        let mut det = DetectorArray::from_params(params);
        let mut source = source_with(params, 21);
        place(&mut source, 0.0, at);
        assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Moved);
        let photon = source.photon().unwrap();
        assert_ne!(photon.angle, 0.0, "no turn at ({}, {})", at.x, at.y);
        // The move follows the new heading.
        let expected = at + direction_from_degrees(photon.angle) * params.photon_speed;
        assert!((photon.position().x - expected.x).abs() < 1e-4);
        assert!((photon.position().y - expected.y).abs() < 1e-4);
    }

    #[test]
    fn epidermis_scatter_turns_photon() {
        let params = SimParams {
            epidermis_photon_scatter_probability: 1.0,
            epidermis_photon_scatter_angle_sigma: 50.0,
            ..inert_params()
        };
        assert_turns_at(&params, EPIDERMIS_POINT);
        // Only the epidermis scatters.
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 22);
        place(&mut source, 0.0, DERMIS_POINT);
        source.advance(&lesion, &mut det);
        assert_eq!(source.photon().unwrap().angle, 0.0);
    }

    #[test]
    fn dermis_scatter_turns_photon() {
        let params = SimParams {
            dermis_photon_scatter_probability: 1.0,
            dermis_photon_scatter_angle_sigma: 25.0,
            ..inert_params()
        };
        assert_turns_at(&params, DERMIS_POINT);
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 23);
        place(&mut source, 0.0, EPIDERMIS_POINT);
        source.advance(&lesion, &mut det);
        assert_eq!(source.photon().unwrap().angle, 0.0);
    }

    #[test]
    fn lesion_scatter_turns_photon() {
        let params = SimParams {
            nevus_photon_scatter_probability: 1.0,
            nevus_photon_scatter_angle_sigma: 50.0,
            ..inert_params()
        };
        assert_turns_at(&params, LESION_POINT);
    }

    #[test]
    fn each_layer_absorbs_with_its_own_probability() {
        let epidermis_only = SimParams {
            epidermis_photon_absorption_probability: 1.0,
            ..inert_params()
        };
        let dermis_only = SimParams {
            dermis_photon_absorption_probability: 1.0,
            ..inert_params()
        };
        for (params, absorbing, at, passing) in [
            (&epidermis_only, Region::Epidermis, EPIDERMIS_POINT, DERMIS_POINT),
            (&dermis_only, Region::Dermis, DERMIS_POINT, EPIDERMIS_POINT),
        ] {
            let lesion = Lesion::from_params(params);
            let mut det = DetectorArray::from_params(params);
            let mut source = source_with(params, 24);
            place(&mut source, 0.0, at);
            assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Absorbed(absorbing));
            assert!(source.photon().is_none());

            place(&mut source, 0.0, passing);
            assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Moved);
        }
    }

    #[test]
    fn absorption_is_decided_before_scatter() {
        let absorb_only = SimParams {
            epidermis_photon_absorption_probability: 1.0,
            ..inert_params()
        };
        let absorb_and_scatter = SimParams {
            epidermis_photon_scatter_probability: 1.0,
            epidermis_photon_scatter_angle_sigma: 50.0,
            ..absorb_only.clone()
        };
        let lesion = Lesion::from_params(&absorb_only);
        let mut det = DetectorArray::from_params(&absorb_only);

        let mut plain = source_with(&absorb_only, 25);
        let mut both = source_with(&absorb_and_scatter, 25);
        for source in [&mut plain, &mut both] {
            place(source, 0.0, EPIDERMIS_POINT);
            assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Absorbed(Region::Epidermis));
            assert_eq!(source.advance(&lesion, &mut det), WalkEvent::Emitted);
        }
        // No scatter draw was taken for the absorbed photon, so both
        // generators are still in step.
        assert_eq!(plain.photon().unwrap().angle, both.photon().unwrap().angle);
    }

    #[test]
    fn walks_always_terminate() {
        let params = SimParams::default();
        let lesion = Lesion::from_params(&params);
        let mut det = DetectorArray::from_params(&params);
        let mut source = source_with(&params, 10);
        for _ in 0..200 {
            let mut steps = 0usize;
            while source.update_photon(&lesion, &mut det) {
                steps += 1;
                assert!(steps < 1_000_000, "photon walk did not terminate");
            }
            assert!(source.photon().is_none());
        }
    }
}
