use skinseer_common::{DistributionSet, LesionDistribution, SimParams};
use skinseer_sim::dataset::{self, Label};
use skinseer_sim::{RandomDistribution, Region, ScannerEngine, WalkEvent};
use std::cell::RefCell;
use std::rc::Rc;

fn lesion_free_params() -> SimParams {
    SimParams {
        scanner_width: 450,
        scanner_height: 250,
        epidermis_thickness: 100.0,
        dermis_thickness: 75.0,
        nevus_valid: false,
        photon_emission_rate: 3,
        ..SimParams::default()
    }
}

#[test]
fn lesion_free_scan_is_always_ok() {
    let set = DistributionSet::new(vec![LesionDistribution {
        width_mean: 0.0,
        width_sigma: 0.0,
        height_mean: 0.0,
        height_sigma: 0.0,
        depth_mean: 0.0,
        depth_sigma: 0.0,
        frequency: 1.0,
    }])
    .unwrap();
    let params = lesion_free_params();
    let steps = 20;
    let mut random = RandomDistribution::seeded(2024);
    for _ in 0..10 {
        let sample = dataset::generate_sample(&params, &set, steps, &mut random).unwrap();
        assert_eq!(sample.label, Label::Ok);
        let total: u64 = sample.counts.iter().map(|&c| c as u64).sum();
        assert!(total <= steps * params.photon_emission_rate as u64);
    }
}

#[test]
fn fully_absorbing_lesion_never_yields_detection_after_entry() {
    let params = SimParams {
        nevus_valid: true,
        nevus_width: 60.0,
        nevus_height: 120.0,
        nevus_epidermis_depth: 20.0,
        nevus_photon_absorption_probability: 1.0,
        nevus_photon_scatter_probability: 0.0,
        photon_emission_rate: 20,
        ..SimParams::default()
    };
    let mut scanner = ScannerEngine::with_random(&params, RandomDistribution::seeded(77)).unwrap();

    // Per walk: did the photon enter the lesion, and how did it end?
    let walks: Rc<RefCell<Vec<(bool, WalkEvent)>>> = Rc::new(RefCell::new(Vec::new()));
    let entered = Rc::new(RefCell::new(false));
    let (walks_sink, entered_flag) = (Rc::clone(&walks), Rc::clone(&entered));
    let source_probe = skinseer_sim::PhotonSource::new(&params, RandomDistribution::seeded(0));
    scanner.set_observer(move |status| {
        if let Some(photon) = status.photon {
            if source_probe.classify(photon.position(), status.lesion) == Region::Lesion {
                *entered_flag.borrow_mut() = true;
            }
        }
        if let Some(event) = status.event {
            if !event.is_alive() {
                let was_inside = std::mem::take(&mut *entered_flag.borrow_mut());
                walks_sink.borrow_mut().push((was_inside, event));
            }
        }
    });
    scanner.run(10);

    let walks = walks.borrow();
    assert_eq!(walks.len(), 200);
    for (was_inside, event) in walks.iter() {
        if *was_inside {
            assert_eq!(*event, WalkEvent::Absorbed(Region::Lesion));
        }
    }
    assert!(walks.iter().any(|(inside, _)| *inside), "no photon reached the lesion");
}

#[test]
fn scan_stops_once_lesion_passes_scanner() {
    let params = SimParams {
        scanner_speed: 25.0,
        nevus_x: 300.0,
        ..lesion_free_params()
    };
    let mut scanner = ScannerEngine::with_random(&params, RandomDistribution::seeded(8)).unwrap();
    let completed = scanner.run(1000);
    // 300 + 6 * 25 = 450.
    assert_eq!(completed, 6);
    let counts = scanner.detector().counts().to_vec();
    assert!(!scanner.step());
    assert_eq!(scanner.detector().counts(), counts.as_slice());
}

#[test]
fn counts_never_decrease_across_steps() {
    let params = SimParams { photon_emission_rate: 5, ..SimParams::default() };
    let mut scanner = ScannerEngine::with_random(&params, RandomDistribution::seeded(31)).unwrap();
    let mut previous = scanner.detector().counts().to_vec();
    for _ in 0..25 {
        scanner.step();
        let current = scanner.detector().counts().to_vec();
        for (before, after) in previous.iter().zip(&current) {
            assert!(after >= before);
        }
        previous = current;
    }
}
