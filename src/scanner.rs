use crate::detector::DetectorArray;
use crate::distribution::RandomDistribution;
use crate::lesion::Lesion;
use crate::photon::{Photon, PhotonSource, WalkEvent};
use anyhow::{Context, Result};
use log::debug;
use skinseer_common::SimParams;

/// Read-only view handed to the observer after every sub-step.
#[derive(Debug, Clone, Copy)]
pub struct ScanStatus<'a> {
    /// Notifications delivered so far, including this one.
    pub notification: u64,
    /// Completed scan steps.
    pub scan_step: u64,
    /// Walker outcome that triggered this notification; `None` for lesion
    /// advances and the out-of-range notice.
    pub event: Option<WalkEvent>,
    pub lesion: &'a Lesion,
    pub detector: &'a DetectorArray,
    pub photon: Option<&'a Photon>,
}

/// Single-subscriber observer callback.
pub type ScanObserver = Box<dyn FnMut(&ScanStatus<'_>)>;

/// Running totals of walk outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkTally {
    pub emitted: u64,
    pub absorbed: u64,
    pub exited: u64,
    pub detected: u64,
}

impl WalkTally {
    fn record(&mut self, event: WalkEvent) {
        match event {
            WalkEvent::Emitted => self.emitted += 1,
            WalkEvent::Moved => {}
            WalkEvent::Absorbed(_) => self.absorbed += 1,
            WalkEvent::Exited => self.exited += 1,
            WalkEvent::Detected(_) => self.detected += 1,
        }
    }
}

/// Moves the lesion past a fixed source/detector pair, emitting photons at
/// each scan step and accumulating detector counts.
pub struct ScannerEngine {
    params: SimParams,
    source: PhotonSource,
    detector: DetectorArray,
    lesion: Lesion,
    observer: Option<ScanObserver>,
    scan_step: u64,
    notifications: u64,
    tally: WalkTally,
}

impl ScannerEngine {
    /// Creates an engine with an OS-seeded random source.
    pub fn new(params: &SimParams) -> Result<Self> {
        Self::with_random(params, RandomDistribution::new())
    }

    /// Creates an engine driven by the given random source.
    pub fn with_random(params: &SimParams, random: RandomDistribution) -> Result<Self> {
        params.validate().context("Cannot build scanner from invalid parameters")?;
        Ok(ScannerEngine {
            params: params.clone(),
            source: PhotonSource::new(params, random),
            detector: DetectorArray::from_params(params),
            lesion: Lesion::from_params(params),
            observer: None,
            scan_step: 0,
            notifications: 0,
            tally: WalkTally::default(),
        })
    }

    /// Installs `observer`, replacing any previous one.
    pub fn set_observer<F>(&mut self, observer: F)
    where
        F: FnMut(&ScanStatus<'_>) + 'static,
    {
        self.observer = Some(Box::new(observer));
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    /// Runs one scan step. Returns false, without touching any photon or
    /// counter, once the lesion has moved past the scanner.
    pub fn step(&mut self) -> bool {
        if self.lesion.out_of_range(self.params.scanner_width) {
            self.notify(None);
            return false;
        }

        for _ in 0..self.params.photon_emission_rate {
            loop {
                let event = self.source.advance(&self.lesion, &mut self.detector);
                self.tally.record(event);
                self.notify(Some(event));
                if !event.is_alive() {
                    break;
                }
            }
        }

        self.lesion.advance(self.params.scanner_speed);
        self.scan_step += 1;
        self.notify(None);
        true
    }

    /// Steps up to `steps` times, stopping early when the scan is exhausted.
    /// Returns the number of steps that ran.
    pub fn run(&mut self, steps: u64) -> u64 {
        let mut completed = 0;
        while completed < steps && self.step() {
            completed += 1;
        }
        debug!(
            "Ran {} of {} steps: emitted {}, absorbed {}, exited {}, detected {}",
            completed, steps, self.tally.emitted, self.tally.absorbed, self.tally.exited, self.tally.detected
        );
        completed
    }

    /// Clears the in-flight photon, zeroes the counters and returns the
    /// lesion to its starting position.
    pub fn reset(&mut self) {
        self.source.clear_photon();
        self.detector.reset();
        self.lesion.reset();
        self.scan_step = 0;
        self.tally = WalkTally::default();
    }

    fn notify(&mut self, event: Option<WalkEvent>) {
        self.notifications += 1;
        if let Some(mut observer) = self.observer.take() {
            let status = ScanStatus {
                notification: self.notifications,
                scan_step: self.scan_step,
                event,
                lesion: &self.lesion,
                detector: &self.detector,
                photon: self.source.photon(),
            };
            observer(&status);
            self.observer = Some(observer);
        }
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn detector(&self) -> &DetectorArray {
        &self.detector
    }

    pub fn lesion(&self) -> &Lesion {
        &self.lesion
    }

    pub fn photon_source(&self) -> &PhotonSource {
        &self.source
    }

    pub fn scan_step(&self) -> u64 {
        self.scan_step
    }

    pub fn tally(&self) -> WalkTally {
        self.tally
    }
}
