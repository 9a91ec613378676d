use crate::scanner::{ScanStatus, ScannerEngine};
use skinseer_common::{Recording, ScanSnapshot, SimParams};
use std::cell::RefCell;
use std::rc::Rc;

/// Collects snapshots from scanner notifications for later rendering.
#[derive(Debug)]
pub struct FrameRecorder {
    interval: u64,
    recording: Recording,
}

impl FrameRecorder {
    /// Keeps every `interval`-th notification (at least every one).
    pub fn new(params: SimParams, interval: u64) -> Self {
        FrameRecorder {
            interval: interval.max(1),
            recording: Recording::new(params),
        }
    }

    pub fn capture(&mut self, status: &ScanStatus<'_>) {
        if status.notification % self.interval != 0 {
            return;
        }
        self.recording.snapshots.push(snapshot_of(status));
    }

    pub fn len(&self) -> usize {
        self.recording.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recording.snapshots.is_empty()
    }

    pub fn into_recording(self) -> Recording {
        self.recording
    }

    /// Installs a shared recorder as the engine's observer.
    pub fn attach(engine: &mut ScannerEngine, interval: u64) -> Rc<RefCell<FrameRecorder>> {
        let recorder = Rc::new(RefCell::new(FrameRecorder::new(engine.params().clone(), interval)));
        let sink = Rc::clone(&recorder);
        engine.set_observer(move |status| sink.borrow_mut().capture(status));
        recorder
    }
}

fn snapshot_of(status: &ScanStatus<'_>) -> ScanSnapshot {
    ScanSnapshot {
        notification: status.notification,
        scan_step: status.scan_step,
        lesion_valid: status.lesion.valid,
        lesion_left: status.lesion.x,
        lesion_bottom: status.lesion.bottom(),
        lesion_width: status.lesion.width,
        lesion_height: status.lesion.height,
        photon_trace: status
            .photon
            .map(|p| p.trace.iter().map(|v| (v.x, v.y)).collect())
            .unwrap_or_default(),
        photon_counts: status.detector.counts().to_vec(),
    }
}
