use crate::params::SimParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// A view of the scanner captured at one observer notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSnapshot {
    /// Running notification count at capture time.
    pub notification: u64,
    /// Number of completed scan steps.
    pub scan_step: u64,
    pub lesion_valid: bool,
    /// Lesion bounds in tissue coordinates: left edge and deep (lower) edge.
    pub lesion_left: f32,
    pub lesion_bottom: f32,
    pub lesion_width: f32,
    pub lesion_height: f32,
    /// Positions visited by the in-flight photon, empty between walks.
    pub photon_trace: Vec<(f32, f32)>,
    pub photon_counts: Vec<u32>,
}

/// Recorded scan: the parameters that produced it plus captured snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub params: SimParams,
    pub snapshots: Vec<ScanSnapshot>,
}

/// On-disk encodings for a [`Recording`], chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingFormat {
    Json,
    Bincode,
    MessagePack,
}

impl RecordingFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("bin") => RecordingFormat::Bincode,
            Some(ext) if ext.eq_ignore_ascii_case("msgpack") => RecordingFormat::MessagePack,
            _ => RecordingFormat::Json,
        }
    }
}

impl Recording {
    pub fn new(params: SimParams) -> Self {
        Recording { params, snapshots: Vec::new() }
    }

    /// Writes the recording using the encoding implied by the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref)
            .with_context(|| format!("Failed to create recording file '{}'", path_ref.display()))?;
        let mut writer = BufWriter::new(file);
        match RecordingFormat::from_path(path_ref) {
            RecordingFormat::Json => serde_json::to_writer(&mut writer, self)
                .with_context(|| format!("Failed to write JSON recording to '{}'", path_ref.display()))?,
            RecordingFormat::Bincode => bincode::serialize_into(&mut writer, self)
                .with_context(|| format!("Failed to write bincode recording to '{}'", path_ref.display()))?,
            RecordingFormat::MessagePack => rmp_serde::encode::write(&mut writer, self)
                .with_context(|| format!("Failed to write MessagePack recording to '{}'", path_ref.display()))?,
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads a recording previously written by [`Recording::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let file = File::open(path_ref)
            .with_context(|| format!("Failed to open recording file '{}'", path_ref.display()))?;
        let reader = BufReader::new(file);
        let recording = match RecordingFormat::from_path(path_ref) {
            RecordingFormat::Json => serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse JSON recording '{}'", path_ref.display()))?,
            RecordingFormat::Bincode => bincode::deserialize_from(reader)
                .with_context(|| format!("Failed to parse bincode recording '{}'", path_ref.display()))?,
            RecordingFormat::MessagePack => rmp_serde::decode::from_read(reader)
                .with_context(|| format!("Failed to parse MessagePack recording '{}'", path_ref.display()))?,
        };
        Ok(recording)
    }
}
