use crate::distribution::RandomDistribution;
use crate::lesion::Lesion;
use crate::scanner::ScannerEngine;
use anyhow::Result;
use indicatif::ProgressBar;
use log::debug;
use rayon::prelude::*;
use skinseer_common::{DistributionSet, LesionDistribution, SimParams};
use std::io::Write;

/// Classifier label attached to each generated scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Danger,
    Ok,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::Danger => "danger",
            Label::Ok => "ok",
        }
    }

    /// A configured lesion is dangerous when its deep edge reaches past the
    /// epidermis/dermis boundary.
    pub fn classify(lesion_configured: bool, lesion: &Lesion, dermis_thickness: f32) -> Self {
        if lesion_configured && lesion.penetrates_dermis(dermis_thickness) {
            Label::Danger
        } else {
            Label::Ok
        }
    }
}

/// One labeled training vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSample {
    pub counts: Vec<u32>,
    pub label: Label,
    /// Index of the distribution entry the sample was drawn from.
    pub distribution: usize,
}

/// Copy of `base` with the lesion fields drawn from `entry`.
pub fn sample_params(base: &SimParams, entry: &LesionDistribution, random: &mut RandomDistribution) -> SimParams {
    let mut params = base.clone();
    if entry.has_lesion() {
        params.nevus_valid = true;
        params.nevus_width = random.sample(entry.width_mean, entry.width_sigma) as f32;
        params.nevus_height = random.sample(entry.height_mean, entry.height_sigma) as f32;
        params.nevus_epidermis_depth = random.sample(entry.depth_mean, entry.depth_sigma) as f32;
    } else {
        params.nevus_valid = false;
    }
    params
}

/// Draws a distribution entry, scans a lesion sized from it for up to
/// `steps` steps and labels the resulting counts.
pub fn generate_sample(
    base: &SimParams,
    set: &DistributionSet,
    steps: u64,
    random: &mut RandomDistribution,
) -> Result<DatasetSample> {
    let distribution = set.select(random.uniform_f32());
    let entry = &set.entries[distribution];
    let params = sample_params(base, entry, random);

    let mut scanner = ScannerEngine::with_random(&params, random.fork())?;
    scanner.run(steps);

    let label = Label::classify(entry.has_lesion(), scanner.lesion(), params.dermis_thickness);
    Ok(DatasetSample {
        counts: scanner.detector().counts().to_vec(),
        label,
        distribution,
    })
}

/// Generates `size` independent samples in parallel. Each sample owns its
/// scanner and random source; results keep sample order.
pub fn generate_dataset(
    base: &SimParams,
    set: &DistributionSet,
    steps: u64,
    size: usize,
    progress: &ProgressBar,
) -> Result<Vec<DatasetSample>> {
    let samples = (0..size)
        .into_par_iter()
        .map(|idx| {
            let mut random = RandomDistribution::new();
            let sample = generate_sample(base, set, steps, &mut random);
            if let Ok(s) = &sample {
                debug!("Sample {}: distribution {} -> {}", idx, s.distribution, s.label.as_str());
            }
            progress.inc(1);
            sample
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(samples)
}

/// Writes samples as `count,count,...,label` lines.
pub fn write_samples<W: Write>(writer: W, samples: &[DatasetSample]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    for sample in samples {
        let mut record: Vec<String> = sample.counts.iter().map(|c| c.to_string()).collect();
        record.push(sample.label.as_str().to_string());
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}
