use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use skinseer_common::distributions::VALUES_PER_DISTRIBUTION;
use skinseer_common::{DistributionSet, LesionDistribution, SimParams};
use skinseer_sim::dataset::{self, Label};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

/// Generates labeled detector-count vectors for classifier training.
/// A nevus is labeled dangerous when it penetrates the dermis.
#[derive(Parser, Debug)]
#[command(name = "gen-classification-data", author, version, about, long_about = None)]
struct Args {
    /// Number of scans to generate
    #[arg(long)]
    dataset_size: usize,

    /// Output file, one `count,...,count,label` line per scan
    #[arg(long)]
    dataset_filename: PathBuf,

    /// Scan steps per generated sample
    #[arg(long)]
    steps: u64,

    /// Nevus distribution (repeatable): <width mean (0 = no nevus)> <width sigma>
    /// <height mean> <height sigma> <epidermis depth mean> <epidermis depth sigma> <frequency>
    #[arg(
        long = "nevus-distribution",
        num_args = VALUES_PER_DISTRIBUTION,
        value_names = ["WIDTH_MEAN", "WIDTH_SIGMA", "HEIGHT_MEAN", "HEIGHT_SIGMA", "DEPTH_MEAN", "DEPTH_SIGMA", "FREQUENCY"],
        allow_negative_numbers = true,
        action = clap::ArgAction::Append
    )]
    nevus_distribution: Vec<f64>,

    /// TOML file of [[distribution]] tables, used instead of --nevus-distribution
    #[arg(long, conflicts_with = "nevus_distribution")]
    distributions_file: Option<PathBuf>,

    /// NAME=VALUE parameter file applied over the defaults
    #[arg(long)]
    parameter_file: Option<PathBuf>,
}

fn distributions_from_args(args: &Args) -> Result<DistributionSet> {
    if let Some(path) = &args.distributions_file {
        return DistributionSet::load(path);
    }
    if args.nevus_distribution.is_empty() {
        anyhow::bail!("At least one --nevus-distribution or a --distributions-file is required");
    }
    let entries = args
        .nevus_distribution
        .chunks(VALUES_PER_DISTRIBUTION)
        .map(LesionDistribution::from_values)
        .collect::<Result<Vec<_>>>()?;
    DistributionSet::new(entries)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let set = distributions_from_args(&args)?;
    let params = match &args.parameter_file {
        Some(path) => SimParams::load(path)?,
        None => SimParams::default(),
    };
    info!(
        "Generating {} samples of {} steps from {} nevus distributions.",
        args.dataset_size,
        args.steps,
        set.entries.len()
    );

    // Fail on an unwritable target before spending time on the scans.
    let file = File::create(&args.dataset_filename)
        .with_context(|| format!("Cannot open dataset file '{}'", args.dataset_filename.display()))?;

    let progress = ProgressBar::new(args.dataset_size as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} scans ({percent}%) [{eta}]")?
            .progress_chars("#>-"),
    );

    let start_time = Instant::now();
    let samples = dataset::generate_dataset(&params, &set, args.steps, args.dataset_size, &progress)?;
    progress.finish_with_message("Scans complete");

    dataset::write_samples(BufWriter::new(file), &samples)
        .with_context(|| format!("Failed to write dataset file '{}'", args.dataset_filename.display()))?;

    let dangerous = samples.iter().filter(|s| s.label == Label::Danger).count();
    info!(
        "Wrote {} samples ({} danger, {} ok) to {} in {:.2} s",
        samples.len(),
        dangerous,
        samples.len() - dangerous,
        args.dataset_filename.display(),
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}
