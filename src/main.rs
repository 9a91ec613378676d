use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use skinseer_common::SimParams;
use skinseer_sim::{report, FrameRecorder, ScannerEngine};
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

/// Runs one skin scan and reports the photon detector counts.
#[derive(Parser, Debug)]
#[command(name = "skinseer", author, version, about, long_about = None)]
struct Args {
    /// Number of scan steps to run
    #[arg(long)]
    steps: Option<u64>,

    /// NAME=VALUE parameter file applied over the defaults
    #[arg(long)]
    parameter_file: Option<PathBuf>,

    /// Print the effective parameters
    #[arg(long)]
    print_parameters: bool,

    /// Photon detector counts file (.csv for one comma-separated line);
    /// standard output when omitted
    #[arg(long)]
    photon_detector_counts_file: Option<PathBuf>,

    /// Record scanner frames for the visualizer (.json, .bin or .msgpack)
    #[arg(long)]
    record_frames: Option<PathBuf>,

    /// Keep every Nth observer notification when recording
    #[arg(long, default_value_t = 50)]
    frame_interval: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    // --- Load Parameters ---
    let params = match &args.parameter_file {
        Some(path) => {
            info!("Loading parameters from {}", path.display());
            SimParams::load(path)?
        }
        None => SimParams::default(),
    };

    if args.print_parameters {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "Parameters:")?;
        params.write_to(&mut handle)?;
        handle.flush()?;
    }

    let steps = match args.steps {
        Some(steps) => steps,
        None if args.print_parameters => return Ok(()),
        None => anyhow::bail!("--steps is required (see --help)"),
    };

    // --- Initialize Scanner ---
    if params.scanner_speed < 0.0 {
        warn!(
            "SCANNER_SPEED is {}; the lesion moves away from the scanner edge and all {} steps will run.",
            params.scanner_speed, steps
        );
    }
    let mut scanner = ScannerEngine::new(&params)?;
    debug!("Scanner parameters: {:#?}", scanner.params());
    let recorder = args
        .record_frames
        .as_ref()
        .map(|_| FrameRecorder::attach(&mut scanner, args.frame_interval));

    // --- Scan ---
    info!("Starting scan for {} steps...", steps);
    let start_time = Instant::now();
    let completed = scanner.run(steps);
    if completed < steps {
        warn!("Lesion left the scanner after {} of {} steps.", completed, steps);
    }
    let tally = scanner.tally();
    info!(
        "Scan finished in {:.3} s | Photons: {} emitted, {} absorbed, {} exited, {} detected",
        start_time.elapsed().as_secs_f64(),
        tally.emitted,
        tally.absorbed,
        tally.exited,
        tally.detected
    );

    // --- Save Recorded Frames ---
    if let (Some(path), Some(recorder)) = (&args.record_frames, recorder) {
        scanner.clear_observer();
        let recorder = Rc::try_unwrap(recorder)
            .map_err(|_| anyhow::anyhow!("Frame recorder is still attached"))?
            .into_inner();
        info!("Saving {} frames to {}", recorder.len(), path.display());
        recorder
            .into_recording()
            .save(path)
            .with_context(|| format!("Failed to save frames to {}", path.display()))?;
    }

    // --- Report Counts ---
    report::write_report(args.photon_detector_counts_file.as_deref(), scanner.detector().counts())?;

    Ok(())
}
