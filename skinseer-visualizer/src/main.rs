mod histogram;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use dashmap::DashMap;
use env_logger::Builder;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn, LevelFilter};
use minimp4::Mp4Muxer;
use openh264::encoder::{BitRate, Encoder, EncoderConfig, FrameRate};
use openh264::formats::YUVBuffer;
use rayon::prelude::*;
use render::{counter_palette, draw_frame, rgb_to_yuv420, Viewport};
use skinseer_common::Recording;
use std::fs;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Instant;

/// Renders a recorded skin scan as an MP4 video.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded frames (.json, .bin or .msgpack)
    #[arg(short, long)]
    input: PathBuf,

    /// Output video file path (.mp4)
    #[arg(short, long, default_value = "scan.mp4")]
    output: PathBuf,

    /// Width of the output video in pixels; height follows the scanner aspect ratio
    #[arg(long, default_value_t = 900)]
    width: u32,

    /// Frames per second for the output video
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Chunk size for parallel rendering
    #[arg(long, default_value_t = 10)]
    chunk_size: usize,

    /// Also write a PNG bar chart of the final detector counts
    #[arg(long)]
    histogram: Option<PathBuf>,
}

fn progress_style(template: &str) -> Result<ProgressStyle> {
    Ok(ProgressStyle::default_bar().template(template)?.progress_chars("#>-"))
}

fn main() -> Result<()> {
    Builder::from_default_env().filter(None, LevelFilter::Info).init();
    let args = Args::parse();

    info!("Input recording: {}", args.input.display());
    info!("Output video: {}", args.output.display());

    let recording = Recording::load(&args.input)
        .with_context(|| format!("Failed to load recording {}", args.input.display()))?;
    let params = &recording.params;
    info!("Found {} snapshots in the recording", recording.snapshots.len());
    if recording.snapshots.is_empty() {
        warn!("Recording contains no snapshots. Exiting.");
        return Ok(());
    }

    let view = Viewport::fit(params, args.width);
    info!(
        "Video dimensions: {}x{} px ({:.3} px per unit) at {} fps",
        view.width_px, view.height_px, view.pixels_per_unit, args.fps
    );

    let counters = recording.snapshots[0].photon_counts.len();
    let colors = counter_palette(counters);
    // Bars share one scale so growth is visible across the video.
    let max_count = recording
        .snapshots
        .iter()
        .flat_map(|s| s.photon_counts.iter().copied())
        .max()
        .unwrap_or(0);

    // --- Render frames ---
    let start_time = Instant::now();
    let chunk_size = args.chunk_size.max(1);
    let frames = DashMap::new();
    let render_progress = ProgressBar::new(recording.snapshots.len() as u64);
    render_progress.set_style(progress_style(
        "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({percent}%) [{eta}]",
    )?);

    recording
        .snapshots
        .par_chunks(chunk_size)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            for (i, snapshot) in chunk.iter().enumerate() {
                let frame = draw_frame(snapshot, chunk_idx * chunk_size + i, params, &view, max_count, &colors);
                frames.insert(frame.index, frame.image);
            }
            render_progress.inc(chunk.len() as u64);
        });
    render_progress.finish_with_message("Frames rendered");

    // --- Encode ---
    let mut encoder = Encoder::with_api_config(
        openh264::OpenH264API::from_source(),
        EncoderConfig::new()
            .max_frame_rate(FrameRate::from_hz(args.fps as f32))
            .bitrate(BitRate::from_bps(2_000_000)),
    )
    .context("Failed to initialize H.264 encoder")?;

    let encode_progress = ProgressBar::new(frames.len() as u64);
    encode_progress.set_style(progress_style(
        "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} encoded ({percent}%) [{eta}]",
    )?);

    let mut h264_data = Vec::new();
    let mut frame_count = 0usize;
    let mut keys: Vec<usize> = frames.iter().map(|entry| *entry.key()).collect();
    keys.sort_unstable();

    const ENCODE_BATCH_SIZE: usize = 30;
    for batch in keys.chunks(ENCODE_BATCH_SIZE) {
        let yuv_frames: Vec<_> = batch
            .par_iter()
            .filter_map(|&key| frames.remove(&key).map(|(key, image)| (key, rgb_to_yuv420(&image))))
            .collect();
        for (key, yuv_data) in yuv_frames {
            let yuv_source = YUVBuffer::from_vec(yuv_data, view.width_px as usize, view.height_px as usize);
            match encoder.encode(&yuv_source) {
                Ok(bitstream) => {
                    bitstream.write_vec(&mut h264_data);
                    frame_count += 1;
                }
                Err(e) => error!("Error encoding frame {}: {}", key, e),
            }
            encode_progress.inc(1);
        }
    }
    encode_progress.finish_with_message(format!("Encoded {} frames", frame_count));

    // --- Mux ---
    let mut video_buffer = Cursor::new(Vec::new());
    let mut muxer = Mp4Muxer::new(&mut video_buffer);
    let description = format!("Skin scan - {} detectors, {} frames", counters, frame_count);
    muxer.init_video(view.width_px as i32, view.height_px as i32, false, &description);
    muxer.write_video(&h264_data);
    muxer.close();

    video_buffer.seek(SeekFrom::Start(0))?;
    let mut video_bytes = Vec::new();
    video_buffer.read_to_end(&mut video_bytes)?;
    fs::write(&args.output, &video_bytes)
        .with_context(|| format!("Failed to write video file to {}", args.output.display()))?;

    let duration = start_time.elapsed();
    info!(
        "Video generation completed in {:.2?} ({:.1} frames per second)",
        duration,
        frame_count as f64 / duration.as_secs_f64().max(f64::EPSILON)
    );

    if let Some(path) = &args.histogram {
        let last = &recording.snapshots[recording.snapshots.len() - 1];
        histogram::write_histogram(path, &last.photon_counts, &colors, (640, 360))?;
        info!("Detector histogram saved to {}", path.display());
    }

    Ok(())
}
