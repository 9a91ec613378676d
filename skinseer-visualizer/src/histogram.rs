use anyhow::{anyhow, Result};
use plotters::prelude::*;
use std::path::Path;

const MARGIN: i32 = 20;

/// Writes a bar chart of the detector counts as a PNG, one colored bar per
/// counter, scaled so the tallest bar fills the plot.
pub fn write_histogram(path: &Path, counts: &[u32], colors: &[[u8; 4]], size: (u32, u32)) -> Result<()> {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(|e| anyhow!("Failed to clear histogram: {e}"))?;

    let max = counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    let (width, height) = (size.0 as i32, size.1 as i32);
    let plot_width = (width - 2 * MARGIN).max(1);
    let plot_height = (height - 2 * MARGIN).max(1) as f64;
    let baseline = height - MARGIN;
    let slot = plot_width as f64 / counts.len().max(1) as f64;

    for (i, &count) in counts.iter().enumerate() {
        let x0 = MARGIN + (slot * i as f64) as i32 + 1;
        let x1 = MARGIN + (slot * (i + 1) as f64) as i32 - 1;
        let top = baseline - (count as f64 / max * plot_height) as i32;
        let [r, g, b, _] = colors.get(i % colors.len().max(1)).copied().unwrap_or([0, 0, 0, 255]);
        root.draw(&Rectangle::new([(x0, top), (x1, baseline)], RGBColor(r, g, b).filled()))
            .map_err(|e| anyhow!("Failed to draw bar {i}: {e}"))?;
    }
    root.draw(&PathElement::new(vec![(MARGIN, baseline), (width - MARGIN, baseline)], BLACK))
        .map_err(|e| anyhow!("Failed to draw axis: {e}"))?;

    root.present().map_err(|e| anyhow!("Failed to write histogram to {}: {e}", path.display()))?;
    Ok(())
}
