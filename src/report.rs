use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Layout of the detector-count report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// One comma-separated line.
    Csv,
    /// `Photon counts:` header followed by `index: count` lines.
    Listing,
}

impl ReportFormat {
    /// CSV for targets with a `.csv` extension, a listing otherwise
    /// (including standard output).
    pub fn for_target(path: Option<&Path>) -> Self {
        match path.and_then(|p| p.extension()).and_then(|e| e.to_str()) {
            Some("csv") => ReportFormat::Csv,
            _ => ReportFormat::Listing,
        }
    }
}

pub fn write_counts<W: Write>(writer: &mut W, counts: &[u32], format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Csv => {
            let mut csv_writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
            csv_writer.write_record(counts.iter().map(|c| c.to_string()))?;
            csv_writer.flush()?;
        }
        ReportFormat::Listing => {
            writeln!(writer, "Photon counts:")?;
            for (idx, count) in counts.iter().enumerate() {
                writeln!(writer, "{}: {}", idx, count)?;
            }
        }
    }
    Ok(())
}

/// Writes the report to `path`, or to standard output when `path` is `None`.
pub fn write_report(path: Option<&Path>, counts: &[u32]) -> Result<()> {
    let format = ReportFormat::for_target(path);
    match path {
        Some(p) => {
            let file = File::create(p)
                .with_context(|| format!("Cannot open photon detector counts file '{}'", p.display()))?;
            let mut writer = BufWriter::new(file);
            write_counts(&mut writer, counts, format)?;
            writer
                .flush()
                .with_context(|| format!("Failed to write photon detector counts to '{}'", p.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            write_counts(&mut handle, counts, format)?;
            handle.flush()?;
        }
    }
    Ok(())
}
