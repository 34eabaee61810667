//! Report command: CSV of projected rates over saved sessions.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use nr_core::Projection;
use nr_core::report::{build_rows, format_csv, load_summaries};

/// Builds the CSV text for every summary in `directory`.
pub fn generate(directory: &Path, field: &str, projection: &Projection) -> Result<String> {
    let summaries = load_summaries(directory)
        .with_context(|| format!("failed to read summaries from {}", directory.display()))?;
    tracing::debug!(count = summaries.len(), "loaded session summaries");

    let rows = build_rows(&summaries, field, projection);
    Ok(format_csv(&rows, field, &Local))
}

/// Runs the report command, writing to `output` or stdout.
pub fn run(
    directory: &Path,
    field: &str,
    projection: &Projection,
    output: Option<&Path>,
) -> Result<()> {
    let csv = generate(directory, field, projection)?;
    match output {
        Some(path) => std::fs::write(path, csv)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => std::io::stdout().lock().write_all(csv.as_bytes())?,
    }
    Ok(())
}
