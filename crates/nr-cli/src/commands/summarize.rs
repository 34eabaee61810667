//! One-shot pass over a log file.
//!
//! Runs every line currently in the file through the classifier and
//! aggregator without tailing, then prints the state of the last session.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nr_core::snapshot::format_summary_line;
use nr_core::{Aggregator, Classifier, Markers, SessionSummary, Snapshot};

use super::format_rewards;
use crate::Config;

/// Result of reading a whole log.
#[derive(Debug, Default)]
pub struct Summary {
    /// State of the most recent session, if any was started.
    pub last: Option<Snapshot>,
    /// Every session that was closed by a stop marker, oldest first.
    pub finished: Vec<Snapshot>,
}

/// Aggregates all lines from `reader`.
///
/// Lines with malformed counts are logged and skipped. Invalid UTF-8 is
/// replaced rather than rejected, matching the live tailer.
pub fn summarize(reader: impl BufRead, markers: Markers) -> Result<Summary> {
    let classifier = Classifier::new(markers);
    let mut aggregator = Aggregator::new();
    let mut finished = Vec::new();

    for (index, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes.context("failed to read log")?;
        let line = String::from_utf8_lossy(&bytes);
        let classified = match classifier.classify(&line) {
            Ok(classified) => classified,
            Err(e) => {
                tracing::warn!(line = index + 1, error = %e, "skipping malformed line");
                continue;
            }
        };
        match aggregator.apply_line(&classified) {
            Some(snapshot) if !snapshot.active => finished.push(snapshot),
            _ => {}
        }
    }

    Ok(Summary {
        last: aggregator.snapshot(),
        finished,
    })
}

/// Saves each finished session into `dir`, returning the written paths.
pub fn save_finished(summary: &Summary, dir: &Path) -> Result<Vec<PathBuf>> {
    summary
        .finished
        .iter()
        .map(|snapshot| {
            SessionSummary::from_snapshot(snapshot)
                .save_to_dir(dir)
                .with_context(|| format!("failed to save summary to {}", dir.display()))
        })
        .collect()
}

/// Writes the last session as text or JSON.
pub fn write_summary<W: Write>(
    writer: &mut W,
    summary: &Summary,
    config: &Config,
    json: bool,
) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&summary.last)?)?;
        return Ok(());
    }

    let Some(snapshot) = &summary.last else {
        writeln!(writer, "No session found.")?;
        return Ok(());
    };
    write!(writer, "{}", format_rewards(&snapshot.rewards))?;
    writeln!(
        writer,
        "{}",
        format_summary_line(snapshot, &config.rate_field, &config.rate_label)
    )?;
    if snapshot.active {
        writeln!(writer, "(session still open)")?;
    }
    Ok(())
}

/// Runs the summarize command.
pub fn run(path: &Path, config: &Config, json: bool, save: bool) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let summary = summarize(BufReader::new(file), config.markers())?;

    if save {
        for saved in save_finished(&summary, &config.save_dir)? {
            tracing::info!(path = ?saved, "saved session summary");
        }
    }

    write_summary(&mut std::io::stdout().lock(), &summary, config, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    const LOG: &str = "\
[Combat (Self),20240315T200000,0,Player,@handle,System,,]ChatLog ON
[Combat (Self),20240315T200030,0,Player,@handle,System,,]You received 1,500 Dilithium Ore
[Combat (Self),20240315T200045,0,Player,@handle,System,,]Your shields are holding
[Combat (Self),20240315T200100,0,Player,@handle,System,,]Items acquired: Latinum x 3
[Combat (Self),20240315T200200,0,Player,@handle,System,,]ChatLog OFF
";

    fn render(summary: &Summary, json: bool) -> String {
        let mut out = Vec::new();
        write_summary(&mut out, summary, &Config::default(), json).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn summarizes_finished_session() {
        let summary = summarize(LOG.as_bytes(), Markers::default()).unwrap();
        assert_eq!(summary.finished.len(), 1);
        assert_snapshot!(render(&summary, false), @r"
        Dilithium Ore          1,500
        Latinum                    3
        NR (00h 02m 0s) - 12 DPS
        ");
    }

    #[test]
    fn open_session_is_flagged() {
        let log = LOG.lines().take(2).collect::<Vec<_>>().join("\n");
        let summary = summarize(log.as_bytes(), Markers::default()).unwrap();
        assert!(summary.finished.is_empty());
        assert_snapshot!(render(&summary, false), @r"
        Dilithium Ore          1,500
        NR (00h 00m 30s) - 50 DPS
        (session still open)
        ");
    }

    #[test]
    fn no_session_found() {
        let log = "[Combat (Self),20240315T200030,0,,,,,]You received 5 Latinum\n";
        let summary = summarize(log.as_bytes(), Markers::default()).unwrap();
        assert_snapshot!(render(&summary, false), @"No session found.");
        assert_eq!(render(&summary, true), "null\n");
    }

    #[test]
    fn malformed_count_is_skipped() {
        let log = "\
[Combat (Self),20240315T200000,0,,,,,]ChatLog ON
[Combat (Self),20240315T200001,0,,,,,]You received ,, Dilithium Ore
[Combat (Self),20240315T200002,0,,,,,]Item acquired: Tribble
";
        let summary = summarize(log.as_bytes(), Markers::default()).unwrap();
        let last = summary.last.unwrap();
        assert_eq!(last.reward("Tribble"), 1);
        assert_eq!(last.reward("Dilithium Ore"), 0);
    }

    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut log = Vec::new();
        log.extend_from_slice(b"[Combat (Self),20240315T200000,0,,,,,]ChatLog ON\n");
        log.extend_from_slice(b"[Combat (Self),20240315T200001,0,,,,,]Caf\xE9 is open\n");
        log.extend_from_slice(b"[Combat (Self),20240315T200002,0,,,,,]You received 5 Latinum\n");

        let summary = summarize(log.as_slice(), Markers::default()).unwrap();
        assert_eq!(summary.last.unwrap().reward("Latinum"), 5);
    }

    #[test]
    fn json_output_has_rewards() {
        let summary = summarize(LOG.as_bytes(), Markers::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&render(&summary, true)).unwrap();
        assert_eq!(value["active"], false);
        assert_eq!(value["duration_seconds"], 120.0);
        assert_eq!(value["rewards"]["Latinum"], 3);
    }

    #[test]
    fn saves_each_finished_session() {
        let temp = tempfile::tempdir().unwrap();
        let log = format!(
            "{LOG}\
[Combat (Self),20240316T090000,0,,,,,]ChatLog ON
[Combat (Self),20240316T090010,0,,,,,]You received 10 Dilithium Ore
[Combat (Self),20240316T090100,0,,,,,]ChatLog OFF
"
        );
        let summary = summarize(log.as_bytes(), Markers::default()).unwrap();
        let paths = save_finished(&summary, temp.path()).unwrap();

        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["1710532800.json", "1710579600.json"]);

        let second = SessionSummary::load(&paths[1]).unwrap();
        assert_eq!(second.rewards.get("Dilithium Ore"), Some(&10));
        assert!((second.duration - 60.0).abs() < f64::EPSILON);
    }
}
