//! Live monitor for a growing log file.
//!
//! Event snapshots print the title and reward table; heartbeats rewrite a
//! single title line in place. When a session stops its summary is saved
//! to the configured directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nr_core::snapshot::{format_summary_line, format_title};
use nr_core::{SessionSummary, Snapshot, SnapshotKind};
use nr_tail::{Monitor, Observer, SnapshotEmitter};

use super::format_rewards;
use crate::Config;

/// Snapshots buffered between the pipeline and the terminal.
const CHANNEL_CAPACITY: usize = 64;

/// Renders snapshots to a writer and saves finished sessions.
#[derive(Debug)]
pub struct Console<'a> {
    config: &'a Config,
    save_dir: Option<&'a Path>,
    /// The cursor sits at the end of a heartbeat title line.
    mid_line: bool,
    last: Option<Snapshot>,
}

impl<'a> Console<'a> {
    pub const fn new(config: &'a Config, save_dir: Option<&'a Path>) -> Self {
        Self {
            config,
            save_dir,
            mid_line: false,
            last: None,
        }
    }

    fn title(&self, snapshot: Option<&Snapshot>) -> String {
        format_title(snapshot, &self.config.rate_field, &self.config.rate_label)
    }

    fn end_line<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if self.mid_line {
            writeln!(writer)?;
            self.mid_line = false;
        }
        Ok(())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<Option<PathBuf>> {
        let Some(dir) = self.save_dir else {
            return Ok(None);
        };
        let path = SessionSummary::from_snapshot(snapshot)
            .save_to_dir(dir)
            .with_context(|| format!("failed to save summary to {}", dir.display()))?;
        tracing::info!(path = ?path, "saved session summary");
        Ok(Some(path))
    }

    /// Shows one snapshot.
    pub fn show<W: Write>(&mut self, writer: &mut W, snapshot: Snapshot) -> Result<()> {
        match snapshot.kind {
            SnapshotKind::Heartbeat => {
                write!(writer, "\r{}", self.title(Some(&snapshot)))?;
                self.mid_line = true;
            }
            SnapshotKind::Event if snapshot.active => {
                self.end_line(writer)?;
                writeln!(writer, "{}", self.title(Some(&snapshot)))?;
                write!(writer, "{}", format_rewards(&snapshot.rewards))?;
            }
            SnapshotKind::Event => {
                self.end_line(writer)?;
                writeln!(
                    writer,
                    "{}",
                    format_summary_line(&snapshot, &self.config.rate_field, &self.config.rate_label)
                )?;
                write!(writer, "{}", format_rewards(&snapshot.rewards))?;
                if let Some(path) = self.save(&snapshot)? {
                    writeln!(writer, "Saved {}", path.display())?;
                }
                writeln!(writer, "{}", self.title(None))?;
            }
        }
        writer.flush()?;
        self.last = Some(snapshot);
        Ok(())
    }

    /// Wraps up after the monitor stopped, saving a session that was still open.
    pub fn finish<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        self.end_line(writer)?;
        if let Some(snapshot) = self.last.take().filter(|s| s.active) {
            writeln!(
                writer,
                "{}",
                format_summary_line(&snapshot, &self.config.rate_field, &self.config.rate_label)
            )?;
            if let Some(path) = self.save(&snapshot)? {
                writeln!(writer, "Saved {}", path.display())?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}

/// Runs the watch command until Ctrl-C or a fatal tailing error.
pub async fn run(path: Option<PathBuf>, config: &Config, save: bool) -> Result<()> {
    let path = path
        .or_else(|| config.log_path.clone())
        .context("no log file given and `log_path` is not configured")?;

    let emitter = SnapshotEmitter::new();
    let (observer, mut snapshots) = Observer::channel(CHANNEL_CAPACITY);
    emitter.register(observer);

    let mut monitor = Monitor::new(config.pipeline(), emitter);
    monitor.switch_to(&path).await?;

    let save_dir = save.then_some(config.save_dir.as_path());
    let mut console = Console::new(config, save_dir);
    let mut stdout = std::io::stdout();
    println!("{}", format_title(None, &config.rate_field, &config.rate_label));

    let outcome = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                tracing::debug!("interrupted");
                break monitor.stop().await;
            }
            result = monitor.wait() => break result,
            Some(snapshot) = snapshots.recv() => console.show(&mut stdout, snapshot)?,
        }
    };

    // Snapshots emitted before the pipeline stopped.
    while let Ok(snapshot) = snapshots.try_recv() {
        console.show(&mut stdout, snapshot)?;
    }
    console.finish(&mut stdout)?;

    outcome.with_context(|| format!("stopped watching {}", path.display()))
}
