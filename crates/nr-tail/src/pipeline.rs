//! The background task tying tailer, classifier, aggregator and emitter.
//!
//! One task per monitored file. The task owns the [`Aggregator`] outright;
//! nothing else can reach session state except through emitted snapshots.
//!
//! # Cancellation
//!
//! A `watch` flag is raced against the two places the task can wait: the
//! tailer's idle interval and delivery to observers. The race is biased
//! toward the flag, so once cancellation is observed no further snapshot is
//! emitted.
//!
//! Cancelling during delivery abandons the snapshot being emitted: observers
//! earlier in the list may have received it while later ones never will.
//! Waiting for the whole list instead would let one stalled observer block
//! cancellation forever.

use std::path::{Path, PathBuf};

use chrono::Utc;
use nr_core::{Aggregator, Classifier, Markers, Snapshot};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};

use crate::emitter::SnapshotEmitter;
use crate::tailer::{LogTailer, TailError, TailEvent, TailOptions};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tail(#[from] TailError),
    #[error("pipeline task failed: {0}")]
    Join(#[from] JoinError),
}

/// Settings shared by every pipeline a monitor starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    pub tail: TailOptions,
    pub markers: Markers,
}

/// A running pipeline.
///
/// Dropping the handle stops the task as if it had been cancelled.
#[derive(Debug)]
pub struct PipelineHandle {
    path: PathBuf,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<(), PipelineError>>,
}

impl PipelineHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the pipeline and waits for the task to exit.
    ///
    /// Returns the error that ended the task, if it had already failed.
    pub async fn cancel(self) -> Result<(), PipelineError> {
        let _ = self.shutdown.send(true);
        self.task.await?
    }

    /// Waits for the pipeline to end on its own, which only happens on a
    /// fatal tailing error.
    pub async fn join(self) -> Result<(), PipelineError> {
        let Self { shutdown, task, .. } = self;
        let result = task.await?;
        drop(shutdown);
        result
    }
}

/// Starts a pipeline for `path` with fresh session state.
pub fn spawn(
    path: impl Into<PathBuf>,
    config: &PipelineConfig,
    emitter: SnapshotEmitter,
) -> PipelineHandle {
    let path = path.into();
    let (shutdown, shutdown_rx) = watch::channel(false);
    let pipeline = Pipeline {
        path: path.clone(),
        tail: config.tail,
        classifier: Classifier::new(config.markers.clone()),
        aggregator: Aggregator::new(),
        emitter,
        shutdown: shutdown_rx,
    };
    let task = tokio::spawn(pipeline.run());

    PipelineHandle {
        path,
        shutdown,
        task,
    }
}

struct Pipeline {
    path: PathBuf,
    tail: TailOptions,
    classifier: Classifier,
    aggregator: Aggregator,
    emitter: SnapshotEmitter,
    shutdown: watch::Receiver<bool>,
}

/// Resolves once cancellation is requested or the handle is dropped.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

impl Pipeline {
    async fn run(mut self) -> Result<(), PipelineError> {
        let mut tailer = tokio::select! {
            biased;
            () = cancelled(&mut self.shutdown) => return Ok(()),
            opened = LogTailer::open(&self.path, &self.tail) => opened?,
        };
        tracing::info!(path = ?self.path, "pipeline started");

        loop {
            let event = tokio::select! {
                biased;
                () = cancelled(&mut self.shutdown) => break,
                event = tailer.next() => event,
            };

            let snapshot = match event {
                Ok(TailEvent::Line(line)) => self.handle_line(&line),
                Ok(TailEvent::Idle) => self.aggregator.tick(Utc::now()),
                Err(e) => {
                    tracing::warn!(path = ?self.path, error = %e, "pipeline stopped");
                    return Err(e.into());
                }
            };

            if let Some(snapshot) = snapshot {
                // Not atomic across observers; see the module docs.
                tokio::select! {
                    biased;
                    () = cancelled(&mut self.shutdown) => break,
                    () = self.emitter.emit(&snapshot) => {}
                }
            }
        }

        tracing::info!(path = ?self.path, "pipeline cancelled");
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Option<Snapshot> {
        match self.classifier.classify(line) {
            Ok(classified) => self.aggregator.apply_line(&classified),
            Err(e) => {
                tracing::warn!(path = ?self.path, error = %e, "skipping malformed line");
                None
            }
        }
    }
}

/// Runs at most one pipeline at a time, restarting it when the file changes.
#[derive(Debug)]
pub struct Monitor {
    config: PipelineConfig,
    emitter: SnapshotEmitter,
    current: Option<PipelineHandle>,
}

impl Monitor {
    pub const fn new(config: PipelineConfig, emitter: SnapshotEmitter) -> Self {
        Self {
            config,
            emitter,
            current: None,
        }
    }

    pub const fn emitter(&self) -> &SnapshotEmitter {
        &self.emitter
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current.as_ref().map(PipelineHandle::path)
    }

    /// Cancels the current pipeline (if any) and starts one for `path`.
    ///
    /// The new pipeline always begins with no session. Returns the result of
    /// the pipeline that was replaced.
    pub async fn switch_to(&mut self, path: impl Into<PathBuf>) -> Result<(), PipelineError> {
        let previous = self.stop().await;
        self.current = Some(spawn(path, &self.config, self.emitter.clone()));
        previous
    }

    /// Cancels the current pipeline and waits for it to exit.
    pub async fn stop(&mut self) -> Result<(), PipelineError> {
        match self.current.take() {
            Some(handle) => handle.cancel().await,
            None => Ok(()),
        }
    }

    /// Waits until the current pipeline ends on its own.
    ///
    /// Pends forever when nothing is running, so it can sit in a `select!`.
    pub async fn wait(&mut self) -> Result<(), PipelineError> {
        let Some(handle) = self.current.as_mut() else {
            return std::future::pending().await;
        };
        let result = (&mut handle.task).await;
        self.current = None;
        result?
    }
}
