//! Incremental line reader for a growing log file.
//!
//! [`LogTailer`] keeps one open handle and a byte position. Each call to
//! [`LogTailer::next`] yields the next complete line, or, once the end of
//! the file is reached, waits one poll interval and yields
//! [`TailEvent::Idle`] so the caller can do periodic work.
//!
//! An incomplete trailing line (no `\n` yet) is buffered and only returned
//! after its terminator has been written.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};

/// Default wait between checks for new data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum TailError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{} no longer exists", path.display())]
    Vanished { path: PathBuf },
    #[error("{} was truncated ({len} bytes, read up to {position})", path.display())]
    Truncated {
        path: PathBuf,
        len: u64,
        position: u64,
    },
}

/// How a tailer starts and polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailOptions {
    pub poll_interval: Duration,
    /// Skip existing content and only report lines appended after opening.
    pub start_at_end: bool,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_at_end: false,
        }
    }
}

/// One step of the tail sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// A complete line, without its terminator.
    Line(String),
    /// No new data arrived during one poll interval.
    Idle,
}

/// Follows a single file as it grows.
#[derive(Debug)]
pub struct LogTailer {
    path: PathBuf,
    reader: BufReader<File>,
    /// Bytes of an unterminated line read so far.
    pending: Vec<u8>,
    /// Bytes consumed from the file, including `pending`.
    position: u64,
    poll_interval: Duration,
}

impl LogTailer {
    /// Opens `path` for tailing. Failure here is not retried.
    pub async fn open(path: impl Into<PathBuf>, options: &TailOptions) -> Result<Self, TailError> {
        let path = path.into();
        let mut file = File::open(&path).await.map_err(|source| TailError::Open {
            path: path.clone(),
            source,
        })?;

        let position = if options.start_at_end {
            file.seek(SeekFrom::End(0))
                .await
                .map_err(|source| TailError::Open {
                    path: path.clone(),
                    source,
                })?
        } else {
            0
        };

        Ok(Self {
            path,
            reader: BufReader::new(file),
            pending: Vec::new(),
            position,
            poll_interval: options.poll_interval,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Byte offset of everything read so far.
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Returns the next complete line, or [`TailEvent::Idle`] after waiting
    /// one poll interval with nothing new to read.
    pub async fn next(&mut self) -> Result<TailEvent, TailError> {
        loop {
            let read = self
                .reader
                .read_until(b'\n', &mut self.pending)
                .await
                .map_err(|source| TailError::Read {
                    path: self.path.clone(),
                    source,
                })?;

            if read == 0 {
                self.check_file().await?;
                tokio::time::sleep(self.poll_interval).await;
                return Ok(TailEvent::Idle);
            }

            self.position += read as u64;
            if self.pending.ends_with(b"\n") {
                return Ok(TailEvent::Line(self.take_line()));
            }
        }
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.pop();
        if bytes.ends_with(b"\r") {
            bytes.pop();
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Fails if the path is gone or the file shrank below what was read.
    async fn check_file(&self) -> Result<(), TailError> {
        let metadata = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TailError::Vanished {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(TailError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if metadata.len() < self.position {
            return Err(TailError::Truncated {
                path: self.path.clone(),
                len: metadata.len(),
                position: self.position,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    fn fast() -> TailOptions {
        TailOptions {
            poll_interval: Duration::from_millis(10),
            start_at_end: false,
        }
    }

    fn append(path: &Path, text: &str) {
        let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        write!(f, "{text}").unwrap();
    }

    async fn next_line(tailer: &mut LogTailer) -> String {
        for _ in 0..100 {
            if let TailEvent::Line(line) = tailer.next().await.unwrap() {
                return line;
            }
        }
        panic!("no line arrived");
    }

    #[tokio::test]
    async fn reads_existing_lines_then_idles() {
        let tmp = NamedTempFile::new().unwrap();
        append(tmp.path(), "line1\nline2\n");

        let mut tailer = LogTailer::open(tmp.path(), &fast()).await.unwrap();
        assert_eq!(tailer.next().await.unwrap(), TailEvent::Line("line1".into()));
        assert_eq!(tailer.next().await.unwrap(), TailEvent::Line("line2".into()));
        assert_eq!(tailer.next().await.unwrap(), TailEvent::Idle);
        assert_eq!(tailer.position(), 12);
    }

    #[tokio::test]
    async fn follows_appended_lines() {
        let tmp = NamedTempFile::new().unwrap();
        let mut tailer = LogTailer::open(tmp.path(), &fast()).await.unwrap();
        assert_eq!(tailer.next().await.unwrap(), TailEvent::Idle);

        append(tmp.path(), "line3\n");
        assert_eq!(next_line(&mut tailer).await, "line3");
    }

    #[tokio::test]
    async fn partial_line_waits_for_terminator() {
        let tmp = NamedTempFile::new().unwrap();
        append(tmp.path(), "You received 5 Lat");

        let mut tailer = LogTailer::open(tmp.path(), &fast()).await.unwrap();
        assert_eq!(tailer.next().await.unwrap(), TailEvent::Idle);
        assert_eq!(tailer.next().await.unwrap(), TailEvent::Idle);

        append(tmp.path(), "inum\r\n");
        assert_eq!(next_line(&mut tailer).await, "You received 5 Latinum");
    }

    #[tokio::test]
    async fn start_at_end_skips_history() {
        let tmp = NamedTempFile::new().unwrap();
        append(tmp.path(), "old\n");

        let options = TailOptions {
            start_at_end: true,
            ..fast()
        };
        let mut tailer = LogTailer::open(tmp.path(), &options).await.unwrap();
        assert_eq!(tailer.next().await.unwrap(), TailEvent::Idle);

        append(tmp.path(), "new\n");
        assert_eq!(next_line(&mut tailer).await, "new");
    }

    #[tokio::test]
    async fn missing_file_fails_to_open() {
        let temp = tempfile::tempdir().unwrap();
        let err = LogTailer::open(temp.path().join("nope.log"), &fast())
            .await
            .unwrap_err();
        assert!(matches!(err, TailError::Open { .. }));
    }

    #[tokio::test]
    async fn removed_file_is_fatal() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("chat.log");
        std::fs::write(&path, "line\n").unwrap();

        let mut tailer = LogTailer::open(&path, &fast()).await.unwrap();
        assert_eq!(next_line(&mut tailer).await, "line");

        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            tailer.next().await,
            Err(TailError::Vanished { .. })
        ));
    }

    #[tokio::test]
    async fn truncated_file_is_fatal() {
        let tmp = NamedTempFile::new().unwrap();
        append(tmp.path(), "a long first line\n");

        let mut tailer = LogTailer::open(tmp.path(), &fast()).await.unwrap();
        next_line(&mut tailer).await;

        tmp.as_file().set_len(0).unwrap();
        assert!(matches!(
            tailer.next().await,
            Err(TailError::Truncated { len: 0, .. })
        ));
    }
}
