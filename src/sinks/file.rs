//! A sink that appends newline-delimited JSON entries to a file.
//!
//! Construction validates the target path up front (created if missing,
//! rejected if it names a directory) the same way the original file-backed
//! logger validates its file descriptor before accepting it; the actual
//! write path reopens the file in append mode per write, mirroring the
//! `tokio::fs::OpenOptions` pattern used by this crate's JSON-lines
//! satellite-sink ancestor.

use crate::entry::Entry;
use crate::error::SinkError;
use crate::sink::{CloseNotifier, ClosedSignal, Context, Sink};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;

pub struct FileSink {
    path: PathBuf,
    notifier: CloseNotifier,
    closed_rx: tokio::sync::watch::Receiver<bool>,
    closed: AtomicBool,
}

impl FileSink {
    /// Validate and open `path`, creating it if it does not yet exist.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            tokio::fs::OpenOptions::new().create(true).append(true).open(&path).await?;
        }

        let metadata = tokio::fs::metadata(&path).await?;
        if metadata.is_dir() {
            return Err(SinkError::Dispatch(format!("{} is a directory", path.display())));
        }

        let (notifier, closed_rx) = CloseNotifier::new();
        Ok(Self { path, notifier, closed_rx, closed: AtomicBool::new(false) })
    }
}

#[async_trait]
impl Sink for FileSink {
    async fn log(&self, _ctx: &Context, entry: Entry) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        let line = serde_json::to_string(&entry)
            .map_err(|e| SinkError::Dispatch(format!("failed to encode entry: {}", e)))?
            + "\n";

        let mut file = tokio::fs::OpenOptions::new().create(true).append(true).open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), SinkError> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            self.notifier.notify_closed();
        }
        Ok(())
    }

    fn closed_signal(&self) -> ClosedSignal {
        ClosedSignal::new(self.closed_rx.clone())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
