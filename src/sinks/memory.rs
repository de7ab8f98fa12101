//! An in-memory sink that records every entry it receives. Intended for
//! tests that need to assert on exactly what was logged.

use crate::entry::Entry;
use crate::error::SinkError;
use crate::sink::{CloseNotifier, ClosedSignal, Context, Sink};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

pub struct MemorySink {
    entries: Mutex<Vec<Entry>>,
    notifier: CloseNotifier,
    closed_rx: tokio::sync::watch::Receiver<bool>,
    closed: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        let (notifier, closed_rx) = CloseNotifier::new();
        Self { entries: Mutex::new(Vec::new()), notifier, closed_rx, closed: AtomicBool::new(false) }
    }

    /// Snapshot of every entry received so far, in arrival order.
    pub async fn entries(&self) -> Vec<Entry> {
        self.entries.lock().await.clone()
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn log(&self, _ctx: &Context, entry: Entry) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }
        self.entries.lock().await.push(entry);
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
