//! A sink that drops every entry. Useful as a downstream default or in
//! tests where dispatch itself isn't under test.

use crate::entry::Entry;
use crate::error::SinkError;
use crate::sink::{CloseNotifier, ClosedSignal, Context, Sink};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};

pub struct DiscardSink {
    notifier: CloseNotifier,
    closed_rx: tokio::sync::watch::Receiver<bool>,
    closed: AtomicBool,
}

impl DiscardSink {
    pub fn new() -> Self {
        let (notifier, closed_rx) = CloseNotifier::new();
        Self { notifier, closed_rx, closed: AtomicBool::new(false) }
    }
}

impl Default for DiscardSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sink for DiscardSink {
    async fn log(&self, _ctx: &Context, _entry: Entry) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }
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
