//! The `Sink` trait: the uniform contract every stage of the pipeline
//! (queue, retry wrapper, decorators, terminal sinks) implements.

use crate::entry::{Entry, HttpDetails, NetworkDetails};
use crate::error::SinkError;
use async_trait::async_trait;
use std::time::Instant;
use tokio::sync::watch;

/// Per-call context threaded alongside an [`Entry`].
///
/// This is the idiomatic-Rust rendering of the ambient `context.Context`
/// the original implementation threads through every logging call: rather
/// than an opaque, type-erased key/value bag, `Context` is a concrete
/// struct carrying exactly the two decorator payloads the pipeline ever
/// attaches, plus an optional per-call deadline honored by blocking
/// terminal sinks and the retry sink.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub http: Option<HttpDetails>,
    pub network: Option<NetworkDetails>,
    pub deadline: Option<Instant>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_http(mut self, http: HttpDetails) -> Self {
        self.http = Some(http);
        self
    }

    pub fn with_network(mut self, network: NetworkDetails) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Time remaining until the deadline, if one was set.
    pub fn time_remaining(&self) -> Option<std::time::Duration> {
        self.deadline.map(|d| d.saturating_duration_since(Instant::now()))
    }
}

/// A broadcast signal observers can await to learn a [`Sink`] has closed.
///
/// Built on `tokio::sync::watch` rather than a single-consumer channel
/// because any number of independent callers may want to observe the same
/// sink's closure.
#[derive(Debug, Clone)]
pub struct ClosedSignal {
    rx: watch::Receiver<bool>,
}

impl ClosedSignal {
    /// Wrap a `watch::Receiver<bool>` as a [`ClosedSignal`]. Exposed so
    /// bring-your-own-client sinks in other crates (e.g.
    /// `audittrail-elastic`, `audittrail-kafka`) can implement [`Sink`]
    /// without depending on this crate's private close-notification glue.
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    /// Resolves once the sink has closed. A no-op if it already has.
    pub async fn wait(&mut self) {
        if *self.rx.borrow() {
            return;
        }
        let _ = self.rx.changed().await;
    }

    pub fn is_closed(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Internal helper owned by sinks that need to publish closure to
/// [`ClosedSignal`] observers.
#[derive(Debug)]
pub(crate) struct CloseNotifier {
    tx: watch::Sender<bool>,
}

impl CloseNotifier {
    pub(crate) fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub(crate) fn notify_closed(&self) {
        let _ = self.tx.send(true);
    }
}

/// The audit pipeline's uniform sink contract.
///
/// Implementors may block (honoring `ctx`'s deadline where applicable);
/// callers that need bounded latency wrap a sink in the async queue.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Dispatch `entry`. Returns [`SinkError::Closed`] once `close()` has
    /// been called.
    async fn log(&self, ctx: &Context, entry: Entry) -> Result<(), SinkError>;

    /// Stop accepting new entries and flush whatever this sink still owns.
    /// Idempotent: calling `close()` more than once is a no-op after the
    /// first call completes.
    async fn close(&self) -> Result<(), SinkError>;

    /// A signal observers can await to learn this sink has closed.
    fn closed_signal(&self) -> ClosedSignal;

    /// Whether `close()` has already completed.
    fn is_closed(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_time_remaining_is_none_without_deadline() {
        let ctx = Context::new();
        assert!(ctx.time_remaining().is_none());
    }

    #[test]
    fn context_time_remaining_saturates_at_zero_when_past() {
        let ctx = Context::new().with_deadline(Instant::now() - std::time::Duration::from_secs(1));
        assert_eq!(ctx.time_remaining(), Some(std::time::Duration::ZERO));
    }

    #[tokio::test]
    async fn closed_signal_resolves_after_notify() {
        let (notifier, rx) = CloseNotifier::new();
        let mut signal = ClosedSignal::new(rx);
        assert!(!signal.is_closed());
        notifier.notify_closed();
        signal.wait().await;
        assert!(signal.is_closed());
    }
}
