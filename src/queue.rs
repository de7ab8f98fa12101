//! Bounded, multi-worker async queue with strict close-drain semantics.
//!
//! Producers push entries onto a bounded buffer; a pool of workers pulls
//! from it and dispatches to a downstream [`Sink`]. `close()` stops new
//! entries immediately, then blocks until every buffered entry has been
//! drained through the worker pool — mirroring the condvar-broadcast
//! close protocol of the original queue this crate is modeled on, adapted
//! to async Rust with `tokio::sync::Notify` in place of `sync.Cond`.

use crate::entry::Entry;
use crate::error::{ConfigError, SinkError};
use crate::sink::{CloseNotifier, ClosedSignal, Context, Sink};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

type DropHandler = Arc<dyn Fn(Entry, SinkError) + Send + Sync>;

fn noop_drop_handler() -> DropHandler {
    Arc::new(|_, _| {})
}

struct Item {
    ctx: Context,
    entry: Entry,
}

struct Shared {
    buffer: Mutex<VecDeque<Item>>,
    capacity: usize,
    timeout: Duration,
    drop_handler: DropHandler,
    closing: AtomicBool,
    not_empty_or_closing: Notify,
    not_full: Notify,
    downstream: Arc<dyn Sink>,
}

/// Builder for [`AsyncQueue`].
pub struct QueueBuilder {
    workers: usize,
    buffer: usize,
    timeout: Duration,
    drop_handler: DropHandler,
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self { workers: 1, buffer: 64, timeout: DEFAULT_TIMEOUT, drop_handler: noop_drop_handler() }
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Per-delivery deadline bounding each worker's downstream dispatch.
    /// A zero duration normalizes to the 3-second default.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = if timeout.is_zero() { DEFAULT_TIMEOUT } else { timeout };
        self
    }

    /// Callback invoked exactly once per entry the queue gives up on
    /// (downstream error or per-delivery deadline exceeded).
    pub fn drop_handler(mut self, handler: impl Fn(Entry, SinkError) + Send + Sync + 'static) -> Self {
        self.drop_handler = Arc::new(handler);
        self
    }

    pub fn build(self, downstream: Arc<dyn Sink>) -> Result<AsyncQueue, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError("queue must have at least one worker".to_string()));
        }
        if self.buffer == 0 {
            return Err(ConfigError("queue buffer must be positive".to_string()));
        }
        Ok(AsyncQueue::new(self.workers, self.buffer, self.timeout, self.drop_handler, downstream))
    }
}

impl Default for QueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bounded queue that fans audit entries out to `workers` concurrent
/// dispatchers, all writing through one downstream [`Sink`].
pub struct AsyncQueue {
    shared: Arc<Shared>,
    workers: Mutex<Option<Vec<JoinHandle<()>>>>,
    notifier: CloseNotifier,
    closed_rx: tokio::sync::watch::Receiver<bool>,
    closed: AtomicBool,
}

impl AsyncQueue {
    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    fn new(
        worker_count: usize,
        capacity: usize,
        timeout: Duration,
        drop_handler: DropHandler,
        downstream: Arc<dyn Sink>,
    ) -> Self {
        let shared = Arc::new(Shared {
            buffer: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            timeout,
            drop_handler,
            closing: AtomicBool::new(false),
            not_empty_or_closing: Notify::new(),
            not_full: Notify::new(),
            downstream,
        });

        let mut handles = Vec::with_capacity(worker_count);
        for _ in 0..worker_count {
            let shared = shared.clone();
            handles.push(tokio::spawn(worker_loop(shared)));
        }

        let (notifier, closed_rx) = CloseNotifier::new();
        Self {
            shared,
            workers: Mutex::new(Some(handles)),
            notifier,
            closed_rx,
            closed: AtomicBool::new(false),
        }
    }
}

async fn worker_loop(shared: Arc<Shared>) {
    loop {
        let notified = shared.not_empty_or_closing.notified();
        let item = {
            let mut buf = shared.buffer.lock().expect("audittrail queue mutex poisoned");
            match buf.pop_front() {
                Some(item) => Some(item),
                None if shared.closing.load(Ordering::Acquire) => return,
                None => None,
            }
        };

        let item = match item {
            Some(item) => item,
            None => {
                notified.await;
                continue;
            }
        };

        shared.not_full.notify_waiters();

        let dropped = item.entry.clone();
        match tokio::time::timeout(shared.timeout, shared.downstream.log(&item.ctx, item.entry)).await {
            Ok(Ok(())) => {
                tracing::debug!("audit queue worker: dispatched entry");
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "audit queue worker: downstream sink failed, dropping entry");
                (shared.drop_handler)(dropped, e);
            }
            Err(_) => {
                tracing::warn!(timeout = ?shared.timeout, "audit queue worker: per-delivery deadline exceeded");
                (shared.drop_handler)(
                    dropped,
                    SinkError::Dispatch("per-delivery deadline exceeded".to_string()),
                );
            }
        }
    }
}

#[async_trait]
impl Sink for AsyncQueue {
    async fn log(&self, ctx: &Context, entry: Entry) -> Result<(), SinkError> {
        loop {
            if self.shared.closing.load(Ordering::Acquire) {
                return Err(SinkError::Closed);
            }

            let notified = self.shared.not_full.notified();
            {
                let mut buf = self.shared.buffer.lock().expect("audittrail queue mutex poisoned");
                if self.shared.closing.load(Ordering::Acquire) {
                    return Err(SinkError::Closed);
                }
                if buf.len() < self.shared.capacity {
                    buf.push_back(Item { ctx: ctx.clone(), entry });
                    drop(buf);
                    self.shared.not_empty_or_closing.notify_waiters();
                    return Ok(());
                }
            }
            notified.await;
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        let handles = {
            let mut guard = self.workers.lock().expect("audittrail queue mutex poisoned");
            guard.take()
        };

        let Some(handles) = handles else {
            // Already closed (or closing) by another caller; this is idempotent.
            let mut signal = self.closed_signal();
            signal.wait().await;
            return Ok(());
        };

        tracing::info!(workers = handles.len(), "audit queue: closing, draining buffer");
        self.shared.closing.store(true, Ordering::Release);
        self.shared.not_empty_or_closing.notify_waiters();
        self.shared.not_full.notify_waiters();

        for handle in handles {
            let _ = handle.await;
        }

        self.shared.downstream.close().await?;
        self.closed.store(true, Ordering::Release);
        self.notifier.notify_closed();
        tracing::info!("audit queue: closed");
        Ok(())
    }

    fn closed_signal(&self) -> ClosedSignal {
        ClosedSignal::new(self.closed_rx.clone())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
