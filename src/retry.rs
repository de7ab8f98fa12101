//! A [`Sink`] wrapper that retries downstream dispatch failures according
//! to a pluggable [`RetryStrategy`], until the strategy itself decides an
//! entry should be dropped.

use crate::entry::Entry;
use crate::error::{ConfigError, SinkError};
use crate::sink::{CloseNotifier, ClosedSignal, Context, Sink};
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::strategy::RetryStrategy;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type DropHandler = Arc<dyn Fn(Entry, SinkError) + Send + Sync>;

fn noop_drop_handler() -> DropHandler {
    Arc::new(|_, _| {})
}

/// Builder for [`RetrySink`].
pub struct RetrySinkBuilder {
    sleeper: Arc<dyn Sleeper>,
    drop_handler: DropHandler,
}

impl RetrySinkBuilder {
    fn new() -> Self {
        Self { sleeper: Arc::new(TokioSleeper), drop_handler: noop_drop_handler() }
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Callback invoked exactly once per entry the configured strategy
    /// decides to give up on.
    pub fn drop_handler(mut self, handler: impl Fn(Entry, SinkError) + Send + Sync + 'static) -> Self {
        self.drop_handler = Arc::new(handler);
        self
    }

    pub fn build(
        self,
        strategy: Arc<dyn RetryStrategy>,
        downstream: Arc<dyn Sink>,
    ) -> Result<RetrySink, ConfigError> {
        let (notifier, closed_rx) = CloseNotifier::new();
        Ok(RetrySink {
            strategy,
            downstream,
            sleeper: self.sleeper,
            drop_handler: self.drop_handler,
            notifier,
            closed_rx,
            closed: AtomicBool::new(false),
        })
    }
}

impl Default for RetrySinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a downstream [`Sink`], retrying failed `log()` calls as directed
/// by the configured [`RetryStrategy`] until it signals the entry should be
/// dropped, at which point `drop_handler` is invoked and `log()` returns
/// `Ok(())` — the entry is swallowed, not surfaced as a caller-visible
/// failure.
pub struct RetrySink {
    strategy: Arc<dyn RetryStrategy>,
    downstream: Arc<dyn Sink>,
    sleeper: Arc<dyn Sleeper>,
    drop_handler: DropHandler,
    notifier: CloseNotifier,
    closed_rx: tokio::sync::watch::Receiver<bool>,
    closed: AtomicBool,
}

impl RetrySink {
    pub fn builder() -> RetrySinkBuilder {
        RetrySinkBuilder::new()
    }
}

#[async_trait]
impl Sink for RetrySink {
    async fn log(&self, ctx: &Context, entry: Entry) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        loop {
            let wait = self.strategy.proceed(&entry);
            if wait > std::time::Duration::ZERO {
                let mut closed = self.closed_signal();
                tokio::select! {
                    _ = self.sleeper.sleep(wait) => {}
                    _ = closed.wait() => return Err(SinkError::Closed),
                }
            }

            match self.downstream.log(ctx, entry.clone()).await {
                Ok(()) => {
                    self.strategy.on_success(&entry);
                    return Ok(());
                }
                Err(err) => {
                    if self.strategy.on_failure(&entry, &err) {
                        tracing::warn!(error = %err, "retry sink: strategy dropped entry");
                        (self.drop_handler)(entry, err);
                        return Ok(());
                    }
                    tracing::debug!(error = %err, "retry sink: retrying after failure");
                }
            }
        }
    }

    async fn close(&self) -> Result<(), SinkError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.downstream.close().await?;
        self.notifier.notify_closed();
        Ok(())
    }

    fn closed_signal(&self) -> ClosedSignal {
        ClosedSignal::new(self.closed_rx.clone())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::memory::MemorySink;
    use crate::strategy::ExponentialBackoff;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct FlakySink {
        fail_times: AtomicUsize,
        calls: AtomicUsize,
        memory: MemorySink,
    }

    #[async_trait]
    impl Sink for FlakySink {
        async fn log(&self, ctx: &Context, entry: Entry) -> Result<(), SinkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(SinkError::Dispatch("transient".to_string()));
            }
            self.memory.log(ctx, entry).await
        }

        async fn close(&self) -> Result<(), SinkError> {
            self.memory.close().await
        }

        fn closed_signal(&self) -> crate::sink::ClosedSignal {
            self.memory.closed_signal()
        }

        fn is_closed(&self) -> bool {
            self.memory.is_closed()
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let flaky = Arc::new(FlakySink {
            fail_times: AtomicUsize::new(2),
            calls: AtomicUsize::new(0),
            memory: MemorySink::new(),
        });
        let strategy: Arc<dyn RetryStrategy> =
            Arc::new(ExponentialBackoff::builder().base(Duration::ZERO).build().unwrap());
        let retry = RetrySink::builder()
            .sleeper(Arc::new(crate::sleeper::InstantSleeper))
            .build(strategy, flaky.clone())
            .unwrap();

        let entry = Entry::builder("user", "action", "module").build().unwrap();
        retry.log(&Context::new(), entry).await.unwrap();
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn drop_handler_invoked_when_strategy_gives_up() {
        let flaky = Arc::new(FlakySink {
            fail_times: AtomicUsize::new(100),
            calls: AtomicUsize::new(0),
            memory: MemorySink::new(),
        });

        struct GiveUpAfterTwo {
            failures: AtomicUsize,
        }
        impl RetryStrategy for GiveUpAfterTwo {
            fn proceed(&self, _entry: &Entry) -> Duration {
                Duration::ZERO
            }
            fn on_success(&self, _entry: &Entry) {}
            fn on_failure(&self, _entry: &Entry, _err: &SinkError) -> bool {
                self.failures.fetch_add(1, Ordering::SeqCst) + 1 >= 2
            }
        }

        let strategy: Arc<dyn RetryStrategy> = Arc::new(GiveUpAfterTwo { failures: AtomicUsize::new(0) });
        let dropped = Arc::new(AtomicUsize::new(0));
        let counter = dropped.clone();
        let retry = RetrySink::builder()
            .sleeper(Arc::new(crate::sleeper::InstantSleeper))
            .drop_handler(move |_entry, _err| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .build(strategy, flaky.clone())
            .unwrap();

        let entry = Entry::builder("user", "action", "module").build().unwrap();
        let result = retry.log(&Context::new(), entry).await;
        assert!(result.is_ok());
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn closed_signal_wins_race_over_backoff_wait() {
        struct NeverSucceeds;
        #[async_trait]
        impl Sink for NeverSucceeds {
            async fn log(&self, _ctx: &Context, _entry: Entry) -> Result<(), SinkError> {
                Err(SinkError::Dispatch("down".to_string()))
            }
            async fn close(&self) -> Result<(), SinkError> {
                Ok(())
            }
            fn closed_signal(&self) -> crate::sink::ClosedSignal {
                unreachable!("retry sink owns its own closed signal")
            }
            fn is_closed(&self) -> bool {
                false
            }
        }

        struct AlwaysWaits;
        impl RetryStrategy for AlwaysWaits {
            fn proceed(&self, _entry: &Entry) -> Duration {
                Duration::from_secs(3600)
            }
            fn on_success(&self, _entry: &Entry) {}
            fn on_failure(&self, _entry: &Entry, _err: &SinkError) -> bool {
                false
            }
        }

        let strategy: Arc<dyn RetryStrategy> = Arc::new(AlwaysWaits);
        let retry = Arc::new(
            RetrySink::builder()
                .sleeper(Arc::new(TokioSleeper))
                .build(strategy, Arc::new(NeverSucceeds))
                .unwrap(),
        );

        let r2 = retry.clone();
        let handle = tokio::spawn(async move {
            let entry = Entry::builder("user", "action", "module").build().unwrap();
            r2.log(&Context::new(), entry).await
        });

        tokio::task::yield_now().await;
        retry.close().await.unwrap();

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(SinkError::Closed)));
    }

    #[tokio::test]
    async fn close_is_idempotent_and_delegates_downstream() {
        let memory = Arc::new(MemorySink::new());
        let strategy: Arc<dyn RetryStrategy> = Arc::new(ExponentialBackoff::builder().build().unwrap());
        let retry = RetrySink::builder().build(strategy, memory.clone()).unwrap();
        retry.close().await.unwrap();
        retry.close().await.unwrap();
        assert!(memory.is_closed());
    }
}
