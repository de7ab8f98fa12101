//! Pluggable retry strategies consulted by [`crate::retry::RetrySink`].

use crate::clock::{Clock, MonotonicClock};
use crate::entry::Entry;
use crate::error::{ConfigError, SinkError};
use rand::Rng;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A policy a [`crate::retry::RetrySink`] consults before and after each
/// downstream dispatch attempt.
///
/// `proceed()` returns `Duration::ZERO` when the caller may proceed
/// immediately, or a non-zero duration the caller should wait before the
/// next attempt (or treat as a circuit-open rejection). `on_failure()`
/// returns whether the entry should be dropped (handed to the retry
/// sink's drop handler) rather than retried again.
pub trait RetryStrategy: Send + Sync {
    fn proceed(&self, entry: &Entry) -> Duration;
    fn on_success(&self, entry: &Entry);
    fn on_failure(&self, entry: &Entry, err: &SinkError) -> bool;
}

/// Exponential backoff: `base + factor * 2^(failures - 1)`, clamped to
/// `max`, then jittered to a uniform-random duration in `[0, clamped)`.
pub struct ExponentialBackoff {
    base: Duration,
    factor: Duration,
    max: Duration,
    failures: AtomicUsize,
}

pub struct ExponentialBackoffBuilder {
    base: Duration,
    factor: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder {
            base: Duration::from_millis(100),
            factor: Duration::from_millis(100),
            max: Duration::from_secs(30),
        }
    }

    fn raw_delay(&self, failures: usize) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (failures - 1).min(63) as u32;
        let multiplier = 2u64.saturating_pow(exponent);
        let scaled = self.factor.checked_mul(multiplier as u32).unwrap_or(self.max);
        let delay = self.base.saturating_add(scaled);
        delay.min(self.max)
    }
}

impl ExponentialBackoffBuilder {
    pub fn base(mut self, base: Duration) -> Self {
        self.base = base;
        self
    }

    pub fn factor(mut self, factor: Duration) -> Self {
        self.factor = factor;
        self
    }

    pub fn max(mut self, max: Duration) -> Self {
        self.max = max;
        self
    }

    pub fn build(self) -> Result<ExponentialBackoff, ConfigError> {
        if self.max < self.base {
            return Err(ConfigError("max backoff must be >= base".to_string()));
        }
        Ok(ExponentialBackoff {
            base: self.base,
            factor: self.factor,
            max: self.max,
            failures: AtomicUsize::new(0),
        })
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn proceed(&self, _entry: &Entry) -> Duration {
        let failures = self.failures.load(Ordering::Acquire);
        if failures == 0 {
            return Duration::ZERO;
        }
        let clamped = self.raw_delay(failures);
        let millis = clamped.as_millis() as u64;
        if millis == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=millis))
    }

    fn on_success(&self, _entry: &Entry) {
        self.failures.store(0, Ordering::Release);
    }

    // Exponential backoff never gives up on an entry; it only widens the
    // wait between attempts.
    fn on_failure(&self, _entry: &Entry, _err: &SinkError) -> bool {
        self.failures.fetch_add(1, Ordering::AcqRel);
        false
    }
}

/// Circuit breaker: once `threshold` failures have accumulated since the
/// last success, `proceed()` returns the time remaining until `backoff`
/// has elapsed since the most recent failure.
pub struct CircuitBreaker {
    threshold: usize,
    backoff: Duration,
    recent: AtomicUsize,
    last_failure_millis: AtomicU64,
    clock: Arc<dyn Clock>,
}

pub struct CircuitBreakerBuilder {
    threshold: usize,
    backoff: Duration,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn builder() -> CircuitBreakerBuilder {
        CircuitBreakerBuilder {
            threshold: 5,
            backoff: Duration::from_secs(30),
            clock: Arc::new(MonotonicClock::default()),
        }
    }

    /// Number of consecutive failures recorded since the last success.
    pub fn failure_count(&self) -> usize {
        self.recent.load(Ordering::Acquire)
    }
}

impl CircuitBreakerBuilder {
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn build(self) -> Result<CircuitBreaker, ConfigError> {
        if self.threshold == 0 {
            return Err(ConfigError("circuit breaker threshold must be positive".to_string()));
        }
        Ok(CircuitBreaker {
            threshold: self.threshold,
            backoff: self.backoff,
            recent: AtomicUsize::new(0),
            last_failure_millis: AtomicU64::new(0),
            clock: self.clock,
        })
    }
}

impl RetryStrategy for CircuitBreaker {
    fn proceed(&self, _entry: &Entry) -> Duration {
        let recent = self.recent.load(Ordering::Acquire);
        if recent < self.threshold {
            return Duration::ZERO;
        }
        let last = self.last_failure_millis.load(Ordering::Acquire);
        let elapsed = self.clock.now_millis().saturating_sub(last);
        let backoff_millis = self.backoff.as_millis() as u64;
        if elapsed >= backoff_millis {
            return Duration::ZERO;
        }
        Duration::from_millis(backoff_millis - elapsed)
    }

    fn on_success(&self, _entry: &Entry) {
        self.recent.store(0, Ordering::Release);
    }

    // The breaker never drops an entry either; it only opens the circuit
    // so callers back off before the next attempt.
    fn on_failure(&self, _entry: &Entry, _err: &SinkError) -> bool {
        self.recent.fetch_add(1, Ordering::AcqRel);
        self.last_failure_millis.store(self.clock.now_millis(), Ordering::Release);
        false
    }
}
