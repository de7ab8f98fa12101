#![forbid(unsafe_code)]

//! # audittrail 🐾
//!
//! An async audit-trail pipeline: structured entries flow through an
//! optional retry wrapper and a bounded worker queue on their way to a
//! terminal sink, picking up HTTP and network/GeoIP context along the way.
//!
//! ## Pipeline shape
//!
//! - **Entry** — the record being audited (idempotency id, actor, action,
//!   module, correlation/causation ids, auth method, free-form details,
//!   occurred-at timestamp).
//! - **Sink** — the uniform contract every stage implements
//!   (`log`/`close`/`closed_signal`/`is_closed`).
//! - **AsyncQueue** — a bounded, multi-worker buffer in front of a
//!   downstream sink, with strict close-drain semantics.
//! - **RetrySink** — retries downstream failures per a pluggable
//!   [`strategy::RetryStrategy`] (exponential backoff or circuit breaker).
//! - **Decorators** — attach HTTP and network/GeoIP context to each entry
//!   before it reaches a terminal sink.
//! - **Terminal sinks** — `DiscardSink`, `MemorySink`, `FileSink` here;
//!   `audittrail-elastic`/`audittrail-kafka` provide bring-your-own-client
//!   Elasticsearch and Kafka sinks.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use audittrail::{
//!     AsyncQueue, CircuitBreaker, Context, Entry, ExponentialBackoff, MemorySink, RetryStrategy,
//!     RetrySink, Sink,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let downstream: Arc<dyn Sink> = Arc::new(MemorySink::new());
//!
//! let backoff = ExponentialBackoff::builder()
//!     .base(Duration::from_millis(50))
//!     .max(Duration::from_secs(5))
//!     .build()?;
//! let strategy: Arc<dyn RetryStrategy> = Arc::new(backoff);
//! let retry = Arc::new(RetrySink::builder().build(strategy, downstream)?);
//!
//! let queue = AsyncQueue::builder().workers(4).buffer(256).build(retry)?;
//!
//! let entry = Entry::builder("user-42", "login", "session").build()?;
//! queue.log(&Context::new(), entry).await?;
//! queue.close().await?;
//! # Ok(())
//! # }
//! ```

mod clock;
mod decorators;
mod entry;
mod error;
mod geoip;
mod queue;
mod retry;
mod sink;
mod sinks;
mod sleeper;
mod strategy;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use decorators::http::HttpDecorator;
pub use decorators::network::NetworkDecorator;
pub use entry::{Entry, EntryBuilder, GeoIpRecord, HttpDetails, NetworkDetails};
pub use error::{ConfigError, ResolverError, SinkError};
pub use geoip::{
    write_if_empty, CachedGeoIpResolver, CachedGeoIpResolverBuilder, ChainResolver, DatabaseHandler,
    GeoIpResolver,
};
pub use queue::{AsyncQueue, QueueBuilder};
pub use retry::{RetrySink, RetrySinkBuilder};
pub use sink::{ClosedSignal, Context, Sink};
pub use sinks::discard::DiscardSink;
pub use sinks::file::FileSink;
pub use sinks::memory::MemorySink;
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use strategy::{
    CircuitBreaker, CircuitBreakerBuilder, ExponentialBackoff, ExponentialBackoffBuilder,
    RetryStrategy,
};

pub mod prelude;
