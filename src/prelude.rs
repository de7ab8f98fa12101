//! Convenient re-exports for common audittrail types.
pub use crate::{
    clock::{Clock, ManualClock, MonotonicClock},
    decorators::http::HttpDecorator,
    decorators::network::NetworkDecorator,
    entry::{Entry, EntryBuilder, GeoIpRecord, HttpDetails, NetworkDetails},
    error::{ConfigError, ResolverError, SinkError},
    geoip::{write_if_empty, CachedGeoIpResolver, ChainResolver, DatabaseHandler, GeoIpResolver},
    queue::{AsyncQueue, QueueBuilder},
    retry::{RetrySink, RetrySinkBuilder},
    sink::{ClosedSignal, Context, Sink},
    sinks::discard::DiscardSink,
    sinks::file::FileSink,
    sinks::memory::MemorySink,
    sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper},
    strategy::{CircuitBreaker, ExponentialBackoff, RetryStrategy},
};
