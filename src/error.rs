//! Error types for the audit pipeline.

use std::fmt;

/// Error returned by [`crate::sink::Sink::log`] and
/// [`crate::sink::Sink::close`].
#[derive(Debug)]
pub enum SinkError {
    /// The sink has been closed; no further entries are accepted.
    Closed,
    /// The terminal sink failed to dispatch the entry (I/O, transport, etc).
    Dispatch(String),
    /// Filesystem error from [`crate::sinks::file::FileSink`].
    Io(std::io::Error),
}

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "sink is closed"),
            Self::Dispatch(msg) => write!(f, "dispatch failed: {}", msg),
            Self::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl SinkError {
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch(_))
    }
}

/// Validation failure from one of the crate's builders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(pub String);

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

/// Error surfaced by [`crate::geoip::CachedGeoIpResolver`] when the wrapped
/// resolver itself fails. Generic over the resolver's own error type,
/// mirroring how the inner error is threaded through a wrapping policy
/// elsewhere in this crate.
#[derive(Debug)]
pub enum ResolverError<E> {
    /// The wrapped resolver failed.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for ResolverError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ResolverError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Inner(e) => Some(e),
        }
    }
}
