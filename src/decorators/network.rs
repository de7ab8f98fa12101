//! Attaches network/client details — optionally GeoIP-enriched — from
//! [`Context`] onto each logged entry.

use crate::entry::Entry;
use crate::error::SinkError;
use crate::geoip::{CachedGeoIpResolver, GeoIpResolver};
use crate::sink::{ClosedSignal, Context, Sink};
use async_trait::async_trait;
use std::sync::Arc;

/// Wraps a [`Sink`], merging `ctx.network` into the entry's
/// `details["client"]` field, enriching it with a GeoIP lookup of the
/// remote address when a resolver is configured. A no-op when
/// `ctx.network` is `None`.
pub struct NetworkDecorator<R: GeoIpResolver + 'static> {
    inner: Arc<dyn Sink>,
    resolver: Option<Arc<CachedGeoIpResolver<R>>>,
}

impl<R: GeoIpResolver + 'static> NetworkDecorator<R> {
    pub fn new(inner: Arc<dyn Sink>) -> Self {
        Self { inner, resolver: None }
    }

    pub fn with_geoip(mut self, resolver: Arc<CachedGeoIpResolver<R>>) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

#[async_trait]
impl<R: GeoIpResolver + 'static> Sink for NetworkDecorator<R> {
    async fn log(&self, ctx: &Context, mut entry: Entry) -> Result<(), SinkError> {
        if let Some(network) = &ctx.network {
            let mut network = network.clone();

            if network.geo.is_none() {
                if let Some(resolver) = &self.resolver {
                    if let Ok(ip) = network.remote_ip.parse() {
                        network.geo = Some(resolver.resolve(ip).await);
                    }
                }
            }

            let value = serde_json::to_value(&network)
                .map_err(|e| SinkError::Dispatch(format!("failed to encode network details: {}", e)))?;
            entry.set_detail_if_absent("client", value);
        }
        self.inner.log(ctx, entry).await
    }

    async fn close(&self) -> Result<(), SinkError> {
        self.inner.close().await
    }

    fn closed_signal(&self) -> ClosedSignal {
        self.inner.closed_signal()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
