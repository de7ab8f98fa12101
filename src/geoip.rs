//! GeoIP resolution: database handlers, the first-non-empty-write merge
//! discipline, and a cached resolver with single-flight de-duplication.
//!
//! Concrete MaxMind (or any other) database parsing is out of scope here;
//! this module defines the [`DatabaseHandler`] trait and merge discipline
//! a caller's own database bindings plug into.

use crate::entry::GeoIpRecord;
use futures::future::{FutureExt, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::future::Future;
use std::net::IpAddr;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

/// Writes `value` into `target` only if `target` is still at its default,
/// and `value` itself is non-default. Mirrors the original's generic
/// `writeIfNotEmpty[T comparable]` helper.
pub fn write_if_empty<T: PartialEq + Default>(target: &mut T, value: T) -> bool {
    if *target == T::default() && value != T::default() {
        *target = value;
        true
    } else {
        false
    }
}

/// One MaxMind-style database lookup, applied to an in-progress
/// [`GeoIpRecord`]. Implementors look up `ip` in their own backing
/// database and merge whatever fields they own using [`write_if_empty`].
pub trait DatabaseHandler: Send + Sync {
    fn handle(&self, ip: IpAddr, record: &mut GeoIpRecord);
}

/// Resolves a [`GeoIpRecord`] for an IP address.
pub trait GeoIpResolver: Send + Sync {
    fn resolve(&self, ip: IpAddr) -> GeoIpRecord;
}

/// Runs an ordered chain of [`DatabaseHandler`]s over one [`GeoIpRecord`],
/// each contributing the fields it owns.
pub struct ChainResolver {
    handlers: Vec<Box<dyn DatabaseHandler>>,
}

impl ChainResolver {
    pub fn new(handlers: Vec<Box<dyn DatabaseHandler>>) -> Self {
        Self { handlers }
    }
}

impl GeoIpResolver for ChainResolver {
    fn resolve(&self, ip: IpAddr) -> GeoIpRecord {
        let mut record = GeoIpRecord::default();
        for handler in &self.handlers {
            handler.handle(ip, &mut record);
        }
        record
    }
}

type SharedLookup = Shared<Pin<Box<dyn Future<Output = GeoIpRecord> + Send>>>;

/// Wraps a [`GeoIpResolver`] with an LRU cache and single-flight
/// de-duplication, so concurrent lookups of the same address collapse
/// onto one resolution instead of each re-querying the inner resolver.
pub struct CachedGeoIpResolver<R: GeoIpResolver + 'static> {
    inner: Arc<R>,
    cache: Arc<Mutex<LruCache<IpAddr, GeoIpRecord>>>,
    inflight: Arc<Mutex<HashMap<IpAddr, SharedLookup>>>,
}

pub struct CachedGeoIpResolverBuilder<R: GeoIpResolver + 'static> {
    inner: Arc<R>,
    capacity: usize,
}

impl<R: GeoIpResolver + 'static> CachedGeoIpResolver<R> {
    pub fn builder(inner: R) -> CachedGeoIpResolverBuilder<R> {
        CachedGeoIpResolverBuilder { inner: Arc::new(inner), capacity: 1024 }
    }

    /// Resolve `ip`, serving from cache when possible and collapsing
    /// concurrent lookups of the same address onto one in-flight future.
    pub async fn resolve(&self, ip: IpAddr) -> GeoIpRecord {
        if let Some(record) = self.cache.lock().expect("geoip cache mutex poisoned").get(&ip) {
            tracing::trace!(%ip, "geoip cache hit");
            return record.clone();
        }

        let fut = {
            let mut inflight = self.inflight.lock().expect("geoip inflight mutex poisoned");
            if let Some(existing) = inflight.get(&ip) {
                existing.clone()
            } else {
                tracing::debug!(%ip, "geoip cache miss, resolving");
                let inner = self.inner.clone();
                let cache = self.cache.clone();
                let inflight_map = self.inflight.clone();
                let fut: Pin<Box<dyn Future<Output = GeoIpRecord> + Send>> = Box::pin(async move {
                    let record = tokio::task::spawn_blocking(move || inner.resolve(ip))
                        .await
                        .unwrap_or_default();
                    cache.lock().expect("geoip cache mutex poisoned").put(ip, record.clone());
                    inflight_map.lock().expect("geoip inflight mutex poisoned").remove(&ip);
                    record
                });
                let shared = fut.shared();
                inflight.insert(ip, shared.clone());
                shared
            }
        };

        fut.await
    }

    /// Evict `ip` from the cache, returning its cached record if present.
    pub fn remove(&self, ip: &IpAddr) -> Option<GeoIpRecord> {
        self.cache.lock().expect("geoip cache mutex poisoned").pop(ip)
    }

    /// Evict every cached record.
    pub fn purge(&self) {
        self.cache.lock().expect("geoip cache mutex poisoned").clear();
    }

    /// Number of records currently cached.
    pub fn size(&self) -> usize {
        self.cache.lock().expect("geoip cache mutex poisoned").len()
    }

    /// Whether `ip` is currently cached.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        self.cache.lock().expect("geoip cache mutex poisoned").contains(ip)
    }
}

impl<R: GeoIpResolver + 'static> CachedGeoIpResolverBuilder<R> {
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> CachedGeoIpResolver<R> {
        let capacity = NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::new(1024).unwrap());
        CachedGeoIpResolver {
            inner: self.inner,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            inflight: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
