//! Process-wide DNS cache shared by every pooled connection.
//!
//! The cache is created by the first [`acquire`] and torn down when the last
//! [`ResolverHandle`] is dropped. Repeated engine init/shutdown cycles therefore
//! initialize and clear it exactly once per cycle.

use log::{debug, info};
use hyper::client::connect::dns::Name;
use reqwest::dns::{Addrs, Resolve, Resolving};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How long a resolved address set stays valid
pub const DNS_CACHE_TTL: Duration = Duration::from_secs(100);

struct CacheEntry {
    addrs: Vec<SocketAddr>,
    expires_at: Instant,
}

/// Resolver that memoizes lookups for [`DNS_CACHE_TTL`]. Clones share the cache.
#[derive(Clone)]
pub struct CachingResolver {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl CachingResolver {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached addresses for `host`, if present and not expired
    pub fn cached(&self, host: &str) -> Option<Vec<SocketAddr>> {
        let mut entries = self.entries();
        match entries.get(host) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.addrs.clone()),
            Some(_) => {
                entries.remove(host);
                None
            }
            None => None,
        }
    }

    fn store(&self, host: &str, addrs: Vec<SocketAddr>) {
        self.entries().insert(
            host.to_string(),
            CacheEntry {
                addrs,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Resolve through the cache, hitting the system resolver on a miss
    pub async fn lookup(&self, host: String) -> Result<Vec<SocketAddr>, std::io::Error> {
        if let Some(addrs) = self.cached(&host) {
            debug!("DNS cache hit for {}", host);
            return Ok(addrs);
        }

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
        if !addrs.is_empty() {
            self.store(&host, addrs.clone());
        }
        Ok(addrs)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&self) {
        self.entries().clear();
    }
}

impl Resolve for CachingResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.clone();
        let host = name.as_str().to_string();
        Box::pin(async move {
            let addrs = resolver.lookup(host).await?;
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(addrs)
        })
    }
}

struct GlobalState {
    resolver: Arc<CachingResolver>,
    handles: usize,
}

static GLOBAL: Mutex<Option<GlobalState>> = Mutex::new(None);

fn global() -> MutexGuard<'static, Option<GlobalState>> {
    GLOBAL.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reference to the process-wide resolver; keeps it alive while held
pub struct ResolverHandle {
    resolver: Arc<CachingResolver>,
}

impl ResolverHandle {
    pub fn resolver(&self) -> Arc<CachingResolver> {
        self.resolver.clone()
    }
}

impl Drop for ResolverHandle {
    fn drop(&mut self) {
        let mut global = global();
        let last = match global.as_mut() {
            Some(state) => {
                state.handles = state.handles.saturating_sub(1);
                state.handles == 0
            }
            None => false,
        };
        if last {
            if let Some(state) = global.take() {
                state.resolver.clear();
                info!("Shared DNS cache torn down");
            }
        }
    }
}

/// Take a reference to the shared resolver, creating it on first use
pub fn acquire() -> ResolverHandle {
    let mut global = global();
    let state = global.get_or_insert_with(|| {
        info!("Shared DNS cache initialized (ttl {:?})", DNS_CACHE_TTL);
        GlobalState {
            resolver: Arc::new(CachingResolver::new(DNS_CACHE_TTL)),
            handles: 0,
        }
    });
    state.handles += 1;
    ResolverHandle {
        resolver: state.resolver.clone(),
    }
}

/// Number of live handles on the shared resolver
pub fn active_handles() -> usize {
    global().as_ref().map_or(0, |state| state.handles)
}

/// Held by unit tests that create or drop resolver handles
#[cfg(test)]
pub(crate) static TEST_SERIALIZE: Mutex<()> = Mutex::new(());
