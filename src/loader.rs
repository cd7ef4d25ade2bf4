use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::{CacheStore, CACHE_TTL};
use crate::error::{RelayError, Result};
use crate::network::Fetcher;

/// What to do when the cache backend itself cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheFailurePolicy {
    /// Log and go straight to the upstream, as if the cache were empty.
    #[default]
    Bypass,
    /// Fail the request with `CacheUnavailable`.
    Fail,
}

/// Cache-aside resolver: serve from the store when fresh, otherwise fetch,
/// store with the fixed TTL and serve.
///
/// Concurrent misses on one key may each fetch; the store keeps the last write.
/// Failed fetches are never stored.
#[derive(Clone)]
pub struct Loader {
    cache: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    ttl: Duration,
    on_cache_failure: CacheFailurePolicy,
}

impl Loader {
    pub fn new(cache: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cache,
            fetcher,
            ttl: CACHE_TTL,
            on_cache_failure: CacheFailurePolicy::default(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cache_failure_policy(mut self, policy: CacheFailurePolicy) -> Self {
        self.on_cache_failure = policy;
        self
    }

    pub async fn load(&self, url: &str) -> Result<Bytes> {
        match self.cache.get(url).await {
            Ok(Some(data)) => {
                debug!("Cache hit for {} ({} bytes)", url, data.len());
                return Ok(data);
            }
            Ok(None) => debug!("Cache miss for {}", url),
            Err(e) => self.cache_failed("read", url, e)?,
        }

        let data = self.fetcher.fetch(url).await?;

        if let Err(e) = self.cache.set(url, data.clone(), self.ttl).await {
            self.cache_failed("write", url, e)?;
        }
        Ok(data)
    }

    fn cache_failed(&self, op: &str, url: &str, err: RelayError) -> Result<()> {
        match (&err, self.on_cache_failure) {
            (RelayError::CacheUnavailable(_), CacheFailurePolicy::Bypass) => {
                warn!(
                    "Cache {} failed on {} backend for {}, bypassing: {}",
                    op,
                    self.cache.name(),
                    url,
                    err
                );
                Ok(())
            }
            _ => Err(err),
        }
    }
}
