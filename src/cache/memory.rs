use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{CacheEntry, CacheStore, Clock, SystemClock};
use crate::error::Result;

/// In-process TTL store. Expiry is checked lazily on read; `purge_expired`
/// reclaims memory for keys nobody asks for again.
pub struct MemoryStore {
    state: RwLock<StoreState>,
    clock: Arc<dyn Clock>,
}

struct StoreState {
    entries: HashMap<String, CacheEntry>,
    used_bytes: u64,
    last_purge: Option<DateTime<Utc>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        debug!("Initializing in-memory cache store");
        Self {
            state: RwLock::new(StoreState {
                entries: HashMap::new(),
                used_bytes: 0,
                last_purge: None,
            }),
            clock,
        }
    }

    /// Drops every entry whose expiry has passed and returns how many went.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut state = self.state.write().await;

        let expired: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();

        let mut freed = 0u64;
        for key in &expired {
            if let Some(entry) = state.entries.remove(key) {
                freed += entry.value.len() as u64;
            }
        }
        state.used_bytes -= freed;
        state.last_purge = Some(now);

        info!(
            "Cache purge completed. Removed {} entries, freed {} bytes",
            expired.len(),
            freed
        );
        expired.len()
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            total_entries: state.entries.len(),
            used_bytes: state.used_bytes,
            last_purge: state.last_purge,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let now = self.clock.now();

        {
            let state = self.state.read().await;
            match state.entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // Expired: drop it unless a writer refreshed it in between.
        let mut state = self.state.write().await;
        let still_expired = state
            .entries
            .get(key)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false);
        if still_expired {
            if let Some(entry) = state.entries.remove(key) {
                state.used_bytes -= entry.value.len() as u64;
                debug!("Dropped expired cache entry for key: {}", key);
            }
            return Ok(None);
        }
        Ok(state.entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        let size = entry.value.len() as u64;

        let mut state = self.state.write().await;
        if let Some(old) = state.entries.insert(key.to_string(), entry) {
            state.used_bytes -= old.value.len() as u64;
        }
        state.used_bytes += size;
        debug!("Stored {} bytes for key: {}", size, key);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub total_entries: usize,
    pub used_bytes: u64,
    pub last_purge: Option<DateTime<Utc>>,
}
