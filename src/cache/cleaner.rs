use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::MemoryStore;

/// Periodically reclaims expired entries from a [`MemoryStore`]. Reads never
/// depend on it; expiry is already enforced at lookup time.
pub struct CacheCleaner {
    cache: Arc<MemoryStore>,
    interval: Duration,
}

impl CacheCleaner {
    pub fn new(cache: Arc<MemoryStore>, interval: Duration) -> Self {
        Self { cache, interval }
    }

    pub fn start(self) -> JoinHandle<()> {
        info!("Starting cache cleaner with interval {:?}", self.interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                debug!("Running cache cleanup cycle");
                let removed = self.cache.purge_expired().await;
                debug!("Cache cleanup removed {} entries", removed);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::testing::ManualClock;
    use crate::cache::CacheStore;
    use bytes::Bytes;

    #[tokio::test(start_paused = true)]
    async fn test_cleaner_purges_on_tick() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(MemoryStore::with_clock(clock.clone()));
        cache
            .set("k", Bytes::from_static(b"v"), Duration::from_secs(1))
            .await
            .unwrap();
        clock.advance(Duration::from_secs(2));

        let handle = CacheCleaner::new(cache.clone(), Duration::from_secs(60)).start();
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(cache.stats().await.total_entries, 0);
        handle.abort();
    }
}
