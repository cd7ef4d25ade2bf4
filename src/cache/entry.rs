use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: Bytes,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(value: Bytes, now: DateTime<Utc>, ttl: Duration) -> Self {
        let expires_at = ChronoDuration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { value, expires_at }
    }

    /// Readable only strictly before `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        let entry = CacheEntry::new(Bytes::from_static(b"x"), now, Duration::from_secs(10));

        assert!(!entry.is_expired(now));
        assert!(!entry.is_expired(now + ChronoDuration::seconds(9)));
        assert!(entry.is_expired(now + ChronoDuration::seconds(10)));
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let entry = CacheEntry::new(Bytes::new(), Utc::now(), Duration::MAX);
        assert!(!entry.is_expired(Utc::now()));
    }
}
