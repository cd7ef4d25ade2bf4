use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::CacheStore;
use crate::error::{RelayError, Result};

/// Redis-backed store. Keys are the request URL, optionally prefixed; expiry
/// is delegated to `SETEX`.
///
/// The connection is opened on first use so the service can start (and
/// bypass the cache) while Redis is down. A command that fails at the
/// transport level discards the connection and the next call reconnects.
pub struct RedisStore {
    client: Client,
    prefix: String,
    conn: Mutex<Option<MultiplexedConnection>>,
}

impl RedisStore {
    pub fn open(url: &str, prefix: impl Into<String>) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| RelayError::Config(format!("invalid redis url {}: {}", url, e)))?;
        info!("Using redis cache store at {}", url);
        Ok(Self {
            client,
            prefix: prefix.into(),
            conn: Mutex::new(None),
        })
    }

    fn prefixed_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        debug!("Connecting to redis");
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| RelayError::CacheUnavailable(format!("redis connection error: {}", e)))?;
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn command_failed(&self, op: &str, err: RedisError) -> RelayError {
        if err.is_io_error() || err.is_unrecoverable_error() {
            warn!("Redis connection lost during {}, reconnecting on next use: {}", op, err);
            self.conn.lock().await.take();
        }
        RelayError::CacheUnavailable(format!("redis {} error: {}", op, err))
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let mut conn = self.connection().await?;
        let value: Option<Vec<u8>> = match conn.get(self.prefixed_key(key)).await {
            Ok(value) => value,
            Err(e) => return Err(self.command_failed("GET", e).await),
        };
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let mut conn = self.connection().await?;
        // SETEX rejects a zero expiry.
        let seconds = ttl.as_secs().max(1);
        let result: redis::RedisResult<()> = conn
            .set_ex(self.prefixed_key(key), value.as_ref(), seconds)
            .await;
        match result {
            Ok(()) => Ok(()),
            Err(e) => Err(self.command_failed("SETEX", e).await),
        }
    }
}
