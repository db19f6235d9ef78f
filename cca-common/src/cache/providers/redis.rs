//! Redis cache provider
//!
//! Uses `redis::aio::ConnectionManager` for automatic reconnection.
//! Pattern deletion walks the keyspace with SCAN, never KEYS.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheService;
use redis::aio::ConnectionManager;
use std::time::Duration;
use tracing::debug;

#[derive(Clone)]
pub struct RedisCacheService {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheService").finish_non_exhaustive()
    }
}

impl RedisCacheService {
    /// Connect to Redis
    ///
    /// Fails if the URL is invalid or the server is unreachable; callers
    /// decide whether to fall back to NoOp.
    pub async fn from_url(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        debug!(url = %url, "Redis cache connected");
        Ok(Self { connection })
    }
}

impl CacheService for RedisCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        let mut conn = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis GET failed: {}", e)))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        let ttl_secs = ttl.as_secs().max(1);
        redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis SETEX failed: {}", e)))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<()>(&mut conn)
            .await
            .map_err(|e| CacheError::BackendError(format!("Redis DEL failed: {}", e)))
    }

    async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;
        Ok(pong == "PONG")
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_is_connection_error() {
        let result = RedisCacheService::from_url("not-a-redis-url").await;
        assert!(matches!(result, Err(CacheError::ConnectionError(_))));
    }
}
