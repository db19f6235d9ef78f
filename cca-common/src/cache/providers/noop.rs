//! No-op cache provider
//!
//! Always returns None/success. Used when caching is disabled or when Redis
//! is unavailable at startup.

use crate::cache::errors::CacheResult;
use crate::cache::traits::CacheService;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct NoOpCacheService;

impl NoOpCacheService {
    pub fn new() -> Self {
        Self
    }
}

impl CacheService for NoOpCacheService {
    async fn get(&self, _key: &str) -> CacheResult<Option<String>> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Ok(())
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_never_stores() {
        let svc = NoOpCacheService::new();
        svc.set("key", "value", Duration::from_secs(60)).await.unwrap();
        assert_eq!(svc.get("key").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_noop_is_always_healthy() {
        let svc = NoOpCacheService::new();
        assert!(svc.health_check().await.unwrap());
        assert_eq!(svc.provider_name(), "noop");
    }
}
