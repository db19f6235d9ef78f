//! Enum-dispatched cache provider
//!
//! Wraps the concrete backends so services hold one cloneable handle, and
//! adds the JSON cache-aside helpers the services call. Every helper swallows
//! backend errors after logging them.

use super::errors::CacheResult;
use super::providers::{MemoryCacheService, NoOpCacheService, RedisCacheService};
use super::traits::CacheService;
use crate::config::{CacheBackendKind, CacheConfig};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone)]
enum CacheBackend {
    Redis(Box<RedisCacheService>),
    Memory(Box<MemoryCacheService>),
    NoOp(NoOpCacheService),
}

#[derive(Debug, Clone)]
pub struct CacheProvider {
    backend: Arc<CacheBackend>,
    default_ttl: Duration,
}

impl CacheProvider {
    /// Build from configuration, falling back to NoOp if Redis is unreachable
    pub async fn from_config_graceful(config: &CacheConfig) -> Self {
        let default_ttl = Duration::from_secs(config.default_ttl_seconds);

        let backend = match config.backend {
            CacheBackendKind::Redis => {
                let url = &config.redis_url;
                match RedisCacheService::from_url(url).await {
                    Ok(svc) => {
                        info!(url = %url, "Cache backend: redis");
                        CacheBackend::Redis(Box::new(svc))
                    }
                    Err(e) => {
                        warn!(error = %e, "Redis unavailable, caching disabled");
                        CacheBackend::NoOp(NoOpCacheService::new())
                    }
                }
            }
            CacheBackendKind::Memory => {
                info!(capacity = config.memory_capacity, "Cache backend: memory");
                CacheBackend::Memory(Box::new(MemoryCacheService::new(config.memory_capacity)))
            }
            CacheBackendKind::None => {
                info!("Cache backend: none");
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        };

        Self {
            backend: Arc::new(backend),
            default_ttl,
        }
    }

    pub fn noop() -> Self {
        Self {
            backend: Arc::new(CacheBackend::NoOp(NoOpCacheService::new())),
            default_ttl: Duration::from_secs(3600),
        }
    }

    pub fn memory(capacity: u64, default_ttl: Duration) -> Self {
        Self {
            backend: Arc::new(CacheBackend::Memory(Box::new(MemoryCacheService::new(
                capacity,
            )))),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(*self.backend, CacheBackend::NoOp(_))
    }

    pub async fn get(&self, key: &str) -> CacheResult<Option<String>> {
        match &*self.backend {
            CacheBackend::Redis(s) => s.get(key).await,
            CacheBackend::Memory(s) => s.get(key).await,
            CacheBackend::NoOp(s) => s.get(key).await,
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        match &*self.backend {
            CacheBackend::Redis(s) => s.set(key, value, ttl).await,
            CacheBackend::Memory(s) => s.set(key, value, ttl).await,
            CacheBackend::NoOp(s) => s.set(key, value, ttl).await,
        }
    }

    pub async fn delete(&self, key: &str) -> CacheResult<()> {
        match &*self.backend {
            CacheBackend::Redis(s) => s.delete(key).await,
            CacheBackend::Memory(s) => s.delete(key).await,
            CacheBackend::NoOp(s) => s.delete(key).await,
        }
    }

    pub async fn health_check(&self) -> CacheResult<bool> {
        match &*self.backend {
            CacheBackend::Redis(s) => s.health_check().await,
            CacheBackend::Memory(s) => s.health_check().await,
            CacheBackend::NoOp(s) => s.health_check().await,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match &*self.backend {
            CacheBackend::Redis(s) => s.provider_name(),
            CacheBackend::Memory(s) => s.provider_name(),
            CacheBackend::NoOp(s) => s.provider_name(),
        }
    }

    /// Typed read; misses on backend errors and on undecodable entries
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                let _ = self.delete(key).await;
                None
            }
        }
    }

    /// Typed write with the provider's default TTL
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        self.set_json_with_ttl(key, value, self.default_ttl).await
    }

    pub async fn set_json_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache value not serializable");
                return;
            }
        };
        if let Err(e) = self.set(key, &raw, ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }

    /// Best-effort invalidation of a set of keys
    pub async fn invalidate(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.delete(key).await {
                warn!(key = %key, error = %e, "Cache invalidation failed");
            }
        }
    }

    /// Cache-aside: return the cached value or run `load`, store, and return it
    ///
    /// Load errors propagate and nothing is cached.
    pub async fn get_or_load<T, E, F, Fut>(&self, key: &str, ttl: Duration, load: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get_json::<T>(key).await {
            return Ok(hit);
        }
        let value = load().await?;
        self.set_json_with_ttl(key, &value, ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_none_backend_is_noop() {
        let provider = CacheProvider::from_config_graceful(&CacheConfig::default()).await;
        assert_eq!(provider.provider_name(), "noop");
        assert!(!provider.is_enabled());
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_noop() {
        let config = CacheConfig {
            backend: CacheBackendKind::Redis,
            redis_url: "redis://127.0.0.1:1".to_string(),
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config).await;
        assert_eq!(provider.provider_name(), "noop");
    }

    #[tokio::test]
    async fn test_get_or_load_caches_value() {
        let provider = CacheProvider::memory(100, Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<Vec<i64>, std::convert::Infallible> = provider
                .get_or_load("test:1:questions", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await;
            assert_eq!(value.unwrap(), vec![1, 2, 3]);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_or_load_error_not_cached() {
        let provider = CacheProvider::memory(100, Duration::from_secs(60));

        let failed: Result<i64, String> = provider
            .get_or_load("k", Duration::from_secs(60), || async { Err("boom".to_string()) })
            .await;
        assert!(failed.is_err());
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let provider = CacheProvider::memory(100, Duration::from_secs(60));
        provider
            .set("k", "not json", Duration::from_secs(60))
            .await
            .unwrap();
        let value: Option<Vec<i64>> = provider.get_json("k").await;
        assert!(value.is_none());
        assert_eq!(provider.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate_keys() {
        let provider = CacheProvider::memory(100, Duration::from_secs(60));
        provider.set_json("completion:u1", &42).await;
        provider.set_json("insights:u1", &7).await;
        provider
            .invalidate(&[
                crate::cache::keys::completion("u1"),
                crate::cache::keys::insights("u1"),
            ])
            .await;
        assert_eq!(provider.get_json::<i64>("completion:u1").await, None);
        assert_eq!(provider.get_json::<i64>("insights:u1").await, None);
    }
}
