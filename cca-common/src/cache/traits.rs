//! Cache service trait definition

use super::errors::CacheResult;
use std::time::Duration;

/// Operations every cache backend provides
///
/// Values are opaque strings (callers store JSON).
pub trait CacheService: Send + Sync {
    /// `Ok(Some(value))` on hit, `Ok(None)` on miss
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<String>>> + Send;

    /// Set a value with a TTL
    fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    fn delete(&self, key: &str) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    fn provider_name(&self) -> &'static str;
}
