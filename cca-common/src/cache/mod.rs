//! # Cache-aside layer
//!
//! ```text
//! CacheProvider (enum dispatch)
//!   ├── Redis(RedisCacheService)    <- shared across services, TTL via SETEX
//!   ├── Memory(MemoryCacheService)  <- moka, in-process
//!   └── NoOp(NoOpCacheService)      <- always miss, always succeed
//! ```
//!
//! Cache failures never fail a request: reads degrade to misses and writes
//! are logged and dropped. Redis connection failure at startup falls back
//! to NoOp.

pub mod errors;
pub mod provider;
pub mod providers;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use provider::CacheProvider;
pub use providers::{MemoryCacheService, NoOpCacheService, RedisCacheService};
pub use traits::CacheService;

/// Key builders shared by the services that read and invalidate them
pub mod keys {
    pub fn tests_list() -> String {
        "tests:list".to_string()
    }

    pub fn test_detail(test_id: i64) -> String {
        format!("test:{}:detail", test_id)
    }

    pub fn test_questions(test_id: i64) -> String {
        format!("test:{}:questions", test_id)
    }

    pub fn completion(user_id: &str) -> String {
        format!("completion:{}", user_id)
    }

    pub fn insights(user_id: &str) -> String {
        format!("insights:{}", user_id)
    }
}
