//! Cache provider implementations

pub mod memory;
pub mod noop;
pub mod redis;

pub use self::redis::RedisCacheService;
pub use memory::MemoryCacheService;
pub use noop::NoOpCacheService;
