// 缓存模块
// 包含缓存客户端、缓存键、缓存数据结构和操作逻辑

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

pub use models::otp::CachedOtp;
pub use store::{Cache, CacheError, MemoryCache, RedisCache};
