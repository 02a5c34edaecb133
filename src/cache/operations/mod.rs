/// 缓存操作
/// 提供缓存操作的功能实现

// 登录验证码缓存操作
pub mod otp;

// 日记列表缓存操作
pub mod diary;

// 全局配置缓存操作
pub mod config;

use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use crate::cache::{Cache, CacheError};

pub use config::ConfigCacheOperations;
pub use diary::DiaryCacheOperations;
pub use otp::OtpCacheOperations;

/// 读取并反序列化 JSON 缓存
pub async fn get_json<T: DeserializeOwned>(
    cache: &dyn Cache,
    key: &str,
) -> Result<Option<T>, CacheError> {
    match cache.get(key).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// 序列化为 JSON 写入缓存
pub async fn set_json<T: Serialize>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl_secs: Option<u64>,
) -> Result<(), CacheError> {
    let json = serde_json::to_string(value)?;
    cache.set(key, &json, ttl_secs).await
}

/// 先读缓存，未命中时调用 `load` 并回写
///
/// `load` 返回 None 时不写缓存。缓存读取失败只记录日志，直接走 `load`。
pub async fn get_or_load<T, E, F, Fut>(
    cache: &dyn Cache,
    key: &str,
    ttl_secs: Option<u64>,
    load: F,
) -> Result<Option<T>, E>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    match get_json::<T>(cache, key).await {
        Ok(Some(hit)) => return Ok(Some(hit)),
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to read cache key {}: {}", key, e),
    }

    let loaded = load().await?;
    if let Some(value) = &loaded {
        if let Err(e) = set_json(cache, key, value, ttl_secs).await {
            tracing::warn!("Failed to write cache key {}: {}", key, e);
        }
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[tokio::test]
    async fn get_or_load_caches_loaded_value() {
        let cache = MemoryCache::new();
        let first: Result<Option<Vec<u32>>, CacheError> =
            get_or_load(&cache, "nums", Some(60), || async { Ok(Some(vec![1, 2])) }).await;
        assert_eq!(first.unwrap(), Some(vec![1, 2]));

        // 第二次命中缓存，不再调用 load
        let second: Result<Option<Vec<u32>>, CacheError> =
            get_or_load(&cache, "nums", Some(60), || async { Ok(Some(vec![9])) }).await;
        assert_eq!(second.unwrap(), Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn get_or_load_skips_caching_none() {
        let cache = MemoryCache::new();
        let loaded: Result<Option<String>, CacheError> =
            get_or_load(&cache, "missing", None, || async { Ok(None) }).await;
        assert_eq!(loaded.unwrap(), None);
        assert!(!cache.exists("missing").await.unwrap());
    }
}
