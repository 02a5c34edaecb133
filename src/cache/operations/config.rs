use crate::cache::keys::GLOBAL_CONFIG_KEY;
use crate::cache::operations::set_json;
use crate::cache::{Cache, CacheError};
use crate::database::models::config::GlobalConfigEntity;

/// 全局配置缓存时间 (24小时)
pub const GLOBAL_CONFIG_TTL_SECS: u64 = 24 * 3600;

/// 全局配置缓存操作
pub struct ConfigCacheOperations;

impl ConfigCacheOperations {
    /// 用数据库最新值覆盖缓存
    pub async fn replace(cache: &dyn Cache, config: &GlobalConfigEntity) -> Result<(), CacheError> {
        cache.delete(GLOBAL_CONFIG_KEY).await?;
        set_json(cache, GLOBAL_CONFIG_KEY, config, Some(GLOBAL_CONFIG_TTL_SECS)).await
    }

    pub async fn invalidate(cache: &dyn Cache) -> Result<(), CacheError> {
        cache.delete(GLOBAL_CONFIG_KEY).await
    }
}
