use crate::cache::keys::diary_entries_key;
use crate::cache::operations::{get_json, set_json};
use crate::cache::{Cache, CacheError};
use crate::database::models::diary::DiaryEntryEntity;

/// 日记列表缓存时间 (1小时)
pub const DIARY_ENTRIES_TTL_SECS: u64 = 3600;

/// 日记列表缓存操作
pub struct DiaryCacheOperations;

impl DiaryCacheOperations {
    pub async fn get_entries(
        cache: &dyn Cache,
        user_id: &str,
    ) -> Result<Option<Vec<DiaryEntryEntity>>, CacheError> {
        get_json(cache, &diary_entries_key(user_id)).await
    }

    pub async fn cache_entries(
        cache: &dyn Cache,
        user_id: &str,
        entries: &[DiaryEntryEntity],
    ) -> Result<(), CacheError> {
        set_json(
            cache,
            &diary_entries_key(user_id),
            &entries,
            Some(DIARY_ENTRIES_TTL_SECS),
        )
        .await
    }

    /// 用户日记发生变更后删除列表缓存
    pub async fn invalidate(cache: &dyn Cache, user_id: &str) {
        if let Err(e) = cache.delete(&diary_entries_key(user_id)).await {
            tracing::warn!("Failed to invalidate diary cache for user {}: {}", user_id, e);
        }
    }
}
