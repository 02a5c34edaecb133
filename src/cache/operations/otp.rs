use crate::cache::keys::login_otp_key;
use crate::cache::models::otp::CachedOtp;
use crate::cache::operations::{get_json, set_json};
use crate::cache::{Cache, CacheError};

/// 登录验证码缓存操作
pub struct OtpCacheOperations;

impl OtpCacheOperations {
    /// 是否已有未过期的验证码
    pub async fn is_pending(cache: &dyn Cache, user_id: &str) -> Result<bool, CacheError> {
        cache.exists(&login_otp_key(user_id)).await
    }

    /// 缓存新的验证码，尝试次数清零
    pub async fn issue(
        cache: &dyn Cache,
        user_id: &str,
        code: &str,
        ttl_secs: u64,
    ) -> Result<CachedOtp, CacheError> {
        let otp = CachedOtp {
            code: code.to_string(),
            attempts: 0,
            expires_at: chrono::Utc::now().timestamp_millis() + (ttl_secs as i64) * 1000,
        };
        set_json(cache, &login_otp_key(user_id), &otp, Some(ttl_secs)).await?;
        Ok(otp)
    }

    pub async fn get(cache: &dyn Cache, user_id: &str) -> Result<Option<CachedOtp>, CacheError> {
        get_json(cache, &login_otp_key(user_id)).await
    }

    /// 记录一次失败尝试，保留原过期时间
    pub async fn record_failed_attempt(
        cache: &dyn Cache,
        user_id: &str,
        otp: &CachedOtp,
    ) -> Result<CachedOtp, CacheError> {
        let now = chrono::Utc::now().timestamp_millis();
        let updated = CachedOtp {
            attempts: otp.attempts + 1,
            ..otp.clone()
        };
        set_json(
            cache,
            &login_otp_key(user_id),
            &updated,
            Some(updated.remaining_secs(now)),
        )
        .await?;
        Ok(updated)
    }

    pub async fn remove(cache: &dyn Cache, user_id: &str) -> Result<(), CacheError> {
        cache.delete(&login_otp_key(user_id)).await
    }
}
