use serde::{Deserialize, Serialize};

/// 登录验证码缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CachedOtp {
    pub code: String,
    pub attempts: u32,
    pub expires_at: i64, // Unix timestamp, 毫秒
}

impl CachedOtp {
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at <= now_millis
    }

    /// 剩余有效秒数，至少为 1
    pub fn remaining_secs(&self, now_millis: i64) -> u64 {
        let remaining_ms = (self.expires_at - now_millis).max(0) as u64;
        remaining_ms.div_ceil(1000).max(1)
    }
}
