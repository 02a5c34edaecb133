use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// 全局配置，控制维护模式
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GlobalConfigEntity {
    pub id: Uuid,
    pub is_active: bool,
    pub is_maintenance_mode: bool,
    pub is_maintenance_scheduled: bool,
    pub maintenance_start_time: Option<DateTime<Utc>>,
    pub maintenance_end_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl GlobalConfigEntity {
    /// 已排期的维护窗口 (开始, 结束)
    pub fn scheduled_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !self.is_maintenance_scheduled {
            return None;
        }
        Some((self.maintenance_start_time?, self.maintenance_end_time?))
    }
}

/// 会话级应用配置，public_key 为客户端登记的 RSA 公钥 (JWK)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionSettingsEntity {
    pub id: Uuid,
    pub session_id: Uuid,
    pub public_key: Option<serde_json::Value>,
    pub preferences: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 会话配置更新
///
/// `public_key`: None 保持不变, Some(None) 删除, Some(Some(jwk)) 替换。
#[derive(Debug, Clone, Default)]
pub struct SessionSettingsUpdate {
    pub public_key: Option<Option<serde_json::Value>>,
    pub preferences: Option<serde_json::Value>,
}
