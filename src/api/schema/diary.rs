use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::database::SessionSettingsEntity;
use crate::database::models::{DiaryEntryEntity, DiaryEntryPatch, NewDiaryEntry};
use crate::error::{AppError, AppResult};
use crate::utils::parse_entry_date;

const INVALID_DATE: &str = "date: must be RFC 3339 or YYYY-MM-DD";

// 新建日记请求
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntryRequest {
    #[validate(length(min = 1, message = "is required"))]
    pub title: String,
    pub content: String,
    /// RFC 3339 或 `YYYY-MM-DD`
    pub date: String,
    pub mood: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub favorite: bool,
}

impl CreateEntryRequest {
    pub fn into_new_entry(self) -> AppResult<NewDiaryEntry> {
        let date = parse_entry_date(&self.date)
            .ok_or_else(|| AppError::Validation(INVALID_DATE.to_string()))?;
        Ok(NewDiaryEntry {
            title: self.title,
            content: self.content,
            date,
            mood: self.mood,
            key_points: self.key_points,
            favorite: self.favorite,
        })
    }
}

// 更新日记请求，只接受白名单字段，未知字段忽略
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntryRequest {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<String>,
    pub mood: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub favorite: Option<bool>,
}

impl UpdateEntryRequest {
    pub fn into_patch(self) -> AppResult<DiaryEntryPatch> {
        let date = match self.date {
            Some(raw) => Some(
                parse_entry_date(&raw)
                    .ok_or_else(|| AppError::Validation(INVALID_DATE.to_string()))?,
            ),
            None => None,
        };
        Ok(DiaryEntryPatch {
            title: self.title,
            content: self.content,
            date,
            mood: self.mood,
            key_points: self.key_points,
            favorite: self.favorite,
        })
    }
}

/// 日记列表，登记了公钥的会话收到 JWE 字符串
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum EntryListData {
    Plain(Vec<DiaryEntryEntity>),
    Encrypted(String),
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EntryListResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    pub encrypted: bool,
    pub data: EntryListData,
}

/// 会话级应用配置
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppConfigView {
    #[schema(value_type = Option<Object>)]
    pub public_key: Option<serde_json::Value>,
    #[schema(value_type = Object)]
    pub preferences: serde_json::Value,
}

impl Default for AppConfigView {
    fn default() -> Self {
        Self {
            public_key: None,
            preferences: serde_json::json!({}),
        }
    }
}

impl From<SessionSettingsEntity> for AppConfigView {
    fn from(settings: SessionSettingsEntity) -> Self {
        Self {
            public_key: settings.public_key,
            preferences: settings.preferences,
        }
    }
}

/// `publicKey` 省略表示不变，`null` 表示删除
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppConfigRequest {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<Object>)]
    pub public_key: Option<Option<serde_json::Value>>,
    #[schema(value_type = Option<Object>)]
    pub preferences: Option<serde_json::Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<serde_json::Value>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<serde_json::Value>::deserialize(deserializer).map(Some)
}
