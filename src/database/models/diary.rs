// 日记实体
// 定义日记相关的数据库实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// 日记条目，对应数据库中的 diary_entries 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DiaryEntryEntity {
    /// 条目ID
    pub id: Uuid,
    /// 所属用户ID
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    /// 日记对应的日期
    pub date: DateTime<Utc>,
    pub mood: String,
    /// 要点列表
    pub key_points: Vec<String>,
    /// 要点数量，始终等于 key_points 的长度
    pub key_points_count: i32,
    pub favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 新建日记的字段
#[derive(Debug, Clone)]
pub struct NewDiaryEntry {
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub mood: String,
    pub key_points: Vec<String>,
    pub favorite: bool,
}

/// 日记更新允许修改的字段，None 表示保持不变
#[derive(Debug, Clone, Default)]
pub struct DiaryEntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub mood: Option<String>,
    pub key_points: Option<Vec<String>>,
    pub favorite: Option<bool>,
}

impl DiaryEntryPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.date.is_none()
            && self.mood.is_none()
            && self.key_points.is_none()
            && self.favorite.is_none()
    }
}
