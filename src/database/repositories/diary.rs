// 日记存储库
// 所有查询都以 user_id 限定归属

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::diary::{DiaryEntryEntity, DiaryEntryPatch, NewDiaryEntry};

const DIARY_COLUMNS: &str = "id, user_id, title, content, date, mood, key_points, \
     key_points_count, favorite, created_at, updated_at";

/// 日记存储库
#[async_trait]
pub trait DiaryRepository: Send + Sync {
    async fn create(
        &self,
        user_id: Uuid,
        entry: NewDiaryEntry,
    ) -> Result<DiaryEntryEntity, sqlx::Error>;

    /// 按日期倒序返回用户的全部日记
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DiaryEntryEntity>, sqlx::Error>;

    async fn find_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DiaryEntryEntity>, sqlx::Error>;

    /// 条目不存在或不属于该用户时返回 None
    async fn update_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: DiaryEntryPatch,
    ) -> Result<Option<DiaryEntryEntity>, sqlx::Error>;

    /// 返回是否删除了条目
    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgDiaryRepository {
    pool: PgPool,
}

impl PgDiaryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DiaryRepository for PgDiaryRepository {
    async fn create(
        &self,
        user_id: Uuid,
        entry: NewDiaryEntry,
    ) -> Result<DiaryEntryEntity, sqlx::Error> {
        sqlx::query_as::<_, DiaryEntryEntity>(&format!(
            r#"
            INSERT INTO diary_entries
                (id, user_id, title, content, date, mood, key_points, key_points_count, favorite)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {DIARY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(entry.date)
        .bind(&entry.mood)
        .bind(&entry.key_points)
        .bind(entry.key_points.len() as i32)
        .bind(entry.favorite)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<DiaryEntryEntity>, sqlx::Error> {
        sqlx::query_as::<_, DiaryEntryEntity>(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary_entries WHERE user_id = $1 ORDER BY date DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DiaryEntryEntity>, sqlx::Error> {
        sqlx::query_as::<_, DiaryEntryEntity>(&format!(
            "SELECT {DIARY_COLUMNS} FROM diary_entries WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update_for_user(
        &self,
        user_id: Uuid,
        id: Uuid,
        patch: DiaryEntryPatch,
    ) -> Result<Option<DiaryEntryEntity>, sqlx::Error> {
        let key_points_count = patch.key_points.as_ref().map(|points| points.len() as i32);

        sqlx::query_as::<_, DiaryEntryEntity>(&format!(
            r#"
            UPDATE diary_entries
            SET title = COALESCE($3, title),
                content = COALESCE($4, content),
                date = COALESCE($5, date),
                mood = COALESCE($6, mood),
                key_points = COALESCE($7, key_points),
                key_points_count = COALESCE($8, key_points_count),
                favorite = COALESCE($9, favorite),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {DIARY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(patch.title)
        .bind(patch.content)
        .bind(patch.date)
        .bind(patch.mood)
        .bind(patch.key_points)
        .bind(key_points_count)
        .bind(patch.favorite)
        .fetch_optional(&self.pool)
        .await
    }

    async fn delete_for_user(&self, user_id: Uuid, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM diary_entries WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
