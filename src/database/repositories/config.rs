use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::config::{
    GlobalConfigEntity, SessionSettingsEntity, SessionSettingsUpdate,
};

const GLOBAL_CONFIG_COLUMNS: &str = "id, is_active, is_maintenance_mode, is_maintenance_scheduled, \
     maintenance_start_time, maintenance_end_time, updated_at";

const SESSION_SETTINGS_COLUMNS: &str =
    "id, session_id, public_key, preferences, created_at, updated_at";

/// 全局配置存储库
#[async_trait]
pub trait GlobalConfigRepository: Send + Sync {
    async fn find_active(&self) -> Result<Option<GlobalConfigEntity>, sqlx::Error>;

    /// 维护窗口开始，打开维护模式 (幂等)
    async fn begin_maintenance(&self, id: Uuid) -> Result<Option<GlobalConfigEntity>, sqlx::Error>;

    /// 维护窗口结束，关闭维护模式并清除排期 (幂等)
    async fn finish_maintenance(&self, id: Uuid)
    -> Result<Option<GlobalConfigEntity>, sqlx::Error>;
}

/// 会话配置存储库
#[async_trait]
pub trait SessionSettingsRepository: Send + Sync {
    async fn find_by_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<SessionSettingsEntity>, sqlx::Error>;

    async fn upsert(
        &self,
        session_id: Uuid,
        update: SessionSettingsUpdate,
    ) -> Result<SessionSettingsEntity, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgGlobalConfigRepository {
    pool: PgPool,
}

impl PgGlobalConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GlobalConfigRepository for PgGlobalConfigRepository {
    async fn find_active(&self) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        sqlx::query_as::<_, GlobalConfigEntity>(&format!(
            "SELECT {GLOBAL_CONFIG_COLUMNS} FROM global_config WHERE is_active \
             ORDER BY updated_at DESC LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await
    }

    async fn begin_maintenance(&self, id: Uuid) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        sqlx::query_as::<_, GlobalConfigEntity>(&format!(
            r#"
            UPDATE global_config
            SET is_maintenance_mode = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING {GLOBAL_CONFIG_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn finish_maintenance(
        &self,
        id: Uuid,
    ) -> Result<Option<GlobalConfigEntity>, sqlx::Error> {
        sqlx::query_as::<_, GlobalConfigEntity>(&format!(
            r#"
            UPDATE global_config
            SET is_maintenance_mode = FALSE,
                is_maintenance_scheduled = FALSE,
                maintenance_start_time = NULL,
                maintenance_end_time = NULL,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {GLOBAL_CONFIG_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Clone)]
pub struct PgSessionSettingsRepository {
    pool: PgPool,
}

impl PgSessionSettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionSettingsRepository for PgSessionSettingsRepository {
    async fn find_by_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<SessionSettingsEntity>, sqlx::Error> {
        sqlx::query_as::<_, SessionSettingsEntity>(&format!(
            "SELECT {SESSION_SETTINGS_COLUMNS} FROM session_settings WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn upsert(
        &self,
        session_id: Uuid,
        update: SessionSettingsUpdate,
    ) -> Result<SessionSettingsEntity, sqlx::Error> {
        let replace_key = update.public_key.is_some();
        let public_key = update.public_key.flatten();

        sqlx::query_as::<_, SessionSettingsEntity>(&format!(
            r#"
            INSERT INTO session_settings (id, session_id, public_key, preferences)
            VALUES ($1, $2, $3, COALESCE($4, '{{}}'::jsonb))
            ON CONFLICT (session_id) DO UPDATE
            SET public_key = CASE WHEN $5 THEN EXCLUDED.public_key
                                  ELSE session_settings.public_key END,
                preferences = COALESCE($4, session_settings.preferences),
                updated_at = NOW()
            RETURNING {SESSION_SETTINGS_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(public_key)
        .bind(update.preferences)
        .bind(replace_key)
        .fetch_one(&self.pool)
        .await
    }
}
