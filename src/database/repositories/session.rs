use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::session::{NewSession, SessionEntity};

const SESSION_COLUMNS: &str =
    "id, user_id, ip_address, user_agent, is_active, expires_at, created_at, updated_at";

/// 登录会话存储库
#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: NewSession) -> Result<SessionEntity, sqlx::Error>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionEntity>, sqlx::Error>;

    /// 将用户的所有会话置为失效，返回受影响行数
    async fn deactivate_for_user(&self, user_id: Uuid) -> Result<u64, sqlx::Error>;
}

#[derive(Clone)]
pub struct PgSessionRepository {
    pool: PgPool,
}

impl PgSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionRepository for PgSessionRepository {
    async fn create(&self, session: NewSession) -> Result<SessionEntity, sqlx::Error> {
        sqlx::query_as::<_, SessionEntity>(&format!(
            r#"
            INSERT INTO sessions (id, user_id, ip_address, user_agent, is_active, expires_at)
            VALUES ($1, $2, $3, $4, TRUE, $5)
            RETURNING {SESSION_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(session.user_id)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.expires_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionEntity>, sqlx::Error> {
        sqlx::query_as::<_, SessionEntity>(&format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn deactivate_for_user(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_active = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND is_active
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
