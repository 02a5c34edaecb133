use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::user::{NewUser, UserEntity};

const USER_COLUMNS: &str = "id, email, password_hash, username, is_banned, ban_reason, \
     two_factor_enabled, email_verified, created_at, updated_at";

/// 用户存储库
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error>;

    async fn create(&self, user: NewUser) -> Result<UserEntity, sqlx::Error>;

    /// 开关两步验证，用户不存在时返回 None
    async fn set_two_factor(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<Option<UserEntity>, sqlx::Error>;
}

/// 用户存储库的 PostgreSQL 实现
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn create(&self, user: NewUser) -> Result<UserEntity, sqlx::Error> {
        let created = sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, username, two_factor_enabled, email_verified)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.username)
        .bind(user.two_factor_enabled)
        .bind(user.email_verified)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!("Created user: {}", created.id);
        Ok(created)
    }

    async fn set_two_factor(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<Option<UserEntity>, sqlx::Error> {
        sqlx::query_as::<_, UserEntity>(&format!(
            r#"
            UPDATE users
            SET two_factor_enabled = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(enabled)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
