use std::sync::Arc;

use sqlx::PgPool;

use cache::Cache;
use config::Config;
use database::repositories::{
    DiaryRepository, GlobalConfigRepository, PgDiaryRepository, PgGlobalConfigRepository,
    PgSessionRepository, PgSessionSettingsRepository, PgUserRepository, SessionRepository,
    SessionSettingsRepository, UserRepository,
};
use infrastructure::{Mailer, TokenService};

pub mod api;
pub mod cache;
pub mod config;
pub mod database;
pub mod error;
pub mod infrastructure;
pub mod middleware;
pub mod router;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tokens: Arc<TokenService>,
    pub cache: Arc<dyn Cache>,
    pub mailer: Arc<dyn Mailer>,
    pub users: Arc<dyn UserRepository>,
    pub sessions: Arc<dyn SessionRepository>,
    pub session_settings: Arc<dyn SessionSettingsRepository>,
    pub diary: Arc<dyn DiaryRepository>,
    pub global_config: Arc<dyn GlobalConfigRepository>,
}

impl AppState {
    /// 使用 PostgreSQL 存储库组装应用状态
    pub fn with_postgres(
        config: Config,
        pool: PgPool,
        cache: Arc<dyn Cache>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            tokens: Arc::new(TokenService::new(&config)),
            config: Arc::new(config),
            cache,
            mailer,
            users: Arc::new(PgUserRepository::new(pool.clone())),
            sessions: Arc::new(PgSessionRepository::new(pool.clone())),
            session_settings: Arc::new(PgSessionSettingsRepository::new(pool.clone())),
            diary: Arc::new(PgDiaryRepository::new(pool.clone())),
            global_config: Arc::new(PgGlobalConfigRepository::new(pool)),
        }
    }
}
