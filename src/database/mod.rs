// 数据库模块
// 包含数据库实体定义、存储库接口及其 PostgreSQL 实现

pub mod models; // 数据库实体定义
pub mod repositories; // 存储库接口与实现

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

// 重新导出常用类型，方便其他模块使用
pub use models::{
    DiaryEntryEntity, GlobalConfigEntity, SessionEntity, SessionSettingsEntity, UserEntity,
};
pub use repositories::{
    DiaryRepository, GlobalConfigRepository, SessionRepository, SessionSettingsRepository,
    UserRepository,
};

/// 建立连接池并执行迁移
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;

    Ok(pool)
}
