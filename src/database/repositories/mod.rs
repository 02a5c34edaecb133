// 存储库模块
// 每个存储库定义一个接口和对应的 PostgreSQL 实现

pub mod config;
pub mod diary;
pub mod session;
pub mod user;

pub use config::{
    GlobalConfigRepository, PgGlobalConfigRepository, PgSessionSettingsRepository,
    SessionSettingsRepository,
};
pub use diary::{DiaryRepository, PgDiaryRepository};
pub use session::{PgSessionRepository, SessionRepository};
pub use user::{PgUserRepository, UserRepository};
