/// 缓存键模块
/// 提供各种缓存键生成函数

// 登录认证相关缓存键
pub mod auth_keys;

// 日记缓存键
pub mod diary_keys;

pub use auth_keys::login_otp_key;
pub use diary_keys::diary_entries_key;

/// 全局配置缓存键
pub const GLOBAL_CONFIG_KEY: &str = "config";
