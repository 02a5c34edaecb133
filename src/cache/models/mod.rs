/// 缓存数据模型
/// 定义缓存数据的结构体

// 登录验证码缓存模型
pub mod otp;

pub use otp::CachedOtp;
