use std::net::SocketAddr;
use std::sync::OnceLock;

use axum::http::{HeaderMap, header::USER_AGENT};
use bcrypt::{hash, verify};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 邮箱不存在时用于校验的占位哈希，让登录耗时与密码错误时接近
///
/// 首次调用时按给定费用生成，之后复用。
pub fn dummy_password_hash(cost: u32) -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| hash_password("syncup-placeholder", cost).unwrap_or_default())
}

/// 6位数字验证码
pub fn generate_otp() -> String {
    rand::rng().random_range(100_000..1_000_000).to_string()
}

/// 客户端IP：优先 x-real-ip，其次 x-forwarded-for 的第一个地址，最后是连接地址
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let remote_ip = remote.map(|addr| addr.ip().to_string());
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref())
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

/// 解析日记日期，支持 RFC 3339 和 `YYYY-MM-DD` (按 UTC 零点)
pub fn parse_entry_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
