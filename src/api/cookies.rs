use axum_extra::extract::cookie::{Cookie, SameSite};

use crate::config::Config;
use crate::infrastructure::TokenPair;

/// 访问令牌
pub const ACCESS_COOKIE: &str = "a_t";
/// 刷新令牌
pub const REFRESH_COOKIE: &str = "r_t";
/// 两步验证临时令牌
pub const TEMP_COOKIE: &str = "t_t";

fn path_for(config: &Config, name: &'static str) -> String {
    match name {
        REFRESH_COOKIE => config.auth_path(),
        TEMP_COOKIE => format!("{}/verify-otp", config.auth_path()),
        _ => "/".to_string(),
    }
}

fn build(config: &Config, name: &'static str, value: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build((name, value))
        .path(path_for(config, name))
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(time::Duration::seconds(max_age_secs))
        .build()
}

pub fn access_cookie(config: &Config, token: String) -> Cookie<'static> {
    build(config, ACCESS_COOKIE, token, config.access_token_ttl_secs as i64)
}

pub fn refresh_cookie(config: &Config, token: String) -> Cookie<'static> {
    build(config, REFRESH_COOKIE, token, config.refresh_token_ttl_secs as i64)
}

pub fn temp_cookie(config: &Config, token: String) -> Cookie<'static> {
    build(config, TEMP_COOKIE, token, config.temp_token_ttl_secs as i64)
}

/// 同路径的空值 Cookie，Max-Age=0
pub fn removal_cookie(config: &Config, name: &'static str) -> Cookie<'static> {
    build(config, name, String::new(), 0)
}

/// 登录成功后下发的两个令牌 Cookie
pub fn session_cookies(config: &Config, pair: TokenPair) -> [Cookie<'static>; 2] {
    [
        access_cookie(config, pair.access_token),
        refresh_cookie(config, pair.refresh_token),
    ]
}
