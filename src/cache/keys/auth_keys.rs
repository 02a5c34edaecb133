/// 登录验证码缓存键前缀
const LOGIN_OTP_PREFIX: &str = "login:otp:";

/// 生成登录验证码缓存键
pub fn login_otp_key(user_id: &str) -> String {
    format!("{}{}", LOGIN_OTP_PREFIX, user_id)
}
