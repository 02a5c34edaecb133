use std::env;

/// 配置加载错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// SMTP 邮件配置，MAIL_HOST 未设置时为 None
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub temp_token_ttl_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub cors_origin: Option<String>,
    pub cookie_secure: bool,
    pub bcrypt_cost: u32,
    pub mail: Option<MailConfig>,
}

const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 3600;
const DEFAULT_TEMP_TOKEN_TTL_SECS: u64 = 5 * 60;
/// 令牌有效期上限 (一年)
pub const MAX_TTL_SECS: u64 = 365 * 24 * 3600;
const DEFAULT_SERVER_PORT: u16 = 5000;
const DEFAULT_MAIL_PORT: u16 = 587;
const DEFAULT_FROM_ADDRESS: &str = "noreply@syncup.local";

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                name: "JWT_SECRET",
                value: String::new(),
            });
        }

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret,
            access_token_ttl_secs: ttl_secs("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?,
            refresh_token_ttl_secs: ttl_secs("REFRESH_TOKEN_TTL_SECS", DEFAULT_REFRESH_TOKEN_TTL_SECS)?,
            temp_token_ttl_secs: ttl_secs("TEMP_TOKEN_TTL_SECS", DEFAULT_TEMP_TOKEN_TTL_SECS)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "::".to_string()),
            server_port: parsed("BACKEND_PORT", DEFAULT_SERVER_PORT)?,
            api_base_uri: env::var("API_BASE_URI").unwrap_or_else(|_| "/api/v1".to_string()),
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|o| !o.is_empty()),
            cookie_secure: parsed("COOKIE_SECURE", true)?,
            bcrypt_cost: parsed("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            mail: mail_from_env()?,
        })
    }

    /// 认证路由前缀，例如 `/api/v1/auth`
    pub fn auth_path(&self) -> String {
        format!("{}/auth", self.api_base_uri.trim_end_matches('/'))
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn ttl_secs(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    check_ttl(name, parsed(name, default)?)
}

/// 有效期必须在 1 秒到 MAX_TTL_SECS 之间
fn check_ttl(name: &'static str, secs: u64) -> Result<u64, ConfigError> {
    if (1..=MAX_TTL_SECS).contains(&secs) {
        Ok(secs)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: secs.to_string(),
        })
    }
}

fn mail_from_env() -> Result<Option<MailConfig>, ConfigError> {
    let Some(host) = env::var("MAIL_HOST").ok().filter(|h| !h.is_empty()) else {
        return Ok(None);
    };
    let username = env::var("MAILER_ID").ok();
    Ok(Some(MailConfig {
        host,
        port: parsed("MAIL_PORT", DEFAULT_MAIL_PORT)?,
        from_address: username
            .clone()
            .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
        username,
        password: env::var("MAILER_PASSWORD").ok(),
    }))
}
