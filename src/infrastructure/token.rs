use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

/// 令牌用途标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TokenType {
    Access,
    Refresh,
    /// 两步验证期间使用的临时令牌
    Temp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // 用户ID
    pub email: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// 登录会话ID，临时令牌没有
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub iat: i64, // 签发时间
    pub exp: i64, // 过期时间
}

impl Claims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.sid.as_deref().and_then(|sid| Uuid::parse_str(sid).ok())
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// HS256 令牌签发与校验
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
    temp_ttl_secs: u64,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl_secs: config.access_token_ttl_secs,
            refresh_ttl_secs: config.refresh_token_ttl_secs,
            temp_ttl_secs: config.temp_token_ttl_secs,
        }
    }

    /// 各类令牌的有效期（秒）
    pub fn ttl_secs(&self, token_type: TokenType) -> u64 {
        match token_type {
            TokenType::Access => self.access_ttl_secs,
            TokenType::Refresh => self.refresh_ttl_secs,
            TokenType::Temp => self.temp_ttl_secs,
        }
    }

    pub fn sign(
        &self,
        user_id: Uuid,
        email: &str,
        token_type: TokenType,
        session_id: Option<Uuid>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            token_type,
            sid: session_id.map(|sid| sid.to_string()),
            iat: now,
            exp: now + self.ttl_secs(token_type) as i64,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
    }

    /// 签发访问令牌和刷新令牌
    pub fn issue_pair(
        &self,
        user_id: Uuid,
        email: &str,
        session_id: Uuid,
    ) -> Result<TokenPair, jsonwebtoken::errors::Error> {
        Ok(TokenPair {
            access_token: self.sign(user_id, email, TokenType::Access, Some(session_id))?,
            refresh_token: self.sign(user_id, email, TokenType::Refresh, Some(session_id))?,
        })
    }

    pub fn issue_temp(
        &self,
        user_id: Uuid,
        email: &str,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        tracing::debug!("Generating temp token for user: {}", user_id);
        self.sign(user_id, email, TokenType::Temp, None)
    }

    /// 校验签名、过期时间和令牌类型，任何一项不通过都返回 None
    pub fn verify(&self, token: &str, expected: Option<TokenType>) -> Option<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let claims = match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!("Token rejected: {}", e);
                return None;
            }
        };

        if claims.exp <= Utc::now().timestamp() {
            return None;
        }
        if expected.is_some_and(|t| t != claims.token_type) {
            tracing::debug!(
                "Token type mismatch: expected {:?}, got {:?}",
                expected,
                claims.token_type
            );
            return None;
        }
        Some(claims)
    }
}
