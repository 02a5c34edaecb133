use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use uuid::Uuid;

use crate::AppState;
use crate::api::cookies::ACCESS_COOKIE;
use crate::error::AppError;
use crate::infrastructure::TokenType;

/// 通过 `a_t` Cookie 中的访问令牌认证的用户
///
/// ```ignore
/// async fn handler(auth: AuthSession) -> AppResult<Json<()>> { ... }
/// ```
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user_id: Uuid,
    pub email: String,
    /// 登录会话ID，用于查询会话级配置
    pub session_id: Option<Uuid>,
}

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(ACCESS_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let claims = state
            .tokens
            .verify(&token, Some(TokenType::Access))
            .ok_or(AppError::Unauthorized)?;
        let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;

        Ok(AuthSession {
            user_id,
            session_id: claims.session_id(),
            email: claims.email,
        })
    }
}
