use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};

use crate::AppState;
use crate::api::cookies::{
    ACCESS_COOKIE, REFRESH_COOKIE, TEMP_COOKIE, removal_cookie, session_cookies, temp_cookie,
};
use crate::api::extract::{ClientInfo, ValidatedJson};
use crate::api::schema::{
    ApiResponse, LoginRequest, MessageResponse, RegisterRequest, TwoFactorRequest, UserView,
    VerifyOtpRequest,
};
use crate::cache::operations::OtpCacheOperations;
use crate::database::models::{NewSession, NewUser, SessionEntity, UserEntity};
use crate::error::{AppError, AppResult, ErrorResponse, is_unique_violation};
use crate::infrastructure::mail::{self, OutgoingMail};
use crate::infrastructure::{Claims, TokenType};
use crate::middleware::AuthSession;
use crate::utils::{dummy_password_hash, generate_otp, hash_password, verify_password};

/// 验证码最多允许的错误次数
pub const MAX_OTP_ATTEMPTS: u32 = 3;

/// 登录
///
/// 开启两步验证的用户会收到邮件验证码和 `t_t` Cookie，其余用户直接拿到 `a_t`/`r_t`。
#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in, or OTP sent when two-factor is enabled", body = ApiResponse<UserView>),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 403, description = "User banned", body = ErrorResponse),
        (status = 429, description = "OTP already sent", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> AppResult<Response> {
    let Some(user) = state.users.find_by_email(&req.email).await? else {
        let _ = verify_password(&req.password, dummy_password_hash(state.config.bcrypt_cost));
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash)? {
        tracing::debug!("Wrong password for user {}", user.id);
        return Err(AppError::InvalidCredentials);
    }
    if user.is_banned {
        return Err(AppError::Banned(user.ban_reason.clone()));
    }

    if user.two_factor_enabled {
        let user_key = user.id.to_string();
        if OtpCacheOperations::is_pending(state.cache.as_ref(), &user_key).await? {
            return Err(AppError::OtpAlreadySent);
        }

        let code = generate_otp();
        let ttl = state.config.temp_token_ttl_secs;
        OtpCacheOperations::issue(state.cache.as_ref(), &user_key, &code, ttl).await?;
        mail::dispatch(
            state.mailer.clone(),
            OutgoingMail::otp(&user.email, &code, ttl),
        );

        let temp_token = state.tokens.issue_temp(user.id, &user.email)?;
        let jar = jar.add(temp_cookie(&state.config, temp_token));
        tracing::info!("OTP sent to user {}", user.id);
        return Ok((
            jar,
            Json(MessageResponse::pending("OTP_SENT", "OTP sent to your email")),
        )
            .into_response());
    }

    let jar = start_session(&state, jar, &user, client).await?;
    Ok((
        jar,
        Json(ApiResponse::new(
            "LOGIN_SUCCESS",
            "Welcome back!",
            UserView::from(&user),
        )),
    )
        .into_response())
}

/// 注册
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered", body = ApiResponse<UserView>),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    if state.users.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::EmailTaken);
    }

    let password_hash = hash_password(&req.password, state.config.bcrypt_cost)?;
    let user = state
        .users
        .create(NewUser {
            email: req.email,
            password_hash,
            username: req.username,
            two_factor_enabled: true,
            email_verified: false,
        })
        .await
        .map_err(|e| {
            // 并发注册时预检查可能落空，由唯一索引兜底
            if is_unique_violation(&e) {
                AppError::EmailTaken
            } else {
                AppError::Database(e)
            }
        })?;

    mail::dispatch(
        state.mailer.clone(),
        OutgoingMail::welcome(&user.email, &user.username),
    );
    tracing::info!("User registered: {}", user.id);

    Ok(Json(ApiResponse::new(
        "USER_REGISTERED",
        "User registered successfully",
        UserView::from(&user),
    )))
}

/// 校验邮件验证码，完成两步登录
#[utoipa::path(
    put,
    path = "/auth/verify-otp",
    tag = "Auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Logged in", body = ApiResponse<UserView>),
        (status = 400, description = "OTP invalid, expired or not found", body = ErrorResponse),
        (status = 401, description = "Missing or invalid temp token", body = ErrorResponse),
        (status = 429, description = "Too many attempts", body = ErrorResponse)
    )
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    client: ClientInfo,
    ValidatedJson(req): ValidatedJson<VerifyOtpRequest>,
) -> AppResult<Response> {
    let claims = cookie_claims(&state, &jar, TEMP_COOKIE, TokenType::Temp)
        .ok_or(AppError::Unauthorized)?;
    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;
    let user_key = user_id.to_string();
    let cache = state.cache.as_ref();

    let otp = OtpCacheOperations::get(cache, &user_key)
        .await?
        .ok_or(AppError::OtpNotFound)?;
    if otp.is_expired(Utc::now().timestamp_millis()) {
        OtpCacheOperations::remove(cache, &user_key).await?;
        return Err(AppError::OtpNotFound);
    }

    if otp.code != req.code.trim() {
        if otp.attempts >= MAX_OTP_ATTEMPTS {
            OtpCacheOperations::remove(cache, &user_key).await?;
            tracing::warn!("Too many OTP attempts for user {}", user_id);
            return Err(AppError::TooManyAttempts);
        }
        OtpCacheOperations::record_failed_attempt(cache, &user_key, &otp).await?;
        return Err(AppError::InvalidOtp {
            left: MAX_OTP_ATTEMPTS - otp.attempts,
        });
    }

    OtpCacheOperations::remove(cache, &user_key).await?;

    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    if user.is_banned {
        return Err(AppError::Banned(user.ban_reason.clone()));
    }

    let jar = start_session(&state, jar, &user, client)
        .await?
        .add(removal_cookie(&state.config, TEMP_COOKIE));
    Ok((
        jar,
        Json(ApiResponse::new(
            "LOGIN_SUCCESS",
            "Welcome back!",
            UserView::from(&user),
        )),
    )
        .into_response())
}

/// 用刷新令牌换发新的令牌对
///
/// 令牌中的会话必须仍然有效，登出后刷新令牌随之失效。
#[utoipa::path(
    post,
    path = "/auth/refresh",
    tag = "Auth",
    responses(
        (status = 200, description = "Tokens refreshed", body = MessageResponse),
        (status = 401, description = "Missing, invalid or revoked refresh token", body = ErrorResponse)
    )
)]
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    let claims = cookie_claims(&state, &jar, REFRESH_COOKIE, TokenType::Refresh)
        .ok_or(AppError::Unauthorized)?;
    let user_id = claims.user_id().ok_or(AppError::Unauthorized)?;
    let session_id = claims.session_id().ok_or(AppError::Unauthorized)?;

    let session = state
        .sessions
        .find_by_id(session_id)
        .await?
        .filter(|s| s.user_id == user_id && s.is_usable(Utc::now()))
        .ok_or(AppError::Unauthorized)?;
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .filter(|u| !u.is_banned)
        .ok_or(AppError::Unauthorized)?;

    let pair = state.tokens.issue_pair(user.id, &user.email, session.id)?;
    let [access_cookie, refresh_cookie] = session_cookies(&state.config, pair);
    let jar = jar
        .add(access_cookie)
        .add(refresh_cookie)
        .add(removal_cookie(&state.config, TEMP_COOKIE));

    Ok((
        jar,
        Json(MessageResponse::ok("TOKEN_REFRESHED", "Tokens refreshed")),
    ))
}

/// 当前登录用户
#[utoipa::path(
    get,
    path = "/auth/get-session",
    tag = "Auth",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserView>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "User banned", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn get_session(
    State(state): State<AppState>,
    auth: AuthSession,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = state
        .users
        .find_by_id(auth.user_id)
        .await?
        .ok_or(AppError::UserNotFound)?;
    if user.is_banned {
        return Err(AppError::Banned(user.ban_reason.clone()));
    }

    Ok(Json(ApiResponse::new(
        "SESSION_RETRIEVED",
        "Session retrieved",
        UserView::from(&user),
    )))
}

/// 登出，使该用户的全部会话失效
#[utoipa::path(
    delete,
    path = "/auth/logout",
    tag = "Auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    )
)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    let user_id = cookie_claims(&state, &jar, ACCESS_COOKIE, TokenType::Access)
        .or_else(|| cookie_claims(&state, &jar, REFRESH_COOKIE, TokenType::Refresh))
        .and_then(|claims| claims.user_id())
        .ok_or(AppError::Unauthorized)?;

    let deactivated = state.sessions.deactivate_for_user(user_id).await?;
    tracing::info!("User {} logged out, {} sessions deactivated", user_id, deactivated);

    let jar = jar
        .add(removal_cookie(&state.config, ACCESS_COOKIE))
        .add(removal_cookie(&state.config, REFRESH_COOKIE));
    Ok((
        jar,
        Json(MessageResponse::ok("LOGOUT_SUCCESS", "Logged out successfully")),
    ))
}

/// 开关两步验证
#[utoipa::path(
    put,
    path = "/auth/two-factor",
    tag = "Auth",
    request_body = TwoFactorRequest,
    responses(
        (status = 200, description = "Two-factor setting updated", body = ApiResponse<UserView>),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    )
)]
pub async fn update_two_factor(
    State(state): State<AppState>,
    auth: AuthSession,
    ValidatedJson(req): ValidatedJson<TwoFactorRequest>,
) -> AppResult<Json<ApiResponse<UserView>>> {
    let user = state
        .users
        .set_two_factor(auth.user_id, req.enabled)
        .await?
        .ok_or(AppError::UserNotFound)?;

    Ok(Json(ApiResponse::new(
        "TWO_FACTOR_UPDATED",
        "Two-factor setting updated",
        UserView::from(&user),
    )))
}

fn cookie_claims(
    state: &AppState,
    jar: &CookieJar,
    name: &str,
    token_type: TokenType,
) -> Option<Claims> {
    let token = jar.get(name)?.value();
    if token.is_empty() {
        return None;
    }
    state.tokens.verify(token, Some(token_type))
}

/// 写入会话记录并下发令牌 Cookie
async fn start_session(
    state: &AppState,
    jar: CookieJar,
    user: &UserEntity,
    client: ClientInfo,
) -> AppResult<CookieJar> {
    let session: SessionEntity = state
        .sessions
        .create(NewSession {
            user_id: user.id,
            ip_address: client.ip,
            user_agent: client.user_agent,
            expires_at: Utc::now() + Duration::seconds(state.config.refresh_token_ttl_secs as i64),
        })
        .await?;
    tracing::info!("Session {} created for user {}", session.id, user.id);

    let pair = state.tokens.issue_pair(user.id, &user.email, session.id)?;
    let [access_cookie, refresh_cookie] = session_cookies(&state.config, pair);
    Ok(jar.add(access_cookie).add(refresh_cookie))
}
