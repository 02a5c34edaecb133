use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::cache::CacheError;
use crate::infrastructure::crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{}", .0.as_deref().unwrap_or("You are banned from this platform"))]
    Banned(Option<String>),
    #[error("Email already registered")]
    EmailTaken,
    #[error("OTP already sent, please wait before requesting again")]
    OtpAlreadySent,
    #[error("OTP expired or not found")]
    OtpNotFound,
    #[error("Invalid OTP, attempts left {left}")]
    InvalidOtp { left: u32 },
    #[error("Too many attempts, please request a new OTP")]
    TooManyAttempts,
    #[error("User not found")]
    UserNotFound,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("Maintenance mode is enabled")]
    Maintenance,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("password hashing error: {0}")]
    Password(#[from] bcrypt::BcryptError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// 统一的错误响应体
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, "INVALID_EMAIL_OR_PASSWORD"),
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Banned(_) => (StatusCode::FORBIDDEN, "USER_BANNED"),
            AppError::EmailTaken => (StatusCode::CONFLICT, "EMAIL_ALREADY_REGISTERED"),
            AppError::OtpAlreadySent => (StatusCode::TOO_MANY_REQUESTS, "OTP_ALREADY_SENT"),
            AppError::OtpNotFound => (StatusCode::BAD_REQUEST, "OTP_NOT_FOUND"),
            AppError::InvalidOtp { .. } => (StatusCode::BAD_REQUEST, "INVALID_OTP"),
            AppError::TooManyAttempts => (StatusCode::TOO_MANY_REQUESTS, "TOO_MANY_ATTEMPTS"),
            AppError::UserNotFound => (StatusCode::NOT_FOUND, "USER_NOT_FOUND"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Maintenance => (StatusCode::SERVICE_UNAVAILABLE, "MAINTENANCE_MODE"),
            AppError::Database(err) if is_unique_violation(err) => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            AppError::Database(_)
            | AppError::Cache(_)
            | AppError::Token(_)
            | AppError::Crypto(_)
            | AppError::Password(_)
            | AppError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// 唯一约束冲突 (PostgreSQL 23505)
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.is_unique_violation(),
        _ => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else if status == StatusCode::CONFLICT && matches!(self, AppError::Database(_)) {
            "Resource already exists".to_string()
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            success: false,
            status: status.as_u16(),
            code: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}
