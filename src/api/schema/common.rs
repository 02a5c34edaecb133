use serde::Serialize;
use utoipa::ToSchema;

/// 通用的成功响应结构
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    /// 业务码，例如 `LOGIN_SUCCESS`
    pub code: String,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(code: &str, message: &str, data: T) -> Self {
        Self {
            success: true,
            code: code.to_string(),
            message: message.to_string(),
            data,
        }
    }
}

/// 不带数据的响应
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(code: &str, message: &str) -> Self {
        Self {
            success: true,
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    /// 流程未完成但不是错误，例如等待验证码
    pub fn pending(code: &str, message: &str) -> Self {
        Self {
            success: false,
            ..Self::ok(code, message)
        }
    }
}
