//! 统一错误模型
//! 定义所有错误类型和错误响应格式

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 应用错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    Unauthorized,

    #[error("Validation failed: {message}")]
    Validation { message: String, details: Vec<String> },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 被封禁的客户端，对外表现为 404
    #[error("Client is blocked")]
    Blocked,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// 获取 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Validation { .. } | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::Blocked => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_)
            | AppError::Config(_)
            | AppError::Upstream(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回给客户端的错误消息
    ///
    /// 上游（数据库、邮件、地理定位）错误会原样回显给客户端。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Validation { message, .. } => message.clone(),
            AppError::BadRequest(msg) => msg.clone(),
            AppError::NotFound(msg) => format!("Resource not found: {}", msg),
            AppError::Blocked => "Not found".to_string(),
            AppError::RateLimitExceeded => "Too many requests".to_string(),
            AppError::Database(e) => format!("Database error: {}", e),
            AppError::Upstream(msg) => msg.clone(),
            AppError::Config(_) => "Configuration error".to_string(),
            AppError::Internal(msg) => format!("Internal server error: {}", msg),
        }
    }

    pub fn code(&self) -> u16 {
        self.status_code().as_u16()
    }

    // 便捷方法
    pub fn not_found(msg: &str) -> Self {
        AppError::NotFound(msg.to_string())
    }

    pub fn validation(details: Vec<String>) -> Self {
        AppError::Validation {
            message: "Validation failed".to_string(),
            details,
        }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        AppError::Upstream(msg.into())
    }

    pub fn internal_error(msg: &str) -> Self {
        AppError::Internal(msg.to_string())
    }
}

/// 错误响应 DTO
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    pub request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        let details = match &self {
            AppError::Validation { details, .. } => Some(details.clone()),
            _ => None,
        };

        let error_response = ErrorResponse {
            success: false,
            error: self.user_message(),
            details,
            request_id,
        };

        if status.is_server_error() {
            tracing::error!(
                code = self.code(),
                message = %self,
                request_id = %error_response.request_id,
                "Application error"
            );
        } else {
            tracing::debug!(
                code = self.code(),
                message = %self,
                request_id = %error_response.request_id,
                "Request rejected"
            );
        }

        (status, Json(error_response)).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

/// 将 validator 的字段错误展开为 "field: message" 列表
impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| {
                    // 结构体级校验挂在 "__all__" 下，以错误码作为字段名
                    let name: &str = if field == "__all__" { &e.code } else { field };
                    match &e.message {
                        Some(msg) => format!("{}: {}", name, msg),
                        None => format!("{}: invalid value", name),
                    }
                })
            })
            .collect();
        details.sort();
        AppError::validation(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AppError::Unauthorized.code(), 401);
        assert_eq!(AppError::validation(vec![]).code(), 400);
        assert_eq!(AppError::not_found("project").code(), 404);
        assert_eq!(AppError::Blocked.code(), 404);
        assert_eq!(AppError::RateLimitExceeded.code(), 429);
        assert_eq!(AppError::upstream("smtp down").code(), 500);
    }

    #[test]
    fn test_upstream_message_is_echoed() {
        let error = AppError::upstream("connection refused");
        assert_eq!(error.user_message(), "connection refused");

        let error = AppError::Database(sqlx::Error::RowNotFound);
        assert!(error.user_message().starts_with("Database error"));
    }

    #[test]
    fn test_blocked_looks_like_not_found() {
        assert_eq!(AppError::Blocked.user_message(), "Not found");
    }
}
