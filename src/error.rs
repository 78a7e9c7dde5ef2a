//! 代理错误类型
//!
//! 定义请求处理过程中可能发生的错误，以及它们到 HTTP 状态码和
//! Anthropic 风格错误响应体 `{"type":"error","message":...}` 的映射。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// 代理错误
#[derive(Error, Debug)]
pub enum ProxyError {
    /// 配置错误（仅启动阶段，致命）
    #[error("{0}")]
    Config(String),

    /// 客户端错误：无效 JSON、未知路由、非法标记等
    #[error("{0}")]
    BadRequest(String),

    /// 方法不允许
    #[error("method not allowed")]
    MethodNotAllowed,

    /// 认证失败（bearer 环境变量缺失、codex 凭证文件异常）
    #[error("{0}")]
    Auth(String),

    /// 上游传输失败
    #[error("{message}")]
    Transport { message: String, timeout: bool },

    /// 上游响应无法使用
    #[error("{0}")]
    BadGateway(String),

    /// 内部错误
    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    /// 获取对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::Auth(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Transport { timeout, .. } => {
                if *timeout {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            ProxyError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Anthropic 风格的错误响应体
    pub fn to_json(&self) -> serde_json::Value {
        error_body(&self.to_string())
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        ProxyError::Transport {
            message: e.to_string(),
            timeout: e.is_timeout(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

/// 错误响应体 `{"type":"error","message":...}`
pub fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({
        "type": "error",
        "message": message,
    })
}

/// 构建带任意状态码的错误响应（用于转发上游错误状态）
pub fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(error_body(message))).into_response()
}
