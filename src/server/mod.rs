//! HTTP 服务
//!
//! 入口路由：
//! - `GET  /health`
//! - `POST /v1/messages`（请求体上限 16 MiB）
//! - `POST /v1/messages/count_tokens`（请求体上限 8 MiB）
//!
//! 所有请求态都在单个 handler future 内部，配置与 HTTP 客户端是
//! 仅有的跨请求共享对象，启动后只读。

mod handlers;
mod passthrough;

use crate::config::Config;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

const MESSAGES_BODY_LIMIT: usize = 16 * 1024 * 1024;
const COUNT_TOKENS_BODY_LIMIT: usize = 8 * 1024 * 1024;

/// 进程级共享状态
#[derive(Debug, Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub client: reqwest::Client,
}

impl AppState {
    /// 按配置构建共享状态（HTTP 客户端带全局超时）
    pub fn new(cfg: Config) -> Result<Self, crate::error::ProxyError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(cfg.timeout_seconds))
            .build()
            .map_err(|e| {
                crate::error::ProxyError::Internal(format!("failed to build http client: {e}"))
            })?;
        Ok(Self {
            cfg: Arc::new(cfg),
            client,
        })
    }
}

/// 构建路由表
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/health",
            get(handlers::handle_health).fallback(handlers::handle_method_not_allowed),
        )
        .route(
            "/v1/messages",
            post(handlers::handle_messages)
                .fallback(handlers::handle_method_not_allowed)
                .layer(DefaultBodyLimit::max(MESSAGES_BODY_LIMIT)),
        )
        .route(
            "/v1/messages/count_tokens",
            post(handlers::handle_count_tokens)
                .fallback(handlers::handle_method_not_allowed)
                .layer(DefaultBodyLimit::max(COUNT_TOKENS_BODY_LIMIT)),
        )
        .with_state(state)
}
