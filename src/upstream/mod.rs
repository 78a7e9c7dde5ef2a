//! 上游调用
//!
//! - `auth`: 按 Provider 配置给请求附加认证
//! - `caller`: 带重试的上游 HTTP 请求

pub mod auth;
pub mod caller;

pub use auth::apply_provider_auth;
pub use caller::do_provider_request;
