//! furiwake - Anthropic messages 反向代理
//!
//! 对外暴露 Anthropic 风格的 messages HTTP API，按请求文本中的
//! `@route:` / `@model:` / `@reasoning:` 标记把请求分发到不同的上游
//! Provider，并在三种协议方言（Anthropic / OpenAI chat completions /
//! responses）之间双向转换请求、响应与 SSE 流。

pub mod config;
pub mod error;
pub mod models;
pub mod router;
pub mod server;
pub mod stream;
pub mod translator;
pub mod upstream;
pub mod util;
