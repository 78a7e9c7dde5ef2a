//! 协议转换器
//!
//! 把 Anthropic messages 请求转换为各上游方言的请求，并把上游的
//! 非流式响应转换回 Anthropic message。流式转换见 `crate::stream`。

pub mod content;
pub mod openai;
pub mod responses;
