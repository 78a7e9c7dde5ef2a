//! SSE 解析与流式协议转换
//!
//! - `sse`: 增量 SSE 读取器（多行 data 折叠）
//! - `events`: Anthropic SSE 事件的构造与编码
//! - `openai_sse`: OpenAI 流式 delta → Anthropic SSE
//! - `responses_sse`: responses 方言 SSE → Anthropic SSE，
//!   以及非流式桥接用的收集器

pub mod events;
pub mod openai_sse;
pub mod responses_sse;
pub mod sse;

pub use openai_sse::OpenAiStreamTranslator;
pub use responses_sse::{ResponsesCompletedCollector, ResponsesStreamTranslator};
pub use sse::{SseEvent, SseParser};
