//! 三种协议方言的线格式类型
//!
//! - `anthropic`: 面向客户端的 Anthropic messages 方言
//! - `openai`: OpenAI chat completions 上游方言
//! - `responses`: 强制流式 SSE 的 responses 上游方言

pub mod anthropic;
pub mod openai;
pub mod responses;

use serde::{Deserialize, Deserializer};

/// 把 JSON null 反序列化为类型默认值
///
/// 上游返回的 `content` / `finish_reason` 等字段可能是 null，
/// 与字段缺失同等对待。
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn is_false(v: &bool) -> bool {
    !*v
}

pub(crate) fn is_zero(v: &i64) -> bool {
    *v == 0
}
