//! OpenAI chat completions 方言类型

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 发往上游的 chat completions 请求
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiChatRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    #[serde(default, skip_serializing_if = "crate::models::is_false")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<OpenAiStreamOptions>,
    #[serde(rename = "max_completion_tokens")]
    pub max_tokens: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<OpenAiTool>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub tool_choice: Value,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OpenAiStreamOptions {
    #[serde(default)]
    pub include_usage: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiMessage {
    #[serde(default)]
    pub role: String,
    #[serde(
        default,
        deserialize_with = "crate::models::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub content: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tool_call_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OpenAiToolCall>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiTool {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAiFunctionDefinition,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiFunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    #[serde(
        default,
        deserialize_with = "crate::models::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub id: String,
    #[serde(default, skip_serializing_if = "crate::models::is_zero")]
    pub index: i64,
    #[serde(
        rename = "type",
        default,
        deserialize_with = "crate::models::null_as_default",
        skip_serializing_if = "String::is_empty"
    )]
    pub call_type: String,
    #[serde(default)]
    pub function: OpenAiToolFunction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAiToolFunction {
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub arguments: String,
}

/// 上游非流式响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChatResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: OpenAiUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChoice {
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub message: OpenAiMessage,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub finish_reason: String,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct OpenAiUsage {
    #[serde(default)]
    pub prompt_tokens: i64,
    #[serde(default)]
    pub completion_tokens: i64,
}

/// 上游流式响应的单个 chunk
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiChatStreamChunk {
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub usage: OpenAiUsage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiStreamChoice {
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub delta: OpenAiDelta,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub finish_reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiDelta {
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub role: String,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "crate::models::null_as_default")]
    pub tool_calls: Vec<OpenAiToolCall>,
}
