//! Anthropic messages 方言类型
//!
//! `system`、消息 `content`、`tool_result.content` 等字段是异构的：
//! 可能是字符串、单个内容块或内容块数组，统一用 `serde_json::Value`
//! 承载，由 `translator::content` 归一化。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 客户端发来的 messages 请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnthropicMessageRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub max_tokens: Option<i64>,
    #[serde(default)]
    pub system: Value,
    #[serde(default)]
    pub messages: Vec<AnthropicMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub tools: Vec<AnthropicTool>,
    #[serde(default)]
    pub tool_choice: Value,
}

/// 单条消息，content 为字符串或内容块序列
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Value,
}

/// 内容块（text / tool_use / tool_result）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tool_use_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Value>,
}

impl AnthropicContentBlock {
    /// 纯文本块
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            block_type: "text".into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// tool_use 块
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            block_type: "tool_use".into(),
            id: id.into(),
            name: name.into(),
            input: Some(input),
            ..Default::default()
        }
    }
}

/// 工具定义
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// 返回给客户端的 message 响应
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnthropicMessageResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub response_type: String,
    pub role: String,
    pub content: Vec<AnthropicContentBlock>,
    pub model: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stop_reason: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stop_sequence: String,
    pub usage: AnthropicUsage,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AnthropicUsage {
    #[serde(default)]
    pub input_tokens: i64,
    #[serde(default)]
    pub output_tokens: i64,
}

/// token 估算请求
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CountTokensRequest {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub system: Value,
    #[serde(default)]
    pub messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CountTokensResponse {
    pub input_tokens: i64,
}
