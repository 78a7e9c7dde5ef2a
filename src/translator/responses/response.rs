//! responses 原始 JSON 转换为 Anthropic message
//!
//! 由非流式桥接（收集 `response.completed` 事件）调用。

use crate::models::anthropic::{
    AnthropicContentBlock, AnthropicMessageResponse, AnthropicUsage,
};
use crate::translator::content::safe_json_value;
use crate::util::unix_nanos;
use serde_json::Value;

/// 把 responses 的 response 对象转换为 Anthropic message 响应
///
/// 原始负载不是合法 JSON 时，整段字节作为单个 text 块返回。
pub fn convert_responses_json_to_anthropic(
    raw: &[u8],
    spoof_model: &str,
) -> AnthropicMessageResponse {
    let mut out = AnthropicMessageResponse {
        id: format!("msg_{}", unix_nanos()),
        response_type: "message".into(),
        role: "assistant".into(),
        model: spoof_model.to_string(),
        ..Default::default()
    };

    let payload: Value = match serde_json::from_slice(raw) {
        Ok(v) => v,
        Err(_) => {
            out.content.push(AnthropicContentBlock::text(
                String::from_utf8_lossy(raw).to_string(),
            ));
            return out;
        }
    };

    let text = extract_response_text(&payload);
    if !text.trim().is_empty() {
        out.content.push(AnthropicContentBlock::text(text));
    }
    out.content.extend(extract_response_tool_uses(&payload));

    if let Some(usage) = payload.get("usage") {
        out.usage = AnthropicUsage {
            input_tokens: usage
                .get("input_tokens")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            output_tokens: usage
                .get("output_tokens")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
        };
    }

    out.stop_reason = determine_stop_reason(&payload, &out.content).to_string();
    out
}

fn determine_stop_reason(payload: &Value, content: &[AnthropicContentBlock]) -> &'static str {
    if content.iter().any(|b| b.block_type == "tool_use") {
        return "tool_use";
    }
    if payload.get("status").and_then(Value::as_str) == Some("incomplete")
        && payload
            .get("status_details")
            .and_then(|d| d.get("reason"))
            .and_then(Value::as_str)
            == Some("max_output_tokens")
    {
        return "max_tokens";
    }
    "end_turn"
}

/// 提取响应文本：优先 `output_text`，否则遍历 `output[]` 中
/// type 为空或 "message" 的条目，拼接其 `content[*].text`
fn extract_response_text(payload: &Value) -> String {
    if let Some(text) = payload.get("output_text").and_then(Value::as_str) {
        if !text.trim().is_empty() {
            return text.to_string();
        }
    }

    let Some(output) = payload.get("output").and_then(Value::as_array) else {
        return String::new();
    };
    let mut parts: Vec<&str> = Vec::new();
    for entry in output {
        let item_type = entry.get("type").and_then(Value::as_str).unwrap_or("");
        if !item_type.is_empty() && item_type != "message" {
            continue;
        }
        let Some(content) = entry.get("content").and_then(Value::as_array) else {
            continue;
        };
        for block in content {
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                if !text.is_empty() {
                    parts.push(text);
                }
            }
        }
    }
    parts.join("\n")
}

fn extract_response_tool_uses(payload: &Value) -> Vec<AnthropicContentBlock> {
    let Some(output) = payload.get("output").and_then(Value::as_array) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for entry in output {
        if entry.get("type").and_then(Value::as_str) != Some("function_call") {
            continue;
        }
        let mut call_id = entry
            .get("call_id")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        if call_id.is_empty() {
            call_id = format!("toolu_{}", unix_nanos());
        }
        let name = entry.get("name").and_then(Value::as_str).unwrap_or("");
        let args = entry.get("arguments").and_then(Value::as_str).unwrap_or("");
        out.push(AnthropicContentBlock::tool_use(
            call_id,
            name,
            safe_json_value(args),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_text_path() {
        let raw = json!({
            "id": "resp_1",
            "output_text": "hello from responses",
            "usage": {"input_tokens": 9, "output_tokens": 4},
        });
        let out = convert_responses_json_to_anthropic(raw.to_string().as_bytes(), "spoof");
        assert_eq!(out.content.len(), 1);
        assert_eq!(out.content[0].text, "hello from responses");
        assert_eq!(out.model, "spoof");
        assert_eq!(out.usage.input_tokens, 9);
        assert_eq!(out.usage.output_tokens, 4);
        assert_eq!(out.stop_reason, "end_turn");
    }

    #[test]
    fn test_output_walk_path() {
        // output_text 为空时遍历 output[] 的 message 条目
        let raw = json!({
            "output": [
                {"type": "reasoning", "content": [{"text": "skipped"}]},
                {"type": "message", "content": [{"text": "line1"}, {"text": "line2"}]},
                {"content": [{"text": "untyped"}]},
            ],
        });
        let out = convert_responses_json_to_anthropic(raw.to_string().as_bytes(), "spoof");
        assert_eq!(out.content.len(), 1);
        assert_eq!(out.content[0].text, "line1\nline2\nuntyped");
    }

    #[test]
    fn test_function_call_blocks_and_stop_reason() {
        let raw = json!({
            "output": [
                {"type": "function_call", "call_id": "call_1", "name": "search",
                 "arguments": "{\"q\":\"go\"}"},
                {"type": "function_call", "name": "anon", "arguments": "broken"},
            ],
        });
        let out = convert_responses_json_to_anthropic(raw.to_string().as_bytes(), "spoof");
        assert_eq!(out.content.len(), 2);
        assert_eq!(out.content[0].block_type, "tool_use");
        assert_eq!(out.content[0].id, "call_1");
        assert_eq!(out.content[0].input, Some(json!({"q": "go"})));
        // 缺 call_id 时生成 toolu_ 前缀，非法参数回退为 {}
        assert!(out.content[1].id.starts_with("toolu_"));
        assert_eq!(out.content[1].input, Some(json!({})));
        assert_eq!(out.stop_reason, "tool_use");
    }

    #[test]
    fn test_incomplete_max_output_tokens() {
        let raw = json!({
            "output_text": "partial",
            "status": "incomplete",
            "status_details": {"reason": "max_output_tokens"},
        });
        let out = convert_responses_json_to_anthropic(raw.to_string().as_bytes(), "spoof");
        assert_eq!(out.stop_reason, "max_tokens");
    }

    #[test]
    fn test_invalid_json_becomes_text_block() {
        let out = convert_responses_json_to_anthropic(b"not json at all", "spoof");
        assert_eq!(out.content.len(), 1);
        assert_eq!(out.content[0].block_type, "text");
        assert_eq!(out.content[0].text, "not json at all");
        // 无法解析时不设置 stop_reason
        assert_eq!(out.stop_reason, "");
    }
}
