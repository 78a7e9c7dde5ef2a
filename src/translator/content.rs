//! 异构内容归一化
//!
//! Anthropic 方言中 `system`、消息 `content`、`tool_result.content`
//! 都可能是字符串、单个内容块或内容块数组。这里提供统一的归一化
//! 入口，所有转换器经由同一条路径处理。

use crate::models::anthropic::AnthropicContentBlock;
use serde_json::Value;

/// 把异构内容归一化为内容块序列
///
/// - 字符串：非空白时视为单个 text 块
/// - 数组：按内容块序列反序列化，失败时丢弃
/// - 对象：带 `type` 字段时视为单个内容块
pub fn normalize_content_blocks(content: &Value) -> Vec<AnthropicContentBlock> {
    match content {
        Value::String(s) => {
            if s.trim().is_empty() {
                Vec::new()
            } else {
                vec![AnthropicContentBlock::text(s.clone())]
            }
        }
        Value::Array(_) => serde_json::from_value(content.clone()).unwrap_or_default(),
        Value::Object(_) => match serde_json::from_value::<AnthropicContentBlock>(content.clone()) {
            Ok(block) if !block.block_type.is_empty() => vec![block],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// 把 system 字段归一化为单个字符串
///
/// 字符串直接去首尾空白；内容块序列取所有非空 text 块，
/// 逐块去空白后以 `\n` 连接。
pub fn normalize_system_text(system: &Value) -> String {
    if let Value::String(s) = system {
        return s.trim().to_string();
    }

    normalize_content_blocks(system)
        .iter()
        .filter(|b| b.block_type == "text" && !b.text.trim().is_empty())
        .map(|b| b.text.trim().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 把任意内容归一化为文本
///
/// 与 [`normalize_system_text`] 不同，字符串与 text 块内容原样保留
/// （不去首尾空白），仅跳过空白块。
pub fn normalize_content_text(content: &Value) -> String {
    if let Value::String(s) = content {
        return s.clone();
    }

    normalize_content_blocks(content)
        .iter()
        .filter(|b| b.block_type == "text" && !b.text.trim().is_empty())
        .map(|b| b.text.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

/// 提取 tool_result 的文本内容
pub fn extract_tool_result_text(content: &Option<Value>) -> String {
    match content {
        None => String::new(),
        Some(v) => normalize_content_text(v),
    }
}

/// 把上游返回的参数字符串解析为 JSON 值
///
/// 空白或非法 JSON 一律回退为 `{}`；合法 JSON 原样保留。
pub fn safe_json_value(raw: &str) -> Value {
    let raw = raw.trim();
    if raw.is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::json!({}))
}

/// tool_use 的 input 字段转为 JSON 字符串，缺失时为 `{}`
pub fn raw_input_string(input: &Option<Value>) -> String {
    match input {
        None => "{}".to_string(),
        Some(v) => serde_json::to_string(v).unwrap_or_else(|_| "{}".to_string()),
    }
}

/// 工具参数定义，空 schema 回退为空对象 schema
pub fn tool_parameters(input_schema: &Option<Value>) -> Value {
    match input_schema {
        Some(v) if !v.is_null() => v.clone(),
        _ => serde_json::json!({"type": "object", "properties": {}}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_blocks_from_string() {
        let blocks = normalize_content_blocks(&json!("hello"));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].block_type, "text");
        assert_eq!(blocks[0].text, "hello");

        assert!(normalize_content_blocks(&json!("   ")).is_empty());
        assert!(normalize_content_blocks(&Value::Null).is_empty());
    }

    #[test]
    fn test_normalize_blocks_from_array() {
        let blocks = normalize_content_blocks(&json!([
            {"type": "text", "text": "a"},
            {"type": "tool_use", "id": "t1", "name": "search", "input": {"q": "x"}},
        ]));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].block_type, "tool_use");
        assert_eq!(blocks[1].name, "search");
    }

    #[test]
    fn test_normalize_blocks_from_single_object() {
        let blocks = normalize_content_blocks(&json!({"type": "text", "text": "solo"}));
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].text, "solo");

        // 缺少 type 字段的对象被丢弃
        assert!(normalize_content_blocks(&json!({"text": "x"})).is_empty());
    }

    #[test]
    fn test_normalize_system_text() {
        assert_eq!(normalize_system_text(&json!("  sys  ")), "sys");
        let text = normalize_system_text(&json!([
            {"type": "text", "text": " a "},
            {"type": "tool_use", "id": "t", "name": "n"},
            {"type": "text", "text": "b"},
        ]));
        assert_eq!(text, "a\nb");
        assert_eq!(normalize_system_text(&Value::Null), "");
    }

    #[test]
    fn test_normalize_content_text_keeps_whitespace() {
        // 字符串内容原样返回，不去空白
        assert_eq!(normalize_content_text(&json!(" raw ")), " raw ");
        let text = normalize_content_text(&json!([
            {"type": "text", "text": " a "},
            {"type": "text", "text": "  "},
        ]));
        assert_eq!(text, " a ");
    }

    #[test]
    fn test_extract_tool_result_text() {
        assert_eq!(extract_tool_result_text(&None), "");
        assert_eq!(extract_tool_result_text(&Some(json!("out"))), "out");
        let text = extract_tool_result_text(&Some(json!([
            {"type": "text", "text": "line1"},
            {"type": "text", "text": "line2"},
        ])));
        assert_eq!(text, "line1\nline2");
    }

    #[test]
    fn test_safe_json_value() {
        assert_eq!(safe_json_value(""), json!({}));
        assert_eq!(safe_json_value("   "), json!({}));
        assert_eq!(safe_json_value("{not json"), json!({}));
        assert_eq!(safe_json_value(r#"{"q":"go"}"#), json!({"q":"go"}));
        // 合法 JSON 上幂等
        let v = safe_json_value(r#"{"a":1}"#);
        assert_eq!(safe_json_value(&v.to_string()), v);
    }

    #[test]
    fn test_raw_input_string() {
        assert_eq!(raw_input_string(&None), "{}");
        assert_eq!(raw_input_string(&Some(json!({"k":"v"}))), r#"{"k":"v"}"#);
    }
}
