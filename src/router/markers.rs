//! 标记提取
//!
//! 标记是嵌在任意文本中的 `@key:value` 记号，只取扫描文本中的
//! 第一个匹配。模型名允许 `.`、`:`、`/`（如 `qwen2.5-coder:32b`）。

use crate::translator::content::normalize_system_text;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static ROUTE_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@route:([a-zA-Z0-9_-]+)").unwrap());
static MODEL_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@model:([a-zA-Z0-9._:/-]+)").unwrap());
static REASONING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@reasoning:([a-zA-Z0-9_-]+)").unwrap());

/// 提取 `@route:` 标记，路由名统一小写
pub fn extract_route_name(content: &Value) -> String {
    match first_capture(&ROUTE_MARKER, content) {
        Some(name) => name.trim().to_lowercase(),
        None => String::new(),
    }
}

/// 提取 `@model:` 标记，模型名保留大小写
pub fn extract_model_name(content: &Value) -> String {
    first_capture(&MODEL_MARKER, content)
        .map(|m| m.trim().to_string())
        .unwrap_or_default()
}

/// 提取 `@reasoning:` 标记（未校验）
pub fn extract_reasoning_effort(content: &Value) -> String {
    first_capture(&REASONING_MARKER, content)
        .map(|m| m.trim().to_string())
        .unwrap_or_default()
}

fn first_capture(pattern: &Regex, content: &Value) -> Option<String> {
    let text = normalize_system_text(content);
    pattern
        .captures(&text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
