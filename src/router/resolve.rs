//! 路由解析
//!
//! 标记优先级（严格）：
//! 1. 请求的 `system`
//! 2. 各消息内容，按顺序取第一个匹配
//! 3. 配置默认值（路由取 `default_provider`，模型取 Provider 配置，
//!    推理强度取 Provider 的 `reasoning_effort`）

use crate::config::{Config, ProviderConfig};
use crate::error::ProxyError;
use crate::models::anthropic::AnthropicMessage;
use crate::router::markers::{extract_model_name, extract_reasoning_effort, extract_route_name};
use serde_json::Value;

const VALID_REASONING_EFFORTS: &[&str] = &["none", "minimal", "low", "medium", "high", "xhigh"];

/// 解析目标 Provider
///
/// 标记命名的 Provider 不存在于配置时报错；没有标记且
/// `default_provider` 不存在时同样报错。
pub fn resolve_provider<'a>(
    system: &Value,
    messages: &[AnthropicMessage],
    cfg: &'a Config,
) -> Result<(String, &'a ProviderConfig), ProxyError> {
    let mut route_name = extract_route_name(system);
    if route_name.is_empty() {
        route_name = extract_route_name_from_messages(messages);
    }
    if route_name.is_empty() {
        let provider = cfg.providers.get(&cfg.default_provider).ok_or_else(|| {
            ProxyError::BadRequest(format!(
                "default provider {:?} not found",
                cfg.default_provider
            ))
        })?;
        return Ok((cfg.default_provider.clone(), provider));
    }

    let provider = cfg
        .providers
        .get(&route_name)
        .ok_or_else(|| ProxyError::BadRequest(format!("route provider {route_name:?} not found")))?;
    Ok((route_name, provider))
}

/// 解析 Provider 与模型名
pub fn resolve_provider_and_model<'a>(
    system: &Value,
    messages: &[AnthropicMessage],
    cfg: &'a Config,
) -> Result<(String, &'a ProviderConfig, String), ProxyError> {
    let (name, provider) = resolve_provider(system, messages, cfg)?;
    let model = resolve_model_name(system, messages, &provider.model);
    Ok((name, provider, model))
}

/// 解析模型名，纯字符串替换，不做校验
pub fn resolve_model_name(
    system: &Value,
    messages: &[AnthropicMessage],
    default_model: &str,
) -> String {
    let mut model = extract_model_name(system);
    if model.is_empty() {
        model = extract_model_name_from_messages(messages);
    }
    if model.is_empty() {
        return default_model.to_string();
    }
    model
}

/// 解析推理强度
///
/// 标记值与配置默认值都要通过合法集校验，非法时带说明报错。
/// 两者都为空时返回空字符串（上游请求省略该字段）。
pub fn resolve_reasoning_effort(
    system: &Value,
    messages: &[AnthropicMessage],
    default_effort: &str,
) -> Result<String, ProxyError> {
    let effort = normalize_reasoning_effort(default_effort);
    let mut marker_effort = extract_reasoning_effort(system);
    if marker_effort.is_empty() {
        marker_effort = extract_reasoning_effort_from_messages(messages);
    }
    if marker_effort.is_empty() {
        if effort.is_empty() {
            return Ok(String::new());
        }
        if !is_valid_reasoning_effort(&effort) {
            return Err(ProxyError::BadRequest(format!(
                "invalid default reasoning effort: {effort}"
            )));
        }
        return Ok(effort);
    }

    let normalized = normalize_reasoning_effort(&marker_effort);
    if !is_valid_reasoning_effort(&normalized) {
        return Err(ProxyError::BadRequest(format!(
            "invalid @reasoning value {marker_effort:?} (allowed: none/minimal/low/medium/high/xhigh)"
        )));
    }
    Ok(normalized)
}

/// 小写并去首尾空白
pub fn normalize_reasoning_effort(v: &str) -> String {
    v.trim().to_lowercase()
}

/// 推理强度合法集校验
pub fn is_valid_reasoning_effort(v: &str) -> bool {
    VALID_REASONING_EFFORTS.contains(&normalize_reasoning_effort(v).as_str())
}

fn extract_route_name_from_messages(messages: &[AnthropicMessage]) -> String {
    for msg in messages {
        let name = extract_route_name(&msg.content);
        if !name.is_empty() {
            return name;
        }
    }
    String::new()
}

fn extract_model_name_from_messages(messages: &[AnthropicMessage]) -> String {
    for msg in messages {
        let model = extract_model_name(&msg.content);
        if !model.is_empty() {
            return model;
        }
    }
    String::new()
}

fn extract_reasoning_effort_from_messages(messages: &[AnthropicMessage]) -> String {
    for msg in messages {
        let effort = extract_reasoning_effort(&msg.content);
        if !effort.is_empty() {
            return effort;
        }
    }
    String::new()
}
