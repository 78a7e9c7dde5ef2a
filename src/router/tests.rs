//! 路由模块测试
//!
//! 单元测试覆盖标记提取与解析优先级，属性测试验证
//! 「system 标记恒优先于消息标记」的稳定性。

use crate::config::{Config, ProviderConfig};
use crate::models::anthropic::AnthropicMessage;
use crate::router::*;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashMap;

fn test_config() -> Config {
    let mut providers = HashMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            provider_type: "openai".into(),
            url: "http://upstream/chat".into(),
            model: "gpt-5-mini".into(),
            ..Default::default()
        },
    );
    providers.insert(
        "codex".to_string(),
        ProviderConfig {
            provider_type: "chatgpt".into(),
            url: "http://upstream/responses".into(),
            model: "gpt-5.3-codex".into(),
            reasoning_effort: "medium".into(),
            ..Default::default()
        },
    );
    Config {
        listen: "127.0.0.1:0".into(),
        spoof_model: "claude-sonnet-4-5".into(),
        default_provider: "openai".into(),
        timeout_seconds: 5,
        providers,
    }
}

fn user_message(text: &str) -> AnthropicMessage {
    AnthropicMessage {
        role: "user".into(),
        content: json!(text),
    }
}

#[test]
fn test_extract_route_name() {
    assert_eq!(extract_route_name(&json!("<!-- @route:codex -->")), "codex");
    // 路由名统一小写
    assert_eq!(extract_route_name(&json!("@route:CoDex")), "codex");
    assert_eq!(extract_route_name(&json!("no marker here")), "");
    assert_eq!(extract_route_name(&Value::Null), "");
}

#[test]
fn test_extract_model_name_charset() {
    // 模型名允许 . : / 且保留大小写
    assert_eq!(
        extract_model_name(&json!("use @model:qwen2.5-coder:32b now")),
        "qwen2.5-coder:32b"
    );
    assert_eq!(
        extract_model_name(&json!("@model:GPT-5.3-Codex")),
        "GPT-5.3-Codex"
    );
}

#[test]
fn test_extract_from_block_content() {
    // 标记可以埋在内容块序列的 text 块里
    let content = json!([
        {"type": "tool_use", "id": "t", "name": "n"},
        {"type": "text", "text": "prefix @route:openai suffix"},
    ]);
    assert_eq!(extract_route_name(&content), "openai");
}

#[test]
fn test_first_match_wins_within_text() {
    assert_eq!(
        extract_route_name(&json!("@route:openai then @route:codex")),
        "openai"
    );
}

#[test]
fn test_resolve_provider_default() {
    let cfg = test_config();
    let (name, provider) =
        resolve_provider(&Value::Null, &[user_message("hi")], &cfg).unwrap();
    assert_eq!(name, "openai");
    assert_eq!(provider.model, "gpt-5-mini");
}

#[test]
fn test_resolve_provider_from_message() {
    let cfg = test_config();
    let messages = vec![user_message("hi"), user_message("@route:codex please")];
    let (name, _) = resolve_provider(&Value::Null, &messages, &cfg).unwrap();
    assert_eq!(name, "codex");
}

#[test]
fn test_system_marker_beats_message_marker() {
    let cfg = test_config();
    let messages = vec![user_message("@route:codex")];
    let (name, _) = resolve_provider(&json!("@route:openai"), &messages, &cfg).unwrap();
    assert_eq!(name, "openai");
}

#[test]
fn test_resolve_provider_unknown_route() {
    let cfg = test_config();
    let err = resolve_provider(&json!("@route:missing"), &[], &cfg).unwrap_err();
    assert!(err.to_string().contains("route provider \"missing\" not found"));
}

#[test]
fn test_resolve_provider_missing_default() {
    let mut cfg = test_config();
    cfg.default_provider = "ghost".into();
    let err = resolve_provider(&Value::Null, &[], &cfg).unwrap_err();
    assert!(err.to_string().contains("default provider \"ghost\" not found"));
}

#[test]
fn test_resolve_model_name() {
    assert_eq!(
        resolve_model_name(&json!("@model:gpt-4.1"), &[], "gpt-5-mini"),
        "gpt-4.1"
    );
    assert_eq!(resolve_model_name(&Value::Null, &[], "gpt-5-mini"), "gpt-5-mini");
    let messages = vec![user_message("@model:o4-mini")];
    assert_eq!(resolve_model_name(&Value::Null, &messages, "x"), "o4-mini");
}

#[test]
fn test_resolve_reasoning_effort() {
    // 标记优先于默认值，且统一小写
    let effort =
        resolve_reasoning_effort(&json!("@reasoning:HIGH"), &[], "medium").unwrap();
    assert_eq!(effort, "high");

    // 无标记时回退默认值
    let effort = resolve_reasoning_effort(&Value::Null, &[], "medium").unwrap();
    assert_eq!(effort, "medium");

    // 两者皆空时为空
    let effort = resolve_reasoning_effort(&Value::Null, &[], "").unwrap();
    assert_eq!(effort, "");
}

#[test]
fn test_resolve_reasoning_effort_invalid_marker() {
    let err = resolve_reasoning_effort(&json!("@reasoning:ultra"), &[], "medium").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("invalid @reasoning value \"ultra\""));
    assert!(msg.contains("none/minimal/low/medium/high/xhigh"));
}

#[test]
fn test_resolve_reasoning_effort_invalid_default() {
    let err = resolve_reasoning_effort(&Value::Null, &[], "turbo").unwrap_err();
    assert!(err
        .to_string()
        .contains("invalid default reasoning effort: turbo"));
}

#[test]
fn test_is_valid_reasoning_effort() {
    for v in ["none", "minimal", "low", "medium", "high", "xhigh", " High "] {
        assert!(is_valid_reasoning_effort(v), "{v}");
    }
    for v in ["", "ultra", "max"] {
        assert!(!is_valid_reasoning_effort(v), "{v}");
    }
}

// ============================================================================
// 属性测试
// ============================================================================

fn arb_route_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,12}".prop_map(|s| s)
}

proptest! {
    /// *对于任意* 路由名组合，system 标记恒优先于消息标记，
    /// 与消息顺序无关。
    #[test]
    fn prop_system_marker_always_wins(
        system_route in arb_route_name(),
        message_route in arb_route_name(),
        padding in "[ a-z]{0,20}",
    ) {
        let system = json!(format!("{padding}@route:{system_route}"));
        let messages = vec![AnthropicMessage {
            role: "user".into(),
            content: json!(format!("@route:{message_route}")),
        }];
        prop_assert_eq!(extract_route_name(&system), system_route.clone());

        let mut providers = HashMap::new();
        for name in [&system_route, &message_route] {
            providers.insert(
                name.to_string(),
                ProviderConfig {
                    provider_type: "openai".into(),
                    url: "http://u".into(),
                    model: "m".into(),
                    ..Default::default()
                },
            );
        }
        let cfg = Config {
            listen: "l".into(),
            spoof_model: "s".into(),
            default_provider: system_route.clone(),
            timeout_seconds: 1,
            providers,
        };
        let (resolved, _) = resolve_provider(&system, &messages, &cfg).unwrap();
        prop_assert_eq!(resolved, system_route);
    }

    /// 提取出的路由名只含允许的字符且为小写
    #[test]
    fn prop_route_name_charset(text in ".{0,64}") {
        let name = extract_route_name(&json!(text));
        prop_assert!(name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-'));
    }
}
