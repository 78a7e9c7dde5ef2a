//! Anthropic 请求转换为 responses 请求
//!
//! 上游对所有请求要求 stream=true，调用方在发送前统一强制；
//! 这里只按原样携带客户端的 stream 取值。

use crate::models::anthropic::{AnthropicMessage, AnthropicMessageRequest, AnthropicTool};
use crate::models::responses::{
    ReasoningConfig, ResponsesInputItem, ResponsesRequest, ResponsesTool,
};
use crate::router::normalize_reasoning_effort;
use crate::translator::content::{
    extract_tool_result_text, normalize_content_blocks, normalize_system_text, raw_input_string,
    tool_parameters,
};
use crate::util::unix_nanos;
use serde_json::Value;

/// 构建 responses 请求
pub fn translate_anthropic_to_responses(
    req: &AnthropicMessageRequest,
    model: &str,
    reasoning_effort: &str,
) -> ResponsesRequest {
    let mut out = ResponsesRequest {
        model: model.to_string(),
        instructions: normalize_system_text(&req.system),
        input: translate_messages_to_input(&req.messages),
        parallel_tool_calls: false,
        reasoning: Some(ReasoningConfig {
            effort: String::new(),
            summary: "auto".into(),
        }),
        store: false,
        stream: req.stream,
        include: vec!["reasoning.encrypted_content".into()],
        ..Default::default()
    };
    let normalized = normalize_reasoning_effort(reasoning_effort);
    if !normalized.is_empty() {
        if let Some(reasoning) = out.reasoning.as_mut() {
            reasoning.effort = normalized;
        }
    }

    if !req.tools.is_empty() {
        out.tools = translate_tools(&req.tools);
    }
    if !req.tool_choice.is_null() {
        out.tool_choice = translate_tool_choice(&req.tool_choice);
    }
    out
}

/// 消息转换为输入条目
///
/// 只保留 user / assistant 两种角色。text 块累积为 pending 文本，
/// tool_use / tool_result 块先冲刷 pending 文本再生成对应条目，
/// 顺序跟随块顺序。
fn translate_messages_to_input(messages: &[AnthropicMessage]) -> Vec<ResponsesInputItem> {
    let mut out = Vec::with_capacity(messages.len());

    for message in messages {
        let role = message.role.as_str();
        if role != "user" && role != "assistant" {
            continue;
        }

        if let Value::String(text) = &message.content {
            if text.trim().is_empty() {
                continue;
            }
            out.push(ResponsesInputItem {
                item_type: "message".into(),
                role: role.to_string(),
                content: text.clone(),
                ..Default::default()
            });
            continue;
        }

        let blocks = normalize_content_blocks(&message.content);
        let mut text_parts: Vec<String> = Vec::new();

        for (i, block) in blocks.iter().enumerate() {
            match block.block_type.as_str() {
                "text" => {
                    if !block.text.trim().is_empty() {
                        text_parts.push(block.text.clone());
                    }
                }
                "tool_use" => {
                    flush_text(role, &mut text_parts, &mut out);
                    let mut call_id = block.id.trim().to_string();
                    if call_id.is_empty() {
                        call_id = format!("toolu_{}_{}", unix_nanos(), i);
                    }
                    out.push(ResponsesInputItem {
                        item_type: "function_call".into(),
                        id: format!("fc_{call_id}"),
                        call_id,
                        name: block.name.clone(),
                        arguments: raw_input_string(&block.input),
                        ..Default::default()
                    });
                }
                "tool_result" => {
                    flush_text(role, &mut text_parts, &mut out);
                    if block.tool_use_id.trim().is_empty() {
                        continue;
                    }
                    let mut output = extract_tool_result_text(&block.content);
                    if output.is_empty() {
                        output = "(empty)".to_string();
                    }
                    out.push(ResponsesInputItem {
                        item_type: "function_call_output".into(),
                        call_id: block.tool_use_id.clone(),
                        output,
                        ..Default::default()
                    });
                }
                _ => {}
            }
        }
        flush_text(role, &mut text_parts, &mut out);
    }
    out
}

fn flush_text(role: &str, text_parts: &mut Vec<String>, out: &mut Vec<ResponsesInputItem>) {
    if text_parts.is_empty() {
        return;
    }
    out.push(ResponsesInputItem {
        item_type: "message".into(),
        role: role.to_string(),
        content: text_parts.join("\n"),
        ..Default::default()
    });
    text_parts.clear();
}

fn translate_tools(tools: &[AnthropicTool]) -> Vec<ResponsesTool> {
    tools
        .iter()
        .map(|tool| ResponsesTool {
            tool_type: "function".into(),
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: Some(tool_parameters(&tool.input_schema)),
        })
        .collect()
}

/// tool_choice 映射
///
/// 与 OpenAI 转换器不同：`tool` 不嵌套 function，且一切
/// 未识别的取值一律回退为 `"auto"`。
fn translate_tool_choice(v: &Value) -> Value {
    let Value::Object(m) = v else {
        return Value::String("auto".into());
    };
    let t = m.get("type").and_then(Value::as_str).unwrap_or("");
    match t {
        "auto" => Value::String("auto".into()),
        "any" => Value::String("required".into()),
        "none" => Value::String("none".into()),
        "tool" => {
            let name = m.get("name").and_then(Value::as_str).unwrap_or("");
            serde_json::json!({"type": "function", "name": name})
        }
        _ => Value::String("auto".into()),
    }
}
