//! Anthropic 请求转换为 OpenAI chat completions 请求

use crate::models::anthropic::{AnthropicMessage, AnthropicMessageRequest, AnthropicTool};
use crate::models::openai::{
    OpenAiChatRequest, OpenAiFunctionDefinition, OpenAiMessage, OpenAiStreamOptions, OpenAiTool,
    OpenAiToolCall, OpenAiToolFunction,
};
use crate::translator::content::{
    extract_tool_result_text, normalize_content_blocks, normalize_content_text,
    normalize_system_text, raw_input_string, tool_parameters,
};
use crate::util::unix_nanos;
use serde_json::Value;

const DEFAULT_MAX_TOKENS: i64 = 4096;

/// 构建 OpenAI chat completions 请求
///
/// `max_tokens` 缺失或 ≤ 0 时取 4096；流式请求附带
/// `stream_options.include_usage` 以便上游在流中回报用量。
pub fn translate_anthropic_to_openai(
    req: &AnthropicMessageRequest,
    model: &str,
) -> OpenAiChatRequest {
    let max_tokens = match req.max_tokens {
        Some(v) if v > 0 => v,
        _ => DEFAULT_MAX_TOKENS,
    };

    let mut out = OpenAiChatRequest {
        model: model.to_string(),
        messages: translate_messages(&req.system, &req.messages),
        stream: req.stream,
        max_tokens,
        ..Default::default()
    };
    if req.stream {
        out.stream_options = Some(OpenAiStreamOptions {
            include_usage: true,
        });
    }

    if !req.tools.is_empty() {
        out.tools = translate_tools(&req.tools);
    }
    if !req.tool_choice.is_null() {
        out.tool_choice = translate_tool_choice(&req.tool_choice);
    }
    out
}

/// 归一化 system 并逐条转换消息
fn translate_messages(system: &Value, messages: &[AnthropicMessage]) -> Vec<OpenAiMessage> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    let system_text = normalize_system_text(system);
    if !system_text.is_empty() {
        out.push(OpenAiMessage {
            role: "system".into(),
            content: system_text,
            ..Default::default()
        });
    }

    for message in messages {
        match message.role.as_str() {
            "user" => out.extend(translate_user_message(message)),
            "assistant" => out.extend(translate_assistant_message(message)),
            _ => out.push(OpenAiMessage {
                role: message.role.clone(),
                content: normalize_content_text(&message.content),
                ..Default::default()
            }),
        }
    }
    out
}

/// 用户消息：text 块累积，tool_result 块冲刷累积文本后
/// 单独生成一条 `role: tool` 消息，输出顺序跟随块顺序
fn translate_user_message(message: &AnthropicMessage) -> Vec<OpenAiMessage> {
    if let Value::String(text) = &message.content {
        return vec![OpenAiMessage {
            role: "user".into(),
            content: text.clone(),
            ..Default::default()
        }];
    }

    let blocks = normalize_content_blocks(&message.content);
    let mut text_parts: Vec<String> = Vec::new();
    let mut out: Vec<OpenAiMessage> = Vec::new();

    for block in &blocks {
        match block.block_type.as_str() {
            "text" => {
                if !block.text.trim().is_empty() {
                    text_parts.push(block.text.clone());
                }
            }
            "tool_result" => {
                flush_text(&mut text_parts, &mut out);
                out.push(OpenAiMessage {
                    role: "tool".into(),
                    tool_call_id: block.tool_use_id.clone(),
                    content: extract_tool_result_text(&block.content),
                    ..Default::default()
                });
            }
            _ => {}
        }
    }
    flush_text(&mut text_parts, &mut out);

    if out.is_empty() {
        out.push(OpenAiMessage {
            role: "user".into(),
            content: normalize_content_text(&message.content),
            ..Default::default()
        });
    }
    out
}

fn flush_text(text_parts: &mut Vec<String>, out: &mut Vec<OpenAiMessage>) {
    if text_parts.is_empty() {
        return;
    }
    out.push(OpenAiMessage {
        role: "user".into(),
        content: text_parts.join("\n"),
        ..Default::default()
    });
    text_parts.clear();
}

/// 助手消息：text 块拼接为 content，tool_use 块转为 tool_calls
fn translate_assistant_message(message: &AnthropicMessage) -> Vec<OpenAiMessage> {
    if let Value::String(text) = &message.content {
        return vec![OpenAiMessage {
            role: "assistant".into(),
            content: text.clone(),
            ..Default::default()
        }];
    }

    let blocks = normalize_content_blocks(&message.content);
    let mut text_parts: Vec<String> = Vec::new();
    let mut tool_calls: Vec<OpenAiToolCall> = Vec::new();

    for (i, block) in blocks.iter().enumerate() {
        match block.block_type.as_str() {
            "text" => {
                if !block.text.trim().is_empty() {
                    text_parts.push(block.text.clone());
                }
            }
            "tool_use" => {
                let id = if block.id.is_empty() {
                    format!("tool_call_{}_{}", unix_nanos(), i)
                } else {
                    block.id.clone()
                };
                tool_calls.push(OpenAiToolCall {
                    id,
                    call_type: "function".into(),
                    function: OpenAiToolFunction {
                        name: block.name.clone(),
                        arguments: raw_input_string(&block.input),
                    },
                    ..Default::default()
                });
            }
            _ => {}
        }
    }

    vec![OpenAiMessage {
        role: "assistant".into(),
        content: text_parts.join("\n"),
        tool_calls,
        ..Default::default()
    }]
}

fn translate_tools(tools: &[AnthropicTool]) -> Vec<OpenAiTool> {
    tools
        .iter()
        .map(|tool| OpenAiTool {
            tool_type: "function".into(),
            function: OpenAiFunctionDefinition {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: Some(tool_parameters(&tool.input_schema)),
            },
        })
        .collect()
}

/// tool_choice 映射
///
/// 非对象值原样透传；对象按 type 映射，`tool` 变为嵌套的
/// `{type: function, function: {name}}`，未识别的对象原样透传
/// （与 responses 转换器刻意不同，后者回退为 `"auto"`）。
fn translate_tool_choice(v: &Value) -> Value {
    let Value::Object(m) = v else {
        return v.clone();
    };
    let t = m.get("type").and_then(Value::as_str).unwrap_or("");
    match t {
        "auto" => Value::String("auto".into()),
        "any" => Value::String("required".into()),
        "none" => Value::String("none".into()),
        "tool" => {
            let name = m.get("name").and_then(Value::as_str).unwrap_or("");
            serde_json::json!({
                "type": "function",
                "function": {"name": name},
            })
        }
        _ => v.clone(),
    }
}
