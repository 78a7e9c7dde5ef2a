//! OpenAI 非流式响应转换为 Anthropic message

use crate::models::anthropic::{
    AnthropicContentBlock, AnthropicMessageResponse, AnthropicUsage,
};
use crate::models::openai::OpenAiChatResponse;
use crate::translator::content::safe_json_value;
use crate::util::unix_nanos;

/// 把完整的 OpenAI chat 响应转换为 Anthropic message 响应
///
/// 响应 id 由本地合成，model 固定写入配置的 spoof_model。
pub fn convert_openai_nonstream_to_anthropic(
    resp: &OpenAiChatResponse,
    spoof_model: &str,
) -> AnthropicMessageResponse {
    let mut out = AnthropicMessageResponse {
        id: format!("msg_{}", unix_nanos()),
        response_type: "message".into(),
        role: "assistant".into(),
        model: spoof_model.to_string(),
        usage: AnthropicUsage {
            input_tokens: resp.usage.prompt_tokens,
            output_tokens: resp.usage.completion_tokens,
        },
        ..Default::default()
    };

    let Some(choice) = resp.choices.first() else {
        return out;
    };

    if !choice.message.content.trim().is_empty() {
        out.content
            .push(AnthropicContentBlock::text(choice.message.content.clone()));
    }
    for tc in &choice.message.tool_calls {
        out.content.push(AnthropicContentBlock::tool_use(
            tc.id.clone(),
            tc.function.name.clone(),
            safe_json_value(&tc.function.arguments),
        ));
    }
    out.stop_reason = map_finish_reason(&choice.finish_reason).to_string();
    out
}

/// finish_reason → stop_reason 映射，全函数且固定
pub fn map_finish_reason(v: &str) -> &'static str {
    match v {
        "stop" => "end_turn",
        "length" => "max_tokens",
        "tool_calls" => "tool_use",
        _ => "end_turn",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::openai::{
        OpenAiChoice, OpenAiMessage, OpenAiToolCall, OpenAiToolFunction, OpenAiUsage,
    };
    use serde_json::json;

    #[test]
    fn test_map_finish_reason_total() {
        assert_eq!(map_finish_reason("stop"), "end_turn");
        assert_eq!(map_finish_reason("length"), "max_tokens");
        assert_eq!(map_finish_reason("tool_calls"), "tool_use");
        assert_eq!(map_finish_reason(""), "end_turn");
        assert_eq!(map_finish_reason("content_filter"), "end_turn");
    }

    #[test]
    fn test_convert_text_response() {
        let resp = OpenAiChatResponse {
            choices: vec![OpenAiChoice {
                message: OpenAiMessage {
                    role: "assistant".into(),
                    content: "hello from openai".into(),
                    ..Default::default()
                },
                finish_reason: "stop".into(),
                ..Default::default()
            }],
            usage: OpenAiUsage {
                prompt_tokens: 12,
                completion_tokens: 7,
            },
            ..Default::default()
        };
        let out = convert_openai_nonstream_to_anthropic(&resp, "claude-sonnet-4-5");
        assert!(out.id.starts_with("msg_"));
        assert_eq!(out.response_type, "message");
        assert_eq!(out.role, "assistant");
        assert_eq!(out.model, "claude-sonnet-4-5");
        assert_eq!(out.content.len(), 1);
        assert_eq!(out.content[0].block_type, "text");
        assert_eq!(out.content[0].text, "hello from openai");
        assert_eq!(out.stop_reason, "end_turn");
        assert_eq!(out.usage.input_tokens, 12);
        assert_eq!(out.usage.output_tokens, 7);
    }

    #[test]
    fn test_convert_tool_call_response() {
        let resp = OpenAiChatResponse {
            choices: vec![OpenAiChoice {
                message: OpenAiMessage {
                    role: "assistant".into(),
                    content: "".into(),
                    tool_calls: vec![
                        OpenAiToolCall {
                            id: "call_1".into(),
                            function: OpenAiToolFunction {
                                name: "search".into(),
                                arguments: r#"{"q":"go"}"#.into(),
                            },
                            ..Default::default()
                        },
                        OpenAiToolCall {
                            id: "call_2".into(),
                            function: OpenAiToolFunction {
                                name: "broken".into(),
                                arguments: "{not json".into(),
                            },
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
                finish_reason: "tool_calls".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let out = convert_openai_nonstream_to_anthropic(&resp, "spoof");
        assert_eq!(out.content.len(), 2);
        assert_eq!(out.content[0].block_type, "tool_use");
        assert_eq!(out.content[0].input, Some(json!({"q": "go"})));
        // 非法参数回退为 {}
        assert_eq!(out.content[1].input, Some(json!({})));
        assert_eq!(out.stop_reason, "tool_use");
    }

    #[test]
    fn test_convert_empty_choices() {
        let out = convert_openai_nonstream_to_anthropic(&OpenAiChatResponse::default(), "spoof");
        assert!(out.content.is_empty());
        assert_eq!(out.stop_reason, "");
    }
}
