//! Anthropic SSE 事件构造
//!
//! 事件编码为 `event: <名称>\ndata: <JSON>\n\n`，两个流式转换器
//! 共用这里的构造函数。

use serde_json::Value;

/// 编码单个 SSE 事件
pub fn format_sse_event(event: &str, payload: &Value) -> String {
    format!("event: {event}\ndata: {payload}\n\n")
}

/// `message_start`：合成的消息信封，usage 置零
pub fn message_start_event(message_id: &str, model: &str) -> String {
    let payload = serde_json::json!({
        "type": "message_start",
        "message": {
            "id": message_id,
            "type": "message",
            "role": "assistant",
            "model": model,
            "content": [],
            "stop_reason": null,
            "stop_sequence": null,
            "usage": {
                "input_tokens": 0,
                "output_tokens": 0,
            },
        },
    });
    format_sse_event("message_start", &payload)
}

/// 文本块的 `content_block_start`
pub fn content_block_start_text(index: usize) -> String {
    let payload = serde_json::json!({
        "type": "content_block_start",
        "index": index,
        "content_block": {
            "type": "text",
            "text": "",
        },
    });
    format_sse_event("content_block_start", &payload)
}

/// tool_use 块的 `content_block_start`
pub fn content_block_start_tool(index: usize, id: &str, name: &str) -> String {
    let payload = serde_json::json!({
        "type": "content_block_start",
        "index": index,
        "content_block": {
            "type": "tool_use",
            "id": id,
            "name": name,
            "input": {},
        },
    });
    format_sse_event("content_block_start", &payload)
}

/// 文本增量
pub fn text_delta_event(index: usize, text: &str) -> String {
    let payload = serde_json::json!({
        "type": "content_block_delta",
        "index": index,
        "delta": {
            "type": "text_delta",
            "text": text,
        },
    });
    format_sse_event("content_block_delta", &payload)
}

/// 工具参数增量
pub fn input_json_delta_event(index: usize, partial_json: &str) -> String {
    let payload = serde_json::json!({
        "type": "content_block_delta",
        "index": index,
        "delta": {
            "type": "input_json_delta",
            "partial_json": partial_json,
        },
    });
    format_sse_event("content_block_delta", &payload)
}

pub fn content_block_stop_event(index: usize) -> String {
    let payload = serde_json::json!({
        "type": "content_block_stop",
        "index": index,
    });
    format_sse_event("content_block_stop", &payload)
}

/// `message_delta`：最终 stop_reason 与输出 token 数
pub fn message_delta_event(stop_reason: &str, output_tokens: i64) -> String {
    let payload = serde_json::json!({
        "type": "message_delta",
        "delta": {
            "stop_reason": stop_reason,
            "stop_sequence": null,
        },
        "usage": {
            "output_tokens": output_tokens,
        },
    });
    format_sse_event("message_delta", &payload)
}

pub fn message_stop_event() -> String {
    format_sse_event("message_stop", &serde_json::json!({"type": "message_stop"}))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_event_format() {
        let ev = text_delta_event(0, "hi");
        assert!(ev.starts_with("event: content_block_delta\ndata: "));
        assert!(ev.ends_with("\n\n"));
        // data 行是合法 JSON
        let data = ev
            .lines()
            .find(|l| l.starts_with("data: "))
            .map(|l| &l[6..])
            .unwrap();
        let v: Value = serde_json::from_str(data).unwrap();
        assert_eq!(v["delta"]["text"], "hi");
    }

    #[test]
    fn test_message_start_envelope() {
        let ev = message_start_event("msg_1", "claude-sonnet-4-5");
        let data = ev
            .lines()
            .find(|l| l.starts_with("data: "))
            .map(|l| &l[6..])
            .unwrap();
        let v: Value = serde_json::from_str(data).unwrap();
        assert_eq!(v["message"]["id"], "msg_1");
        assert_eq!(v["message"]["model"], "claude-sonnet-4-5");
        assert_eq!(v["message"]["usage"]["input_tokens"], 0);
        assert!(v["message"]["stop_reason"].is_null());
    }
}
