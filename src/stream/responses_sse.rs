//! responses 方言 SSE 转换为 Anthropic SSE
//!
//! 与 OpenAI 流的差异：
//!
//! - `message_start` 延迟发出，尽量采用上游 `response.created`
//!   携带的 response.id；整条流没有任何事件时在收尾前补发
//! - 文本块按 `(output_index, content_index)` 建立映射，
//!   `content_index` 缺失时记为 -1；工具块按 `output_index` 映射
//! - `response.completed` 决定 stop_reason 与 output_tokens
//!
//! 非流式桥接由 [`ResponsesCompletedCollector`] 完成：排空整条流，
//! 捕获 `response.completed` 的 response 对象。

use crate::error::ProxyError;
use crate::stream::events::{
    content_block_start_text, content_block_start_tool, content_block_stop_event,
    input_json_delta_event, message_delta_event, message_start_event, message_stop_event,
    text_delta_event,
};
use crate::util::unix_nanos;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// responses SSE → Anthropic SSE 生成器
#[derive(Debug)]
pub struct ResponsesStreamTranslator {
    message_id: String,
    spoof_model: String,
    next_block_index: usize,
    /// (output_index, content_index) → 块索引；content_index 缺失记 -1
    text_blocks: HashMap<(i64, i64), usize>,
    /// output_index → 块索引
    tool_blocks: HashMap<i64, usize>,
    open_blocks: BTreeSet<usize>,
    stop_reason: &'static str,
    output_tokens: i64,
    message_opened: bool,
}

impl ResponsesStreamTranslator {
    pub fn new(spoof_model: &str) -> Self {
        Self {
            message_id: format!("msg_{}", unix_nanos()),
            spoof_model: spoof_model.to_string(),
            next_block_index: 0,
            text_blocks: HashMap::new(),
            tool_blocks: HashMap::new(),
            open_blocks: BTreeSet::new(),
            stop_reason: "end_turn",
            output_tokens: 0,
            message_opened: false,
        }
    }

    /// 消费一条上游 data 负载，返回 (产出的事件, 是否收到 `[DONE]`)
    pub fn process_data(&mut self, data: &str) -> (Vec<String>, bool) {
        let data = data.trim();
        if data.is_empty() {
            return (Vec::new(), false);
        }
        if data == "[DONE]" {
            return (Vec::new(), true);
        }

        let event: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("[RESPONSES-SSE] JSON parse error: {e}");
                return (Vec::new(), false);
            }
        };

        let mut out = Vec::new();
        let event_type = event.get("type").and_then(Value::as_str).unwrap_or("");
        if event_type == "response.created" {
            // 先捕获 response.id 再打开消息，信封才能带上游 id
            self.apply_event(&event, &mut out);
            self.ensure_message_start(&mut out);
        } else {
            self.ensure_message_start(&mut out);
            self.apply_event(&event, &mut out);
        }
        (out, false)
    }

    /// 流结束：补发 message_start（如仍未发出）、按索引升序
    /// 关闭残留块、发出 message_delta 与 message_stop
    pub fn finalize(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        self.ensure_message_start(&mut out);

        let open: Vec<usize> = self.open_blocks.iter().copied().collect();
        for index in open {
            self.open_blocks.remove(&index);
            out.push(content_block_stop_event(index));
        }

        out.push(message_delta_event(self.stop_reason, self.output_tokens));
        out.push(message_stop_event());
        out
    }

    fn ensure_message_start(&mut self, out: &mut Vec<String>) {
        if self.message_opened {
            return;
        }
        self.message_opened = true;
        out.push(message_start_event(&self.message_id, &self.spoof_model));
    }

    fn apply_event(&mut self, event: &Value, out: &mut Vec<String>) {
        let event_type = event.get("type").and_then(Value::as_str).unwrap_or("");
        match event_type {
            "response.created" => {
                if let Some(id) = event
                    .get("response")
                    .and_then(|r| r.get("id"))
                    .and_then(Value::as_str)
                {
                    if !id.is_empty() {
                        self.message_id = id.to_string();
                    }
                }
            }
            "response.content_part.added" => {
                let part_type = event
                    .get("part")
                    .and_then(|p| p.get("type"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if part_type != "output_text" {
                    return;
                }
                let key = text_key(event);
                let index = self.open_block(out, None);
                self.text_blocks.insert(key, index);
            }
            "response.output_text.delta" => {
                let key = text_key(event);
                let index = match self.text_blocks.get(&key) {
                    Some(i) => *i,
                    None => {
                        let i = self.open_block(out, None);
                        self.text_blocks.insert(key, i);
                        i
                    }
                };
                let delta = event.get("delta").and_then(Value::as_str).unwrap_or("");
                if delta.is_empty() {
                    return;
                }
                out.push(text_delta_event(index, delta));
            }
            "response.output_text.done" => {
                let key = text_key(event);
                let Some(&index) = self.text_blocks.get(&key) else {
                    return;
                };
                self.open_blocks.remove(&index);
                out.push(content_block_stop_event(index));
            }
            "response.output_item.added" => {
                let Some(item) = event.get("item") else {
                    return;
                };
                if item.get("type").and_then(Value::as_str) != Some("function_call") {
                    return;
                }
                let output_index = output_index(event);
                let mut call_id = item
                    .get("call_id")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                if call_id.is_empty() {
                    call_id = format!("toolu_{}", unix_nanos());
                }
                let name = item.get("name").and_then(Value::as_str).unwrap_or("");
                let index = self.open_block(out, Some((call_id, name.to_string())));
                self.tool_blocks.insert(output_index, index);
            }
            "response.function_call_arguments.delta" => {
                let output_index = output_index(event);
                let index = match self.tool_blocks.get(&output_index) {
                    Some(i) => *i,
                    None => {
                        // 未见 output_item.added 的孤儿增量：补占位块
                        let id = format!("toolu_{}", unix_nanos());
                        let i = self.open_block(out, Some((id, "unknown".to_string())));
                        self.tool_blocks.insert(output_index, i);
                        i
                    }
                };
                let delta = event.get("delta").and_then(Value::as_str).unwrap_or("");
                if delta.is_empty() {
                    return;
                }
                out.push(input_json_delta_event(index, delta));
            }
            "response.function_call_arguments.done" => {
                let output_index = output_index(event);
                let Some(&index) = self.tool_blocks.get(&output_index) else {
                    return;
                };
                self.open_blocks.remove(&index);
                out.push(content_block_stop_event(index));
            }
            "response.completed" => self.apply_completed(event),
            _ => {}
        }
    }

    /// `response.completed`：更新 stop_reason 与 output_tokens
    fn apply_completed(&mut self, event: &Value) {
        let Some(resp) = event.get("response") else {
            return;
        };

        if let Some(tokens) = resp
            .get("usage")
            .and_then(|u| u.get("output_tokens"))
            .and_then(Value::as_i64)
        {
            self.output_tokens = tokens;
        }

        self.stop_reason = "end_turn";
        if resp.get("status").and_then(Value::as_str) == Some("incomplete")
            && resp
                .get("status_details")
                .and_then(|d| d.get("reason"))
                .and_then(Value::as_str)
                == Some("max_output_tokens")
        {
            self.stop_reason = "max_tokens";
        }
        if let Some(output) = resp.get("output").and_then(Value::as_array) {
            if output
                .iter()
                .any(|item| item.get("type").and_then(Value::as_str) == Some("function_call"))
            {
                self.stop_reason = "tool_use";
            }
        }
    }

    fn open_block(&mut self, out: &mut Vec<String>, tool: Option<(String, String)>) -> usize {
        let index = self.next_block_index;
        self.next_block_index += 1;
        self.open_blocks.insert(index);
        match tool {
            Some((id, name)) => out.push(content_block_start_tool(index, &id, &name)),
            None => out.push(content_block_start_text(index)),
        }
        index
    }
}

fn output_index(event: &Value) -> i64 {
    event
        .get("output_index")
        .and_then(Value::as_i64)
        .unwrap_or(-1)
}

/// 文本块键：content_index 缺失时记 -1
///
/// 同一上游混用带与不带 content_index 的事件时会各开一个块，
/// 不做合并。
fn text_key(event: &Value) -> (i64, i64) {
    let content_index = event
        .get("content_index")
        .and_then(Value::as_i64)
        .unwrap_or(-1);
    (output_index(event), content_index)
}

/// 非流式桥接收集器
///
/// 排空 responses SSE 流，只保留 `response.completed` 事件携带的
/// response 对象。
#[derive(Debug, Default)]
pub struct ResponsesCompletedCollector {
    response_json: Option<Vec<u8>>,
}

impl ResponsesCompletedCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 消费一条 data 负载
    pub fn process_data(&mut self, data: &str) {
        let data = data.trim();
        if data.is_empty() || data == "[DONE]" {
            return;
        }
        let Ok(event) = serde_json::from_str::<Value>(data) else {
            return;
        };
        if event.get("type").and_then(Value::as_str) != Some("response.completed") {
            return;
        }
        if let Some(resp) = event.get("response") {
            if let Ok(bytes) = serde_json::to_vec(resp) {
                self.response_json = Some(bytes);
            }
        }
    }

    /// 取出捕获的 response JSON；整条流里没有 `response.completed`
    /// 时报错
    pub fn into_response_json(self) -> Result<Vec<u8>, ProxyError> {
        self.response_json.ok_or_else(|| {
            ProxyError::BadGateway(
                "no response.completed event received from upstream stream".into(),
            )
        })
    }
}
