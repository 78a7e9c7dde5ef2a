//! OpenAI 流式响应转换为 Anthropic SSE
//!
//! 有状态的事件生成器：逐条消费上游 SSE 的 data 负载，产出
//! Anthropic 方言的事件字符串。块索引是单调递增的计数器，
//! 关闭后不复用；流结束时残留的打开块按索引升序补发
//! `content_block_stop`。

use crate::models::openai::OpenAiChatStreamChunk;
use crate::stream::events::{
    content_block_start_text, content_block_start_tool, content_block_stop_event,
    input_json_delta_event, message_delta_event, message_start_event, message_stop_event,
    text_delta_event,
};
use crate::translator::openai::map_finish_reason;
use crate::util::unix_nanos;
use std::collections::{BTreeSet, HashMap};

/// 被跟踪的上游工具调用
#[derive(Debug, Clone)]
struct TrackedToolCall {
    anthropic_index: usize,
    #[allow(dead_code)]
    id: String,
    #[allow(dead_code)]
    name: String,
}

/// OpenAI delta 流 → Anthropic SSE 生成器
#[derive(Debug)]
pub struct OpenAiStreamTranslator {
    message_id: String,
    spoof_model: String,
    next_block_index: usize,
    active_text_index: Option<usize>,
    /// 上游工具调用 index → 跟踪状态
    active_tool_calls: HashMap<i64, TrackedToolCall>,
    /// 处于打开状态的 Anthropic 块索引
    open_blocks: BTreeSet<usize>,
    stop_reason: &'static str,
    output_tokens: i64,
}

impl OpenAiStreamTranslator {
    pub fn new(spoof_model: &str) -> Self {
        Self {
            message_id: format!("msg_{}", unix_nanos()),
            spoof_model: spoof_model.to_string(),
            next_block_index: 0,
            active_text_index: None,
            active_tool_calls: HashMap::new(),
            open_blocks: BTreeSet::new(),
            stop_reason: "end_turn",
            output_tokens: 0,
        }
    }

    /// 开头的 `message_start` 事件
    pub fn message_start(&self) -> String {
        message_start_event(&self.message_id, &self.spoof_model)
    }

    /// 消费一条上游 data 负载
    ///
    /// 返回 (产出的事件, 是否收到 `[DONE]`)。无法解析的 chunk
    /// 被静默跳过。
    pub fn process_data(&mut self, data: &str) -> (Vec<String>, bool) {
        let data = data.trim();
        if data.is_empty() {
            return (Vec::new(), false);
        }
        if data == "[DONE]" {
            return (Vec::new(), true);
        }

        let chunk: OpenAiChatStreamChunk = match serde_json::from_str(data) {
            Ok(c) => c,
            Err(_) => return (Vec::new(), false),
        };

        let mut events = Vec::new();

        if chunk.usage.completion_tokens > 0 {
            self.output_tokens = chunk.usage.completion_tokens;
        }
        let Some(choice) = chunk.choices.first() else {
            return (events, false);
        };

        if !choice.delta.content.is_empty() {
            let index = match self.active_text_index {
                Some(i) => i,
                None => {
                    let i = self.open_block(&mut events, None);
                    self.active_text_index = Some(i);
                    i
                }
            };
            events.push(text_delta_event(index, &choice.delta.content));
        }

        for tc in &choice.delta.tool_calls {
            let tool_index = tc.index;

            if !tc.id.is_empty() {
                // 新工具调用开始：先关掉打开的文本块
                if let Some(text_index) = self.active_text_index.take() {
                    self.close_block(text_index, &mut events);
                }
                let anthropic_index =
                    self.open_block(&mut events, Some((tc.id.clone(), tc.function.name.clone())));
                self.active_tool_calls.insert(
                    tool_index,
                    TrackedToolCall {
                        anthropic_index,
                        id: tc.id.clone(),
                        name: tc.function.name.clone(),
                    },
                );
            } else if !self.active_tool_calls.contains_key(&tool_index) {
                // 没见过 id 的孤儿增量：补一个占位 tool_use 块
                let id = format!("toolu_{}", unix_nanos());
                let name = if tc.function.name.is_empty() {
                    "unknown".to_string()
                } else {
                    tc.function.name.clone()
                };
                let anthropic_index =
                    self.open_block(&mut events, Some((id.clone(), name.clone())));
                self.active_tool_calls.insert(
                    tool_index,
                    TrackedToolCall {
                        anthropic_index,
                        id,
                        name,
                    },
                );
            }

            if !tc.function.arguments.is_empty() {
                if let Some(tracked) = self.active_tool_calls.get(&tool_index) {
                    events.push(input_json_delta_event(
                        tracked.anthropic_index,
                        &tc.function.arguments,
                    ));
                }
            }
        }

        if !choice.finish_reason.is_empty() {
            self.stop_reason = map_finish_reason(&choice.finish_reason);
        }
        (events, false)
    }

    /// 流结束：关闭残留块（文本块在前，工具块按索引升序），
    /// 随后发出 `message_delta` 与 `message_stop`
    pub fn finalize(&mut self) -> Vec<String> {
        let mut events = Vec::new();

        if let Some(text_index) = self.active_text_index.take() {
            self.close_block(text_index, &mut events);
        }
        let tool_indexes: BTreeSet<usize> = self
            .active_tool_calls
            .values()
            .map(|t| t.anthropic_index)
            .collect();
        for index in tool_indexes {
            self.close_block(index, &mut events);
        }

        events.push(message_delta_event(self.stop_reason, self.output_tokens));
        events.push(message_stop_event());
        events
    }

    /// 分配新块索引并发出对应的 content_block_start
    fn open_block(&mut self, events: &mut Vec<String>, tool: Option<(String, String)>) -> usize {
        let index = self.next_block_index;
        self.next_block_index += 1;
        self.open_blocks.insert(index);
        match tool {
            Some((id, name)) => events.push(content_block_start_tool(index, &id, &name)),
            None => events.push(content_block_start_text(index)),
        }
        index
    }

    fn close_block(&mut self, index: usize, events: &mut Vec<String>) {
        if self.open_blocks.remove(&index) {
            events.push(content_block_stop_event(index));
        }
    }
}


// ============================================================================
// 属性测试
// ============================================================================
