//! 增量 SSE 读取器
//!
//! 把字节流按行解析为 `(事件名, data)` 对：
//!
//! - 行终止符为 `\n`，行尾的 `\r` 被剥掉
//! - 以 `:` 开头的行是注释，忽略
//! - 冒号前为字段名，冒号后为值，值的单个前导空格被剥掉；
//!   只识别 `event` 与 `data` 字段，其余忽略
//! - 空行触发分发：把累积的 data 行用 `\n` 连接后交给调用方
//! - EOF 时冲刷最后一次未分发的事件
//!
//! `[DONE]` 之类的结束信号由调用方判定，读取器本身不感知。

/// 一次分发出的 SSE 事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` 字段，可能为空
    pub event: String,
    /// 各 `data:` 行以 `\n` 连接后的值
    pub data: String,
}

/// 增量 SSE 解析器
///
/// 按到达顺序喂入任意切分的字节块，跨块的行会被正确缓冲。
#[derive(Debug, Default)]
pub struct SseParser {
    line_buf: Vec<u8>,
    event_name: String,
    data_lines: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// 喂入一块字节，返回本块解析出的完整事件
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut out = Vec::new();
        for &b in chunk {
            if b == b'\n' {
                let raw = std::mem::take(&mut self.line_buf);
                let line = String::from_utf8_lossy(&raw);
                let line = line.strip_suffix('\r').unwrap_or(&line);
                self.handle_line(line, &mut out);
            } else {
                self.line_buf.push(b);
            }
        }
        out
    }

    /// 流结束：处理无终止换行的残留行并冲刷未分发事件
    pub fn finish(&mut self) -> Option<SseEvent> {
        if !self.line_buf.is_empty() {
            let raw = std::mem::take(&mut self.line_buf);
            let line = String::from_utf8_lossy(&raw);
            let line = line.strip_suffix('\r').unwrap_or(&line);
            // 残留行不可能是空行，处理后不会触发分发
            let mut sink = Vec::new();
            self.handle_line(line, &mut sink);
        }
        self.dispatch()
    }

    fn handle_line(&mut self, line: &str, out: &mut Vec<SseEvent>) {
        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                out.push(event);
            }
            return;
        }
        if line.starts_with(':') {
            return;
        }
        let Some(i) = line.find(':') else {
            return;
        };
        let field = &line[..i];
        let mut value = &line[i + 1..];
        if let Some(stripped) = value.strip_prefix(' ') {
            value = stripped;
        }
        match field {
            "event" => self.event_name = value.to_string(),
            "data" => self.data_lines.push(value.to_string()),
            _ => {}
        }
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data_lines.is_empty() {
            self.event_name.clear();
            return None;
        }
        let data = self.data_lines.join("\n");
        self.data_lines.clear();
        let event = std::mem::take(&mut self.event_name);
        Some(SseEvent { event, data })
    }
}
