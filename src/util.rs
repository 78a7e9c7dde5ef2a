//! 杂项工具函数

/// 当前时刻的 Unix 纳秒时间戳
///
/// 用于生成 `msg_` / `toolu_` / `req_` 等请求内唯一标识。
pub fn unix_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
}

/// 截断过长的日志内容
///
/// 截断点回退到最近的 UTF-8 字符边界。
pub fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut idx = max_len;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    format!("{}...(truncated)", &s[..idx])
}

/// 日志占位：空白字段显示为 `-`
pub fn dash(s: &str) -> &str {
    let t = s.trim();
    if t.is_empty() {
        "-"
    } else {
        t
    }
}
