//! 路由模块
//!
//! 从请求文本中提取 `@route:` / `@model:` / `@reasoning:` 标记，
//! 按「system → 各消息顺序 → 配置默认值」的优先级解析出
//! (Provider 名, Provider 配置, 模型名, 推理强度)。

mod markers;
mod resolve;

pub use markers::{extract_model_name, extract_reasoning_effort, extract_route_name};
pub use resolve::{
    is_valid_reasoning_effort, normalize_reasoning_effort, resolve_model_name, resolve_provider,
    resolve_provider_and_model, resolve_reasoning_effort,
};

#[cfg(test)]
mod tests;
