//! 带重试的上游请求
//!
//! 最多 6 次尝试（首次 + 5 次重试）。非超时的传输错误与 429
//! 状态触发重试，退避为 `250ms · 2^attempt`；超时立即上抛，
//! 其余状态（包括其他 5xx）原样返回给调用方。客户端断开会使
//! 整个请求 future 被丢弃，因此不会在取消后继续尝试或退避。

use crate::config::ProviderConfig;
use crate::error::ProxyError;
use crate::upstream::auth::apply_provider_auth;
use crate::util::dash;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use std::time::Duration;

/// 最大重试次数（不含首次尝试）
pub const MAX_RETRY_COUNT: u32 = 5;

/// 第 attempt 次失败后的退避时长
pub fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_millis(250) * 2u32.saturating_pow(attempt)
}

/// 发出上游请求，失败时按策略重试
///
/// 每次尝试都重新附加认证（codex 凭证文件每次重读）并记录
/// 一条 `[HTTP-OUT]` 日志。
#[allow(clippy::too_many_arguments)]
pub async fn do_provider_request(
    client: &reqwest::Client,
    method: reqwest::Method,
    target_url: &str,
    payload: Vec<u8>,
    request_id: &str,
    provider: &ProviderConfig,
    stream: bool,
    route_name: &str,
    model_name: &str,
    reasoning_effort: &str,
) -> Result<reqwest::Response, ProxyError> {
    let accept = if stream {
        "text/event-stream"
    } else {
        "application/json"
    };

    let mut last_err: Option<ProxyError> = None;
    for attempt in 0..=MAX_RETRY_COUNT {
        let mut builder = client
            .request(method.clone(), target_url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, accept)
            .body(payload.clone());
        if !request_id.trim().is_empty() {
            builder = builder.header("x-request-id", request_id.trim());
        }
        builder = apply_provider_auth(builder, provider)?;

        tracing::info!(
            "[HTTP-OUT] req={} route={} model={} reasoning={} {} {}",
            dash(request_id),
            dash(route_name),
            dash(model_name),
            dash(reasoning_effort),
            method,
            target_url,
        );

        match builder.send().await {
            Ok(resp) => {
                if resp.status() == StatusCode::TOO_MANY_REQUESTS && attempt < MAX_RETRY_COUNT {
                    last_err = Some(ProxyError::BadGateway(format!(
                        "upstream returned status {}",
                        resp.status().as_u16()
                    )));
                    // 进入下一次尝试前排空并关闭响应体
                    let _ = resp.bytes().await;
                    tokio::time::sleep(backoff_duration(attempt)).await;
                    continue;
                }
                return Ok(resp);
            }
            Err(e) => {
                let err = ProxyError::from(e);
                // 超时属于 deadline 一类，立即上抛不重试
                let timed_out = matches!(err, ProxyError::Transport { timeout: true, .. });
                if timed_out || attempt == MAX_RETRY_COUNT {
                    return Err(err);
                }
                last_err = Some(err);
                tokio::time::sleep(backoff_duration(attempt)).await;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| ProxyError::Internal("retry attempts exhausted".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_schedule() {
        // 250ms · 2^attempt
        assert_eq!(backoff_duration(0), Duration::from_millis(250));
        assert_eq!(backoff_duration(1), Duration::from_millis(500));
        assert_eq!(backoff_duration(2), Duration::from_millis(1000));
        assert_eq!(backoff_duration(3), Duration::from_millis(2000));
        assert_eq!(backoff_duration(4), Duration::from_millis(4000));
    }

    #[test]
    fn test_max_retry_count() {
        // 总尝试次数不超过 6
        assert_eq!(MAX_RETRY_COUNT, 5);
    }
}
