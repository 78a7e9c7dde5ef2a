//! 边缘请求处理
//!
//! `/v1/messages` 的处理流程：解析请求体 → 解析路由与模型 →
//! （chatgpt 类型再解析推理强度）→ 按 Provider 类型分发到
//! 对应的转换器与上游调用。

use crate::config::{
    ProviderConfig, PROVIDER_TYPE_CHATGPT, PROVIDER_TYPE_OPENAI, PROVIDER_TYPE_PASSTHROUGH,
};
use crate::error::{error_response, ProxyError};
use crate::models::anthropic::{
    AnthropicMessage, AnthropicMessageRequest, CountTokensRequest, CountTokensResponse,
};
use crate::models::openai::OpenAiChatResponse;
use crate::router::{resolve_provider, resolve_provider_and_model, resolve_reasoning_effort};
use crate::server::passthrough::proxy_passthrough;
use crate::server::AppState;
use crate::stream::{
    OpenAiStreamTranslator, ResponsesCompletedCollector, ResponsesStreamTranslator, SseParser,
};
use crate::translator::content::{normalize_content_text, normalize_system_text};
use crate::translator::openai::{
    convert_openai_nonstream_to_anthropic, translate_anthropic_to_openai,
};
use crate::translator::responses::{
    convert_responses_json_to_anthropic, translate_anthropic_to_responses,
};
use crate::upstream::do_provider_request;
use crate::util::{truncate_for_log, unix_nanos};
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;

/// GET /health
pub async fn handle_health() -> Response {
    Json(serde_json::json!({"ok": true, "name": "furiwake"})).into_response()
}

/// 路由已匹配但方法不符时的兜底
pub async fn handle_method_not_allowed() -> Response {
    ProxyError::MethodNotAllowed.into_response()
}

/// POST /v1/messages
pub async fn handle_messages(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let anthropic_req: AnthropicMessageRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid JSON"),
    };

    let (provider_name, provider, model) =
        match resolve_provider_and_model(&anthropic_req.system, &anthropic_req.messages, &state.cfg)
        {
            Ok(resolved) => resolved,
            Err(e) => return e.into_response(),
        };
    let provider = provider.clone();

    let mut reasoning_effort = String::new();
    if provider.provider_type == PROVIDER_TYPE_CHATGPT {
        reasoning_effort = match resolve_reasoning_effort(
            &anthropic_req.system,
            &anthropic_req.messages,
            &provider.reasoning_effort,
        ) {
            Ok(effort) => effort,
            Err(e) => return e.into_response(),
        };
    }

    let request_id = incoming_request_id(&headers);
    tracing::info!(
        "req={} route={} type={} model={} reasoning={} stream={}",
        request_id,
        provider_name,
        provider.provider_type,
        model,
        crate::util::dash(&reasoning_effort),
        anthropic_req.stream,
    );

    match provider.provider_type.as_str() {
        PROVIDER_TYPE_PASSTHROUGH => {
            proxy_passthrough(
                &state,
                Method::POST,
                &uri,
                &headers,
                &request_id,
                &provider_name,
                &model,
                "",
                &provider,
                body,
            )
            .await
        }
        PROVIDER_TYPE_OPENAI => {
            proxy_openai(
                &state,
                &request_id,
                &provider_name,
                &provider,
                &model,
                &anthropic_req,
            )
            .await
        }
        PROVIDER_TYPE_CHATGPT => {
            proxy_chatgpt(
                &state,
                &request_id,
                &provider_name,
                &provider,
                &model,
                &reasoning_effort,
                &anthropic_req,
            )
            .await
        }
        _ => error_response(StatusCode::BAD_GATEWAY, "unsupported provider type"),
    }
}

/// POST /v1/messages/count_tokens
///
/// 路由只看 system（不扫消息）。passthrough 的 Provider 原样转发，
/// 其余走本地的粗略估算。
pub async fn handle_count_tokens(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let req: CountTokensRequest = match serde_json::from_slice(&body) {
        Ok(req) => req,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "invalid JSON"),
    };

    let (provider_name, provider) = match resolve_provider(&req.system, &[], &state.cfg) {
        Ok(resolved) => resolved,
        Err(e) => return e.into_response(),
    };
    let provider = provider.clone();

    if provider.provider_type == PROVIDER_TYPE_PASSTHROUGH {
        let request_id = incoming_request_id(&headers);
        tracing::debug!(
            "req={} count_tokens passthrough route={}",
            request_id,
            provider_name,
        );
        return proxy_passthrough(
            &state,
            Method::POST,
            &uri,
            &headers,
            &request_id,
            &provider_name,
            "",
            "",
            &provider,
            body,
        )
        .await;
    }

    let input_tokens = estimate_input_tokens(&req.system, &req.messages);
    Json(CountTokensResponse { input_tokens }).into_response()
}

/// openai 类型：请求转换 → 上游调用 → 响应转换
async fn proxy_openai(
    state: &AppState,
    request_id: &str,
    route_name: &str,
    provider: &ProviderConfig,
    model: &str,
    anthropic_req: &AnthropicMessageRequest,
) -> Response {
    let openai_req = translate_anthropic_to_openai(anthropic_req, model);
    let payload = match serde_json::to_vec(&openai_req) {
        Ok(p) => p,
        Err(_) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode upstream request",
            )
        }
    };

    let resp = match do_provider_request(
        &state.client,
        reqwest::Method::POST,
        &provider.url,
        payload,
        request_id,
        provider,
        anthropic_req.stream,
        route_name,
        &openai_req.model,
        "",
    )
    .await
    {
        Ok(resp) => resp,
        Err(e) => return e.into_response(),
    };

    if resp.status().as_u16() >= 400 {
        return forward_upstream_error(resp).await;
    }

    if anthropic_req.stream {
        return stream_openai_response(resp, &state.cfg.spoof_model);
    }

    let raw = match resp.bytes().await {
        Ok(raw) => raw,
        Err(_) => {
            return error_response(StatusCode::BAD_GATEWAY, "failed to read upstream response")
        }
    };
    let openai_resp: OpenAiChatResponse = match serde_json::from_slice(&raw) {
        Ok(r) => r,
        Err(_) => {
            return error_response(StatusCode::BAD_GATEWAY, "invalid upstream JSON response")
        }
    };
    Json(convert_openai_nonstream_to_anthropic(
        &openai_resp,
        &state.cfg.spoof_model,
    ))
    .into_response()
}

/// chatgpt 类型：上游要求所有请求 stream=true，非流式调用
/// 在本地收集 SSE 流后合成一个 JSON 响应
async fn proxy_chatgpt(
    state: &AppState,
    request_id: &str,
    route_name: &str,
    provider: &ProviderConfig,
    model: &str,
    reasoning_effort: &str,
    anthropic_req: &AnthropicMessageRequest,
) -> Response {
    let mut responses_req =
        translate_anthropic_to_responses(anthropic_req, model, reasoning_effort);
    responses_req.stream = true;
    let payload = match serde_json::to_vec(&responses_req) {
        Ok(p) => p,
        Err(_) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to encode upstream request",
            )
        }
    };

    tracing::debug!(
        "[CODEX-REQ] payload={}",
        truncate_for_log(&String::from_utf8_lossy(&payload), 2000),
    );

    let resp = match do_provider_request(
        &state.client,
        reqwest::Method::POST,
        &provider.url,
        payload,
        request_id,
        provider,
        true,
        route_name,
        &responses_req.model,
        reasoning_effort,
    )
    .await
    {
        Ok(resp) => resp,
        Err(e) => return e.into_response(),
    };

    if resp.status().as_u16() >= 400 {
        return forward_upstream_error(resp).await;
    }

    if anthropic_req.stream {
        return stream_responses_response(resp, &state.cfg.spoof_model);
    }

    // 非流式桥接：排空上游流，取 response.completed 的 response 对象
    let mut parser = SseParser::new();
    let mut collector = ResponsesCompletedCollector::new();
    let mut upstream = resp.bytes_stream();
    while let Some(chunk) = upstream.next().await {
        match chunk {
            Ok(bytes) => {
                for event in parser.feed(&bytes) {
                    tracing::debug!(
                        "[CODEX-SSE-COLLECT] data={}",
                        truncate_for_log(&event.data, 500),
                    );
                    collector.process_data(&event.data);
                }
            }
            Err(e) => {
                return error_response(
                    StatusCode::BAD_GATEWAY,
                    &format!("failed to collect upstream stream: {e}"),
                );
            }
        }
    }
    if let Some(event) = parser.finish() {
        collector.process_data(&event.data);
    }

    let raw = match collector.into_response_json() {
        Ok(raw) => raw,
        Err(e) => {
            return error_response(
                StatusCode::BAD_GATEWAY,
                &format!("failed to collect upstream stream: {e}"),
            )
        }
    };
    Json(convert_responses_json_to_anthropic(
        &raw,
        &state.cfg.spoof_model,
    ))
    .into_response()
}

/// OpenAI SSE → Anthropic SSE 的流式响应体
fn stream_openai_response(resp: reqwest::Response, spoof_model: &str) -> Response {
    let translator = OpenAiStreamTranslator::new(spoof_model);
    let upstream = resp.bytes_stream();

    let body_stream = async_stream::stream! {
        let mut translator = translator;
        let mut upstream = upstream;
        let mut parser = SseParser::new();
        yield Ok::<Bytes, std::io::Error>(Bytes::from(translator.message_start()));

        'outer: while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in parser.feed(&bytes) {
                        let (events, done) = translator.process_data(&event.data);
                        for e in events {
                            yield Ok(Bytes::from(e));
                        }
                        if done {
                            break 'outer;
                        }
                    }
                }
                Err(e) => {
                    // 截断流，仍然尝试收尾
                    tracing::error!("openai stream translation failed: {e}");
                    break 'outer;
                }
            }
        }
        if let Some(event) = parser.finish() {
            let (events, _) = translator.process_data(&event.data);
            for e in events {
                yield Ok(Bytes::from(e));
            }
        }
        for e in translator.finalize() {
            yield Ok(Bytes::from(e));
        }
    };

    sse_response(Body::from_stream(body_stream))
}

/// responses SSE → Anthropic SSE 的流式响应体
fn stream_responses_response(resp: reqwest::Response, spoof_model: &str) -> Response {
    let translator = ResponsesStreamTranslator::new(spoof_model);
    let upstream = resp.bytes_stream();

    let body_stream = async_stream::stream! {
        let mut translator = translator;
        let mut upstream = upstream;
        let mut parser = SseParser::new();

        'outer: while let Some(chunk) = upstream.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in parser.feed(&bytes) {
                        tracing::debug!(
                            "[CODEX-SSE] event={} data={}",
                            event.event,
                            truncate_for_log(&event.data, 500),
                        );
                        let (events, done) = translator.process_data(&event.data);
                        for e in events {
                            yield Ok::<Bytes, std::io::Error>(Bytes::from(e));
                        }
                        if done {
                            break 'outer;
                        }
                    }
                }
                Err(e) => {
                    tracing::error!("responses stream translation failed: {e}");
                    break 'outer;
                }
            }
        }
        if let Some(event) = parser.finish() {
            let (events, _) = translator.process_data(&event.data);
            for e in events {
                yield Ok(Bytes::from(e));
            }
        }
        for e in translator.finalize() {
            yield Ok(Bytes::from(e));
        }
    };

    sse_response(Body::from_stream(body_stream))
}

/// 上游状态 ≥ 400：转发状态码，响应体文本包进错误信封
async fn forward_upstream_error(resp: reqwest::Response) -> Response {
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let raw = resp.bytes().await.unwrap_or_default();
    error_response(status, &String::from_utf8_lossy(&raw))
}

fn sse_response(body: Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no")
        .body(body)
        .unwrap_or_else(|_| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to build stream response",
            )
        })
}

/// 取 `x-request-id`，缺失时生成 `req_<纳秒>`
fn incoming_request_id(headers: &HeaderMap) -> String {
    headers
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("req_{}", unix_nanos()))
}

/// 输入 token 粗估：system 与全部消息文本的码点数 / 4，下限 1
fn estimate_input_tokens(system: &Value, messages: &[AnthropicMessage]) -> i64 {
    let mut total_chars = normalize_system_text(system).chars().count();
    for msg in messages {
        total_chars += normalize_content_text(&msg.content).chars().count();
    }
    let estimated = (total_chars / 4) as i64;
    estimated.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_estimate_input_tokens_floor() {
        // 空请求也至少返回 1
        assert_eq!(estimate_input_tokens(&Value::Null, &[]), 1);
    }

    #[test]
    fn test_estimate_input_tokens_counts_codepoints() {
        let messages = vec![AnthropicMessage {
            role: "user".into(),
            content: json!("abcd".repeat(10)),
        }];
        // 40 码点 / 4 = 10
        assert_eq!(estimate_input_tokens(&Value::Null, &messages), 10);

        // 多字节字符按码点计数
        let messages = vec![AnthropicMessage {
            role: "user".into(),
            content: json!("字".repeat(8)),
        }];
        assert_eq!(estimate_input_tokens(&Value::Null, &messages), 2);
    }

    #[test]
    fn test_estimate_includes_system() {
        let messages = vec![AnthropicMessage {
            role: "user".into(),
            content: json!("aaaa"),
        }];
        assert_eq!(estimate_input_tokens(&json!("bbbb"), &messages), 2);
    }
}
