//! passthrough 转发
//!
//! 上游本身就说 Anthropic 方言：附加认证后按原样转发请求字节，
//! 响应的状态、响应头与正文也按原样流回客户端。

use crate::config::ProviderConfig;
use crate::error::{error_response, ProxyError};
use crate::server::AppState;
use crate::util::dash;
use axum::body::Body;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::Response;
use bytes::Bytes;
use futures::TryStreamExt;

/// 把请求原样转发给 passthrough 类型的 Provider
#[allow(clippy::too_many_arguments)]
pub async fn proxy_passthrough(
    state: &AppState,
    method: Method,
    uri: &Uri,
    headers: &HeaderMap,
    request_id: &str,
    route_name: &str,
    model_name: &str,
    reasoning_effort: &str,
    provider: &ProviderConfig,
    body: Bytes,
) -> Response {
    let target_url = match join_url(&provider.url, uri.path(), uri.query()) {
        Ok(url) => url,
        Err(e) => return error_response(StatusCode::BAD_GATEWAY, &e.to_string()),
    };

    let reqwest_method = match reqwest::Method::from_bytes(method.as_str().as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to create relay request",
            )
        }
    };

    let mut builder = state.client.request(reqwest_method, &target_url).body(body);
    for (name, value) in headers {
        if name == axum::http::header::HOST {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_bytes());
    }
    if !request_id.trim().is_empty() {
        builder = builder.header("x-request-id", request_id.trim());
    }
    builder = match crate::upstream::apply_provider_auth(builder, provider) {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_GATEWAY, &e.to_string()),
    };

    tracing::info!(
        "[HTTP-OUT] req={} route={} model={} reasoning={} {} {}",
        dash(request_id),
        dash(route_name),
        dash(model_name),
        dash(reasoning_effort),
        method,
        target_url,
    );

    let resp = match builder.send().await {
        Ok(resp) => resp,
        Err(e) => {
            let err = ProxyError::from(e);
            let status = err.status_code();
            return error_response(status, &format!("relay failed: {err}"));
        }
    };

    relay_response(resp)
}

/// 把上游响应原样流回客户端
fn relay_response(resp: reqwest::Response) -> Response {
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = Response::builder().status(status);
    for (name, value) in resp.headers() {
        builder = builder.header(name.as_str(), value.as_bytes());
    }

    let body_stream = resp
        .bytes_stream()
        .map_err(|e| std::io::Error::other(e.to_string()));
    builder
        .body(Body::from_stream(body_stream))
        .unwrap_or_else(|_| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to build relay response",
            )
        })
}

/// 拼接上游 URL：基址路径去掉尾部 `/` 后接原始路径与查询串
pub fn join_url(base_url: &str, path: &str, query: Option<&str>) -> Result<String, ProxyError> {
    let mut url = reqwest::Url::parse(base_url)
        .map_err(|e| ProxyError::BadGateway(format!("invalid provider url: {e}")))?;
    let joined = format!("{}{}", url.path().trim_end_matches('/'), path);
    url.set_path(&joined);
    url.set_query(query);
    Ok(url.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://api.example.com", "/v1/messages", None).unwrap(),
            "https://api.example.com/v1/messages"
        );
        // 基址尾部的斜杠被剥掉
        assert_eq!(
            join_url("https://api.example.com/base/", "/v1/messages", Some("beta=true")).unwrap(),
            "https://api.example.com/base/v1/messages?beta=true"
        );
    }

    #[test]
    fn test_join_url_invalid_base() {
        let err = join_url("::notaurl::", "/v1/messages", None).unwrap_err();
        assert!(err.to_string().contains("invalid provider url"));
    }
}
