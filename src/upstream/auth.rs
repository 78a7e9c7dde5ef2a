//! Provider 认证
//!
//! - `none`: 不加头
//! - `bearer`: 从 `token_env` 命名的环境变量读 token
//! - `codex`: 每次请求都重读 `~/.codex/auth.json`（不缓存，
//!   文件可能被其他进程随时改写），取 `tokens.access_token` 与
//!   `tokens.account_id`；取不到时在整个 JSON 里递归找第一个
//!   token 形状的值

use crate::config::{ProviderConfig, AUTH_TYPE_BEARER, AUTH_TYPE_CODEX, AUTH_TYPE_NONE};
use crate::error::ProxyError;
use serde_json::Value;
use std::path::{Path, PathBuf};

const CODEX_USER_AGENT: &str = "codex-cli/1.0";

/// codex 凭证
#[derive(Debug, Clone, Default)]
pub struct CodexCredentials {
    pub token: String,
    pub account_id: String,
}

/// 按 Provider 配置给请求附加认证头
pub fn apply_provider_auth(
    builder: reqwest::RequestBuilder,
    provider: &ProviderConfig,
) -> Result<reqwest::RequestBuilder, ProxyError> {
    let auth_type = if provider.auth.auth_type.is_empty() {
        AUTH_TYPE_NONE
    } else {
        provider.auth.auth_type.as_str()
    };

    match auth_type {
        AUTH_TYPE_NONE => Ok(builder),
        AUTH_TYPE_BEARER => {
            let token_env = &provider.auth.token_env;
            if token_env.is_empty() {
                return Err(ProxyError::Auth("bearer auth requires token_env".into()));
            }
            let token = std::env::var(token_env).unwrap_or_default().trim().to_string();
            if token.is_empty() {
                return Err(ProxyError::Auth(format!(
                    "bearer auth env {token_env} is empty"
                )));
            }
            Ok(builder.header("Authorization", format!("Bearer {token}")))
        }
        AUTH_TYPE_CODEX => {
            let creds = load_codex_credentials()?;
            let mut builder =
                builder.header("Authorization", format!("Bearer {}", creds.token));
            if !creds.account_id.is_empty() {
                builder = builder.header("Chatgpt-Account-Id", creds.account_id);
            }
            Ok(builder.header("User-Agent", CODEX_USER_AGENT))
        }
        other => Err(ProxyError::Auth(format!("unsupported auth type: {other}"))),
    }
}

/// 从 `<home>/.codex/auth.json` 加载 codex 凭证
pub fn load_codex_credentials() -> Result<CodexCredentials, ProxyError> {
    load_codex_credentials_from(&codex_auth_path()?)
}

fn codex_auth_path() -> Result<PathBuf, ProxyError> {
    let home = std::env::var_os("HOME")
        .map(PathBuf::from)
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| ProxyError::Auth("failed to resolve home dir".into()))?;
    Ok(home.join(".codex").join("auth.json"))
}

/// 从指定路径加载 codex 凭证
pub fn load_codex_credentials_from(path: &Path) -> Result<CodexCredentials, ProxyError> {
    let bytes = std::fs::read(path)
        .map_err(|e| ProxyError::Auth(format!("failed to read codex auth file: {e}")))?;
    let payload: Value = serde_json::from_slice(&bytes)
        .map_err(|e| ProxyError::Auth(format!("invalid codex auth file: {e}")))?;

    let mut creds = CodexCredentials::default();

    if let Some(tokens) = payload.get("tokens") {
        if let Some(v) = tokens.get("access_token").and_then(Value::as_str) {
            creds.token = v.trim().to_string();
        }
        if let Some(v) = tokens.get("account_id").and_then(Value::as_str) {
            creds.account_id = v.trim().to_string();
        }
    }

    if creds.token.is_empty() {
        creds.token = find_token_recursive(&payload).unwrap_or_default();
    }
    if creds.token.is_empty() {
        return Err(ProxyError::Auth(
            "codex auth file does not contain token".into(),
        ));
    }
    Ok(creds)
}

/// 在任意 JSON 结构里递归找 token
///
/// 对象优先按 access_token / id_token / token / api_key 取值，
/// 其次递归子值；纯字符串按 JWT 形状判定（恰好两个 `.` 且
/// 长度大于 20）。
fn find_token_recursive(v: &Value) -> Option<String> {
    match v {
        Value::Object(map) => {
            for key in ["access_token", "id_token", "token", "api_key"] {
                if let Some(s) = map.get(key).and_then(Value::as_str) {
                    if !s.trim().is_empty() {
                        return Some(s.trim().to_string());
                    }
                }
            }
            map.values().find_map(find_token_recursive)
        }
        Value::Array(items) => items.iter().find_map(find_token_recursive),
        Value::String(s) => {
            if s.matches('.').count() == 2 && s.len() > 20 {
                Some(s.trim().to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;
    use std::io::Write;

    fn write_auth_file(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("auth.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_bearer_requires_token_env() {
        let provider = ProviderConfig {
            auth: AuthConfig {
                auth_type: "bearer".into(),
                token_env: String::new(),
            },
            ..Default::default()
        };
        let client = reqwest::Client::new();
        let err = apply_provider_auth(client.get("http://x"), &provider).unwrap_err();
        assert!(err.to_string().contains("bearer auth requires token_env"));
    }

    #[test]
    fn test_bearer_empty_env_fails() {
        let provider = ProviderConfig {
            auth: AuthConfig {
                auth_type: "bearer".into(),
                token_env: "FURIWAKE_TEST_EMPTY_TOKEN".into(),
            },
            ..Default::default()
        };
        std::env::set_var("FURIWAKE_TEST_EMPTY_TOKEN", "   ");
        let client = reqwest::Client::new();
        let err = apply_provider_auth(client.get("http://x"), &provider).unwrap_err();
        assert!(err
            .to_string()
            .contains("bearer auth env FURIWAKE_TEST_EMPTY_TOKEN is empty"));
    }

    #[test]
    fn test_codex_tokens_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_auth_file(
            &dir,
            r#"{"tokens":{"access_token":" tok_123 ","account_id":"acc_9"}}"#,
        );
        let creds = load_codex_credentials_from(&path).unwrap();
        assert_eq!(creds.token, "tok_123");
        assert_eq!(creds.account_id, "acc_9");
    }

    #[test]
    fn test_codex_recursive_key_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_auth_file(&dir, r#"{"nested":{"deeper":{"id_token":"fallback_tok"}}}"#);
        let creds = load_codex_credentials_from(&path).unwrap();
        assert_eq!(creds.token, "fallback_tok");
        assert_eq!(creds.account_id, "");
    }

    #[test]
    fn test_codex_jwt_shaped_string_fallback() {
        // 恰好两个点且长度大于 20 的字符串按 JWT 处理
        let dir = tempfile::tempdir().unwrap();
        let path = write_auth_file(
            &dir,
            r#"{"blobs":["short.x.y","eyJhbGciOi.eyJzdWIiOi.c2lnbmF0dXJl"]}"#,
        );
        let creds = load_codex_credentials_from(&path).unwrap();
        assert_eq!(creds.token, "eyJhbGciOi.eyJzdWIiOi.c2lnbmF0dXJl");
    }

    #[test]
    fn test_codex_missing_token_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_auth_file(&dir, r#"{"tokens":{"account_id":"acc"}}"#);
        let err = load_codex_credentials_from(&path).unwrap_err();
        assert!(err
            .to_string()
            .contains("codex auth file does not contain token"));
    }

    #[test]
    fn test_codex_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_auth_file(&dir, "{broken");
        let err = load_codex_credentials_from(&path).unwrap_err();
        assert!(err.to_string().contains("invalid codex auth file"));

        let err = load_codex_credentials_from(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read codex auth file"));
    }
}
