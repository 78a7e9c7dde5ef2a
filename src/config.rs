//! 配置加载与校验
//!
//! 从 YAML 文件加载代理配置。配置在启动时加载并校验，之后只读共享，
//! 进程生命周期内不再变更。校验失败时带字段路径报错
//! （例如 `providers.openai.url is required`）。

use crate::error::ProxyError;
use crate::router::{is_valid_reasoning_effort, normalize_reasoning_effort};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

pub const PROVIDER_TYPE_PASSTHROUGH: &str = "passthrough";
pub const PROVIDER_TYPE_OPENAI: &str = "openai";
pub const PROVIDER_TYPE_CHATGPT: &str = "chatgpt";

pub const AUTH_TYPE_NONE: &str = "none";
pub const AUTH_TYPE_BEARER: &str = "bearer";
pub const AUTH_TYPE_CODEX: &str = "codex";

/// 代理全局配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// 监听地址
    #[serde(default)]
    pub listen: String,
    /// 写入客户端响应的模型标签（与实际上游无关）
    #[serde(default)]
    pub spoof_model: String,
    /// 无 `@route:` 标记时使用的 Provider 名
    #[serde(default)]
    pub default_provider: String,
    /// 上游 HTTP 超时（秒）
    #[serde(default)]
    pub timeout_seconds: u64,
    /// Provider 列表
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// 单个上游 Provider 的配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderConfig {
    /// passthrough / openai / chatgpt
    #[serde(rename = "type", default)]
    pub provider_type: String,
    /// 上游地址
    #[serde(default)]
    pub url: String,
    /// 默认模型（passthrough 以外必填）
    #[serde(default)]
    pub model: String,
    /// 默认推理强度（仅 chatgpt 有意义）
    #[serde(default)]
    pub reasoning_effort: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Provider 认证配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// none / bearer / codex，缺省为 none
    #[serde(rename = "type", default)]
    pub auth_type: String,
    /// bearer 模式下存放 token 的环境变量名
    #[serde(default)]
    pub token_env: String,
}

impl Config {
    /// 从 YAML 文件加载并校验配置
    pub fn load(path: &Path) -> Result<Config, ProxyError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_yaml(&content)
    }

    /// 从 YAML 文本加载并校验配置
    pub fn from_yaml(content: &str) -> Result<Config, ProxyError> {
        let mut cfg: Config = serde_yaml::from_str(content)
            .map_err(|e| ProxyError::Config(format!("failed to parse yaml config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// 规范化并校验配置，失败时带字段路径报错
    fn validate(&mut self) -> Result<(), ProxyError> {
        if self.listen.is_empty() {
            return Err(ProxyError::Config("listen is required".into()));
        }
        if self.spoof_model.is_empty() {
            return Err(ProxyError::Config("spoof_model is required".into()));
        }
        if self.default_provider.is_empty() {
            return Err(ProxyError::Config("default_provider is required".into()));
        }
        if self.timeout_seconds == 0 {
            return Err(ProxyError::Config(
                "timeout_seconds is required and must be > 0".into(),
            ));
        }
        if self.providers.is_empty() {
            return Err(ProxyError::Config("providers is required".into()));
        }

        for (name, provider) in self.providers.iter_mut() {
            provider.provider_type = provider.provider_type.trim().to_lowercase();
            provider.url = provider.url.trim().to_string();
            provider.model = provider.model.trim().to_string();
            provider.reasoning_effort = normalize_reasoning_effort(&provider.reasoning_effort);
            provider.auth.auth_type = provider.auth.auth_type.trim().to_lowercase();

            if provider.provider_type.is_empty() {
                return Err(ProxyError::Config(format!(
                    "providers.{name}.type is required"
                )));
            }
            if provider.url.is_empty() {
                return Err(ProxyError::Config(format!(
                    "providers.{name}.url is required"
                )));
            }
            match provider.provider_type.as_str() {
                PROVIDER_TYPE_PASSTHROUGH | PROVIDER_TYPE_OPENAI | PROVIDER_TYPE_CHATGPT => {}
                _ => {
                    return Err(ProxyError::Config(format!(
                        "providers.{name}.type must be one of passthrough/openai/chatgpt"
                    )));
                }
            }

            if provider.provider_type != PROVIDER_TYPE_PASSTHROUGH && provider.model.is_empty() {
                return Err(ProxyError::Config(format!(
                    "providers.{name}.model is required for type {}",
                    provider.provider_type
                )));
            }
            if !provider.reasoning_effort.is_empty()
                && !is_valid_reasoning_effort(&provider.reasoning_effort)
            {
                return Err(ProxyError::Config(format!(
                    "providers.{name}.reasoning_effort must be one of none/minimal/low/medium/high/xhigh"
                )));
            }

            match provider.auth.auth_type.as_str() {
                "" | AUTH_TYPE_NONE | AUTH_TYPE_BEARER | AUTH_TYPE_CODEX => {}
                _ => {
                    return Err(ProxyError::Config(format!(
                        "providers.{name}.auth.type must be none/bearer/codex"
                    )));
                }
            }
        }

        if !self.providers.contains_key(&self.default_provider) {
            return Err(ProxyError::Config(format!(
                "default_provider {:?} is not defined in providers",
                self.default_provider
            )));
        }

        Ok(())
    }
}
