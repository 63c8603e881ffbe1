use crate::ProbeError;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_API_KEY_ENV: &str = "XAI_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
pub const DEFAULT_MODEL: &str = "grok-4-1-fast-reasoning";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
pub const BASE_URL_ENV: &str = "POLARITY_BASE_URL";
pub const MODEL_ENV: &str = "POLARITY_MODEL";

/// Connection settings for the chat-completion endpoint.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub model_name: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl ClientConfig {
    pub fn resolve(file: &ProbeConfigFile) -> Result<Self, ProbeError> {
        Self::resolve_with(file, |key| std::env::var(key).ok())
    }

    /// Values from `file` win over the environment, which wins over defaults.
    pub fn resolve_with(
        file: &ProbeConfigFile,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ProbeError> {
        let key_env = file
            .api_key_env
            .clone()
            .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = lookup(&key_env)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ProbeError::MissingApiKey(key_env))?;
        let base_url = file
            .base_url
            .clone()
            .or_else(|| lookup(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let model_name = file
            .model_name
            .clone()
            .or_else(|| lookup(MODEL_ENV))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let request_timeout = Duration::from_secs(
            file.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );
        Ok(Self {
            api_key,
            base_url,
            model_name,
            request_timeout,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProbeConfigFile {
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub delay_ms: Option<u64>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl ProbeConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read config {}: {}", path.display(), e))?;
        let parsed: Self = serde_yaml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config {}: {}", path.display(), e))?;
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let cfg = ClientConfig::resolve_with(
            &ProbeConfigFile::default(),
            env(&[("XAI_API_KEY", "secret")]),
        )
        .expect("resolve");
        assert_eq!(cfg.api_key, "secret");
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.model_name, DEFAULT_MODEL);
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
        assert!(!format!("{:?}", cfg).contains("secret"));
    }

    #[test]
    fn file_values_override_environment() {
        let file: ProbeConfigFile = serde_yaml::from_str(
            "api_key_env: OTHER_KEY\nbase_url: http://localhost:9000/v1\nrequest_timeout_secs: 5\n",
        )
        .expect("yaml");
        let cfg = ClientConfig::resolve_with(
            &file,
            env(&[
                ("OTHER_KEY", "k2"),
                ("POLARITY_BASE_URL", "http://ignored"),
                ("POLARITY_MODEL", "model-from-env"),
            ]),
        )
        .expect("resolve");
        assert_eq!(cfg.api_key, "k2");
        assert_eq!(cfg.base_url, "http://localhost:9000/v1");
        assert_eq!(cfg.model_name, "model-from-env");
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_or_blank_key_is_an_error() {
        let err = ClientConfig::resolve_with(&ProbeConfigFile::default(), env(&[]))
            .expect_err("no key");
        assert!(err.to_string().contains("XAI_API_KEY"), "{}", err);
        let err = ClientConfig::resolve_with(
            &ProbeConfigFile::default(),
            env(&[("XAI_API_KEY", "  ")]),
        )
        .expect_err("blank key");
        assert!(matches!(err, ProbeError::MissingApiKey(_)));
    }

    #[test]
    fn unknown_config_keys_are_rejected() {
        let parsed: Result<ProbeConfigFile, _> = serde_yaml::from_str("temperture: 0.5\n");
        assert!(parsed.is_err());
    }
}
