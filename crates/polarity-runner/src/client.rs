use crate::ClientConfig;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("response contained no message content")]
    EmptyResponse,
}

#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub system_prompt: &'a str,
    pub user_prompt: &'a str,
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub total_tokens: u64,
}

pub trait ChatClient {
    fn model_name(&self) -> &str;
    fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatCompletion, ProbeError>;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    #[serde(default)]
    total_tokens: u64,
}

/// OpenAI-compatible `/chat/completions` client.
#[derive(Debug)]
pub struct HttpChatClient {
    config: ClientConfig,
    http: HttpClient,
}

impl HttpChatClient {
    pub fn new(config: ClientConfig) -> Result<Self, ProbeError> {
        let http = HttpClient::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

impl ChatClient for HttpChatClient {
    fn model_name(&self) -> &str {
        &self.config.model_name
    }

    fn complete(&self, request: &ChatRequest<'_>) -> Result<ChatCompletion, ProbeError> {
        let payload = json!({
            "model": self.config.model_name,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_prompt}
            ],
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ProbeError::Api {
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }
        let parsed: CompletionResponse = response.json()?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProbeError::EmptyResponse)?;
        Ok(ChatCompletion {
            content,
            total_tokens: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }
}
