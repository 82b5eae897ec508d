use std::fmt;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use reqwest::StatusCode;

use crate::error::{DigestError, Result};
use crate::prompt::Prompt;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Bearer credential supplied at runtime. Never logged, never written to disk.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// `None` for a blank key.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_owned()))
    }

    /// Key typed by the user, else `OPENAI_API_KEY`.
    pub fn resolve(supplied: Option<&str>) -> Result<Self> {
        supplied
            .and_then(Self::new)
            .or_else(|| std::env::var(API_KEY_ENV).ok().and_then(Self::new))
            .ok_or_else(|| {
                DigestError::Auth(format!(
                    "no API key provided; enter one or set {API_KEY_ENV}"
                ))
            })
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Turns a prompt into a completion. One attempt, no retries.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn complete(&self, prompt: &Prompt, api_key: &ApiKey) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    endpoint: String,
    config: OpenAiConfig,
}

impl OpenAiSummarizer {
    pub fn new(config: OpenAiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build summarization http client")?;
        Ok(Self {
            client,
            endpoint: responses_endpoint(&config.base_url),
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn complete(&self, prompt: &Prompt, api_key: &ApiKey) -> Result<String> {
        tracing::info!(
            model = %self.config.model,
            input_chars = prompt.input.chars().count(),
            truncated = prompt.truncated,
            "request completion"
        );
        responses_text(
            &self.client,
            &self.endpoint,
            api_key,
            &self.config.model,
            &prompt.instructions,
            &prompt.input,
            self.config.temperature,
        )
        .await
    }
}

pub fn responses_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');
    format!("{base_url}/responses")
}

pub async fn responses_text(
    client: &reqwest::Client,
    endpoint: &str,
    api_key: &ApiKey,
    model: &str,
    instructions: &str,
    input: &str,
    temperature: f32,
) -> Result<String> {
    let mut body = serde_json::json!({
        "model": model,
        "instructions": instructions,
        "input": input,
        "text": { "format": { "type": "text" } },
        "store": false,
    });

    // Reasoning models reject sampling params.
    if !model.starts_with("gpt-5")
        && !model.starts_with('o')
        && let Some(obj) = body.as_object_mut()
    {
        obj.insert("temperature".to_owned(), serde_json::json!(temperature));
    }

    let response = client
        .post(endpoint)
        .bearer_auth(api_key.expose())
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            if err.is_timeout() {
                DigestError::Api(format!("POST {endpoint} timed out"))
            } else {
                DigestError::Api(format!("POST {endpoint}: {err}"))
            }
        })?;

    let status = response.status();
    let raw = response
        .text()
        .await
        .map_err(|err| DigestError::Api(format!("read response body: {err}")))?;
    if !status.is_success() {
        let message = parse_error_message(&raw).unwrap_or_else(|| raw.clone());
        tracing::warn!(%status, "completion request failed");
        return Err(classify_status(status, message));
    }

    let value: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|err| DigestError::Api(format!("parse response: {err}")))?;
    extract_output_text(&value)
}

pub fn classify_status(status: StatusCode, message: String) -> DigestError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            DigestError::Auth(format!("({status}) {message}"))
        }
        StatusCode::TOO_MANY_REQUESTS => DigestError::RateLimit(format!("({status}) {message}")),
        _ => DigestError::Api(format!("({status}) {message}")),
    }
}

fn parse_error_message(raw_json: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(raw_json).ok()?;
    let message = value.get("error")?.get("message")?.as_str()?.to_owned();
    Some(message)
}

fn extract_output_text(value: &serde_json::Value) -> Result<String> {
    let output = value
        .get("output")
        .and_then(|v| v.as_array())
        .ok_or_else(|| DigestError::Api("missing `output` array in response".to_owned()))?;

    let mut text = String::new();
    for item in output {
        if item.get("type").and_then(|v| v.as_str()) != Some("message") {
            continue;
        }
        let Some(content) = item.get("content").and_then(|v| v.as_array()) else {
            continue;
        };
        for part in content {
            if part.get("type").and_then(|v| v.as_str()) != Some("output_text") {
                continue;
            }
            let Some(part_text) = part.get("text").and_then(|v| v.as_str()) else {
                continue;
            };
            text.push_str(part_text);
        }
    }

    if text.trim().is_empty() {
        return Err(DigestError::Api("completion text is empty".to_owned()));
    }
    Ok(text)
}
