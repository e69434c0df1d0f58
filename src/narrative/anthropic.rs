use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{with_retries, NarrativeError, TextGenerator};
use crate::config::{Config, LlmConfig};

const API_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    backoff: Duration,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

impl MessagesResponse {
    /// Concatenated text blocks, in order.
    fn into_text(self) -> String {
        self.content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect()
    }
}

impl AnthropicClient {
    pub fn new(api_key: Option<String>, llm: &LlmConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            api_base: llm.api_base.trim_end_matches('/').to_string(),
            model: llm.model.clone(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            max_retries: llm.max_retries,
            backoff: Duration::from_millis(llm.retry_backoff_ms),
        }
    }

    /// A missing key is not an error here: requests fail with
    /// NarrativeError::MissingApiKey when they are made.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.llm_api_key(), &config.llm)
    }

    fn request_body<'a>(&'a self, system: &'a str, prompt: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        }
    }

    async fn send_once(
        &self,
        api_key: &str,
        body: &MessagesRequest<'_>,
    ) -> Result<String, NarrativeError> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.api_base))
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<MessagesResponse>().await?;
        Ok(parsed.into_text())
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn generate(&self, system: &str, prompt: &str) -> Result<String, NarrativeError> {
        let api_key = self.api_key.as_deref().ok_or(NarrativeError::MissingApiKey)?;
        let body = &self.request_body(system, prompt);

        debug!(max_retries = self.max_retries, "sending messages request");
        with_retries(self.max_retries, self.backoff, move || {
            self.send_once(api_key, body)
        })
        .await
    }
}
