//! OpenAI-compatible chat completions evaluator
//!
//! Sends the template's system message and the synthesized prompt as one
//! chat turn and returns the first choice's content verbatim. Any transport
//! failure, non-success status or empty answer is reported as
//! [`ScenarioError::AiServiceUnavailable`]; the pipeline never retries.

use crate::collaborators::Evaluator;
use crate::config::EvaluatorConfig;
use crate::errors::{Result, ScenarioError};
use crate::normalize::{DEFAULT_PREVIEW_CHARS, preview};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`Evaluator`] speaking the chat completions wire format
#[derive(Debug, Clone)]
pub struct HttpEvaluator {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    json_mode: bool,
}

impl HttpEvaluator {
    /// Build from configuration, reading the API key from `api_key_env`
    pub fn from_config(cfg: &EvaluatorConfig) -> Result<Self> {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(
                env = %cfg.api_key_env,
                "No evaluator API key set; sending requests without Authorization"
            );
        }
        Self::new(cfg, api_key)
    }

    /// Build with an explicit API key
    pub fn new(cfg: &EvaluatorConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| ScenarioError::config_with_source("failed to build HTTP client", e))?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key,
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            json_mode: cfg.json_mode,
        })
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    async fn evaluate(&self, system_prompt: &str, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: self.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ScenarioError::ai_service_with_source("POST chat completion failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            tracing::warn!(
                status = %status,
                detail = %preview(&detail, DEFAULT_PREVIEW_CHARS),
                "Evaluator returned an error status"
            );
            return Err(ScenarioError::ai_service(format!(
                "chat completion returned {status}"
            )));
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            ScenarioError::ai_service_with_source("chat completion body is not readable", e)
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ScenarioError::ai_service("chat completion returned no content"))?;

        tracing::debug!(
            model = %self.model,
            answer_chars = content.chars().count(),
            "Evaluator answered"
        );
        Ok(content)
    }
}
