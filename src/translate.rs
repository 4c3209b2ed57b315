//! Text translation through an OpenAI-compatible chat-completions endpoint
//!
//! Independent of the extraction pipeline; callers use it to translate
//! titles or summaries after the fact.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DEFAULT_TIMEOUT_SECS;
use crate::error::{Result, ScrapeError};

pub const DEFAULT_ENDPOINT: &str =
    "https://gateway.ai.cloudflare.com/v1/c7301c245fab3e5e60a72e7bd911a64a/aiproxy/openai";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TranslatorConfig {
    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: String,
}

impl TranslatorConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

pub struct Translator {
    config: TranslatorConfig,
    agent: ureq::Agent,
}

impl Translator {
    pub fn new(config: TranslatorConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)))
                .build(),
        );
        Self { config, agent }
    }

    /// Translate `text` from `source` into `target`. An empty `source`
    /// lets the model detect the language.
    pub fn translate(&self, text: &str, source: &str, target: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'));
        let body = request_body(&self.config.model, text, source, target)?;
        debug!(url = %url, model = %self.config.model, "translate");

        let mut response = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", &format!("Bearer {}", self.config.api_key))
            .send(body)
            .map_err(|e| ScrapeError::Translate(e.to_string()))?;

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ScrapeError::Translate(format!("failed to read body: {}", e)))?;
        parse_response(&body)
    }
}

fn request_body(model: &str, text: &str, source: &str, target: &str) -> Result<String> {
    let source = match source.trim() {
        "" => "the detected language",
        lang => lang,
    };
    let request = ChatRequest {
        model,
        messages: vec![
            Message {
                role: "system".to_string(),
                content: format!(
                    "You are a translation engine. Translate the user's text from {} to {}. \
                     Reply with the translation only.",
                    source, target
                ),
            },
            Message {
                role: "user".to_string(),
                content: text.to_string(),
            },
        ],
        temperature: 0.0,
    };
    serde_json::to_string(&request).map_err(|e| ScrapeError::Translate(e.to_string()))
}

fn parse_response(body: &str) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ScrapeError::Translate(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .ok_or_else(|| ScrapeError::Translate("response has no choices".to_string()))
}
