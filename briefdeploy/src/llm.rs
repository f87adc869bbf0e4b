//! Chat-completions client used as the content generator.
//!
//! Speaks the OpenAI-compatible `/chat/completions` shape, so any proxy that
//! exposes it (AIPipe, OpenRouter, a local gateway) works. The generator is a
//! trait so the orchestrator can be driven without network access.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::GenerationError;

/// Turns a brief into a single self-contained HTML document.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, brief: &str) -> Result<String, GenerationError>;
}

/// A message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

/// Response from the chat-completions API. Only the fields we read.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatResponse {
    /// `choices[0].message.content`, if present.
    pub fn first_content(self) -> Option<String> {
        self.choices.into_iter().next()?.message.content
    }
}

/// Chat-completions client.
pub struct LlmClient {
    settings: Settings,
    http: reqwest::Client,
}

impl LlmClient {
    pub fn new(settings: &Settings) -> Self {
        Self {
            settings: settings.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// Send a conversation and get back the first choice's text.
    pub async fn chat(&self, messages: &[Message]) -> Result<String, GenerationError> {
        let api_key = self.settings.api_key()?;

        let resp = self
            .http
            .post(&self.settings.llm_url)
            .bearer_auth(api_key)
            .json(&ChatRequest {
                model: &self.settings.model,
                messages,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<ChatResponse>()
            .await?
            .first_content()
            .ok_or(GenerationError::MissingContent)
    }
}

#[async_trait]
impl ContentGenerator for LlmClient {
    async fn generate(&self, brief: &str) -> Result<String, GenerationError> {
        let messages = [Message {
            role: "user".to_string(),
            content: prompt_for(brief),
        }];
        tracing::info!(model = %self.settings.model, "Requesting generated app");
        let text = self.chat(&messages).await?;
        extract_document(&text).ok_or(GenerationError::Empty)
    }
}

/// Instruction template wrapped around the caller's brief.
pub fn prompt_for(brief: &str) -> String {
    format!(
        "Based on the following brief, create a complete, single-page web application.\n\
         The application must be self-contained in a single HTML file, including any CSS or JavaScript.\n\
         Brief: \"{brief}\"\n\
         Return only the full HTML code."
    )
}

/// Strip a surrounding markdown code fence, if the model added one.
/// Returns `None` when nothing but whitespace is left.
pub fn extract_document(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let body = match trimmed.strip_prefix("```") {
        Some(rest) => {
            // Drop the info string (```html) up to the first newline.
            let rest = rest.split_once('\n').map(|(_, b)| b).unwrap_or("");
            rest.trim_end().strip_suffix("```").unwrap_or(rest)
        }
        None => trimmed,
    };
    let body = body.trim();
    (!body.is_empty()).then(|| format!("{body}\n"))
}
