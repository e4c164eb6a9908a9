use crate::config::GenerationConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::log::{debug, info, warn};

const GENERATION_TEMPERATURE: f32 = 0.7;
const GENERATION_MAX_TOKENS: u32 = 100;
const GENERATION_SYSTEM_PROMPT: &str = "You are a friendly AI assistant that makes voice calls. Generate a short, natural-sounding message (max 200 characters) that would be good for text-to-speech. Be casual and conversational.";

#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("No choices in response")]
    NoChoices,
    #[error("Response choice has no content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Rewrites prompts into short spoken messages via an OpenAI compatible chat completion API.
#[derive(Clone)]
pub struct MessageComposer {
    api_key: String,
    api_url: String,
    model: String,
    client: Client,
}
impl MessageComposer {
    /// Returns None when no credential is configured, which disables generation.
    pub fn from_config(config: &GenerationConfig) -> Result<Option<Self>> {
        let Some(api_key) = config.api_key.clone() else {
            return Ok(None);
        };

        let client = Client::builder()
            .build()
            .context("Failed to build message composer HTTP client")?;

        Ok(Some(Self {
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            client,
        }))
    }

    /// Never fails, any error is logged and yields None so callers use their fallback.
    pub async fn compose(&self, prompt: &str) -> Option<String> {
        match self.generate(prompt).await {
            Ok(message) => {
                info!("Generated AI message: {message}");
                Some(message)
            }
            Err(e) => {
                warn!("Error generating AI message: {e}");
                None
            }
        }
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request_body = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: GENERATION_SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: GENERATION_TEMPERATURE,
            max_tokens: GENERATION_MAX_TOKENS,
        };

        debug!("Sending chat completion request using model {}", self.model);
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?
            .error_for_status()?
            .json::<ChatCompletionResponse>()
            .await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or(GenerationError::NoChoices)?;

        choice
            .message
            .content
            .filter(|content| !content.is_empty())
            .ok_or(GenerationError::EmptyContent)
    }
}
