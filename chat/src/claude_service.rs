use crate::config::Config;
use crate::error::ChatError;
use crate::models::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Shown in place of an answer when the inference call fails.
pub const FALLBACK_ANSWER: &str = "An unexpected error occurred; please retry or contact support";

/// Sends a built prompt to an LLM and returns the answer text.
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, prompt: &Prompt) -> Result<String, ChatError>;

    /// Model identifier, for diagnostics.
    fn model(&self) -> &str;
}

/// Diagnostic produced when an answer had to be replaced by the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerFailure {
    pub message: String,
    pub trace: String,
}

/// Asks the service, substituting [`FALLBACK_ANSWER`] on any failure.
pub async fn answer_or_fallback(
    service: &dyn AnswerService,
    prompt: &Prompt,
) -> (String, Option<AnswerFailure>) {
    match service.ask(prompt).await {
        Ok(answer) => (answer, None),
        Err(err) => {
            let trace = err.trace().map(str::to_string).unwrap_or_else(|| format!("{:?}", err));
            log::error!("Error processing question: {}\n{}", err, trace);
            (
                FALLBACK_ANSWER.to_string(),
                Some(AnswerFailure {
                    message: err.to_string(),
                    trace,
                }),
            )
        }
    }
}

pub struct ClaudeService {
    client: Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl ClaudeService {
    pub fn new(config: &Config) -> Result<Self, ChatError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut api_key = HeaderValue::from_str(&config.api_key).map_err(|_| {
            ChatError::Initialization("ANTHROPIC_API_KEY contains invalid characters".to_string())
        })?;
        api_key.set_sensitive(true);
        headers.insert("x-api-key", api_key);
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ChatError::Initialization(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_output_tokens,
            temperature: config.temperature,
        })
    }

    async fn generate_response(&self, prompt: &Prompt) -> Result<String> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: prompt.system.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.user.clone(),
            }],
        };

        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("request to Anthropic API failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&error_text)
                .map(|e| format!("{}: {}", e.error.error_type, e.error.message))
                .unwrap_or(error_text);
            return Err(anyhow!("Anthropic API error ({}): {}", status, detail));
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .context("failed to parse Anthropic API response")?;

        messages_response
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
            .ok_or_else(|| anyhow!("Anthropic API returned no text content"))
    }
}

#[async_trait]
impl AnswerService for ClaudeService {
    async fn ask(&self, prompt: &Prompt) -> Result<String, ChatError> {
        log::debug!("Sending prompt to {} ({} chars)", self.model, prompt.user.len());
        self.generate_response(prompt).await.map_err(ChatError::inference)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
