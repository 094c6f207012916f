//! Generative model client
//!
//! `GenerativeModel` is the seam the router and handlers depend on. `GeminiClient`
//! implements it with rig's Gemini provider; model listing goes straight to the
//! REST `models` endpoint, which rig does not wrap.

use std::time::Duration;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;
use rig::OneOrMany;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::message::{DocumentMediaType, ImageMediaType, Message, MimeType, UserContent};
use rig::providers::gemini;
use serde::Deserialize;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Failed to create model client: {0}")]
    Client(String),

    #[error("Completion request failed: {0}")]
    Completion(String),

    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Model API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Model returned no text ({0})")]
    EmptyResponse(String),
}

/// Raw file bytes sent alongside a prompt
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    /// Guess the MIME type from a file name, falling back to octet-stream
    pub fn from_file_name(file_name: &str, data: Vec<u8>) -> Self {
        let mime_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self { mime_type, data }
    }

    /// Images go as inline images, readable text as a text part, anything
    /// else as an inline document tagged with its MIME type
    fn to_content(&self) -> UserContent {
        if let Some(media_type) = ImageMediaType::from_mime_type(&self.mime_type) {
            return UserContent::image_base64(BASE64.encode(&self.data), Some(media_type), None);
        }
        match std::str::from_utf8(&self.data) {
            Ok(text) => UserContent::text(text),
            Err(_) => UserContent::document(
                BASE64.encode(&self.data),
                DocumentMediaType::from_mime_type(&self.mime_type),
            ),
        }
    }
}

#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Model identifier used for requests
    fn model_name(&self) -> &str;

    /// Generate text for a prompt, optionally with one attached file
    async fn generate(&self, prompt: &str, attachment: Option<&Attachment>)
    -> Result<String, LlmError>;

    /// List model names visible to the configured key
    async fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// Single user turn: the prompt, then the attachment if any
fn user_message(prompt: &str, attachment: Option<&Attachment>) -> Message {
    let mut content = OneOrMany::one(UserContent::text(prompt));
    if let Some(file) = attachment {
        content.push(file.to_content());
    }
    Message::User { content }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    name: String,
}

/// Gemini client bound to one model
#[derive(Clone)]
pub struct GeminiClient {
    completions: gemini::Client,
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl GeminiClient {
    /// `base_url` and `http` serve model listing; completions use rig's endpoint
    pub fn new(
        http: Client,
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let completions = gemini::Client::builder(api_key)
            .build()
            .map_err(|e| LlmError::Client(format!("Failed to create Gemini client: {}", e)))?;

        Ok(Self {
            completions,
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
        })
    }

    /// Same credentials and HTTP client, different model
    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    async fn error_for_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(LlmError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, LlmError> {
        let start_time = std::time::Instant::now();

        tracing::debug!(
            model = %self.model,
            prompt_length = prompt.len(),
            has_attachment = attachment.is_some(),
            "Sending completion request"
        );

        let agent = self.completions.agent(&self.model).build();
        let request = agent.prompt(user_message(prompt, attachment));

        let text = match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::error!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    error = %e,
                    "Completion request failed"
                );
                return Err(LlmError::Completion(e.to_string()));
            }
            Err(_) => {
                tracing::error!(
                    model = %self.model,
                    timeout_ms = self.timeout.as_millis(),
                    "Completion request timed out"
                );
                return Err(LlmError::Timeout(self.timeout));
            }
        };

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse("empty completion".to_string()));
        }

        tracing::info!(
            model = %self.model,
            elapsed_ms = start_time.elapsed().as_millis(),
            response_length = text.len(),
            "Completion request completed"
        );

        Ok(text)
    }

    async fn list_models(&self) -> Result<Vec<String>, LlmError> {
        let url = format!("{}/v1beta/models", self.base_url);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .http
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .query(&[("pageSize", "1000")]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = Self::error_for_status(request.send().await?).await?;
            let page: ModelList = response
                .json()
                .await
                .map_err(|e| LlmError::ParseError(e.to_string()))?;

            names.extend(page.models.into_iter().map(|m| m.name));

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::debug!(count = names.len(), "Listed available models");
        Ok(names)
    }
}
