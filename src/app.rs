//! Application state and service initialization
//!
//! This module centralizes service construction so the HTTP layer only sees
//! ready-made, shareable state.

use std::sync::Arc;

use crate::model::{AnswerMode, Config};
use crate::service::{
    AnswerService, AssignmentRouter, GeminiClient, GenerativeModel, PassthroughService,
    ScratchSpace,
};

/// Application state shared by every worker
pub struct AppState {
    pub config: Config,
    /// Strategy behind `POST /api/`
    pub answers: AnswerService,
    /// Model used for `GET /v1/models`
    pub model: Arc<dyn GenerativeModel>,
    /// Where uploads are persisted for the duration of a request
    pub scratch: ScratchSpace,
}

impl AppState {
    /// Build the HTTP client and Gemini clients, then the answer service
    ///
    /// Fails when no API key is configured.
    pub fn new(config: Config) -> Result<Self, AppError> {
        let api_key = config
            .llm
            .api_key
            .clone()
            .ok_or(AppError::MissingConfig("GEMINI_API_KEY"))?;

        let http = reqwest::Client::builder()
            .timeout(config.llm.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::HttpClient(e.to_string()))?;

        let router_model = GeminiClient::new(
            http.clone(),
            &config.llm.base_url,
            &api_key,
            &config.llm.router_model,
            config.llm.timeout,
        )
        .map_err(|e| AppError::LlmClient(e.to_string()))?;
        let model: Arc<dyn GenerativeModel> = match config.mode {
            AnswerMode::Router => Arc::new(router_model),
            AnswerMode::Passthrough => {
                Arc::new(router_model.with_model(&config.llm.passthrough_model))
            }
        };

        tracing::info!(
            mode = config.mode.as_str(),
            model = %model.model_name(),
            "Initialized generative model client"
        );

        Ok(Self::with_model(config, model, http))
    }

    /// Build state around an already constructed model
    pub fn with_model(config: Config, model: Arc<dyn GenerativeModel>, http: reqwest::Client) -> Self {
        let answers = match config.mode {
            AnswerMode::Router => AnswerService::Router(AssignmentRouter::new(
                Arc::clone(&model),
                http,
                config.handlers.clone(),
                config.docker.clone(),
            )),
            AnswerMode::Passthrough => {
                AnswerService::Passthrough(PassthroughService::new(Arc::clone(&model)))
            }
        };
        let scratch = ScratchSpace::new(config.handlers.scratch_dir.clone());
        tracing::debug!(root = %scratch.root().display(), "Scratch space configured");

        Self {
            config,
            answers,
            model,
            scratch,
        }
    }
}

/// Application-level errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AppError {
    /// Missing required configuration
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// Generative model client could not be built
    #[error("Failed to initialize LLM client: {0}")]
    LlmClient(String),
}
