//! REST API endpoints for answering questions

use actix_multipart::Multipart;
use actix_web::{HttpResponse, get, http::StatusCode, post, web};
use futures::TryStreamExt;
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::health;
use crate::app::AppState;
use crate::model::{Envelope, ErrorKind};

/// Multipart form accepted by `POST /api/`
#[derive(ToSchema)]
#[allow(dead_code)] // Documentation only; the form is read field by field
pub struct QuestionForm {
    /// Assignment question text
    question: String,
    /// Optional file the question refers to
    #[schema(value_type = Option<String>, format = Binary)]
    file: Option<Vec<u8>>,
}

/// Result envelope returned by `POST /api/`
#[derive(ToSchema)]
#[allow(dead_code)] // Documentation only; `Envelope` is serialized directly
pub struct AnswerResponse {
    /// `success` or `error`
    status: String,
    /// Present on success; a string, number or JSON value
    answer: Option<serde_json::Value>,
    /// Present on error
    message: Option<String>,
    /// Category label, on errors raised after classification
    classification: Option<String>,
    /// Present on error: `kind` plus handler-specific diagnostics
    debug_info: Option<serde_json::Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ModelList {
    pub models: Vec<String>,
}

#[derive(Default)]
struct ReceivedForm {
    question: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn read_form(mut payload: Multipart, limit: usize) -> Result<ReceivedForm, ApiError> {
    let mut form = ReceivedForm::default();

    while let Some(mut field) = payload.try_next().await? {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > limit {
                return Err(ApiError::PayloadTooLarge(format!(
                    "Field {} exceeds {} bytes",
                    name, limit
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "question" => {
                let text = String::from_utf8(bytes)
                    .map_err(|_| ApiError::BadRequest("Field question is not valid UTF-8".into()))?;
                form.question = Some(text);
            }
            "file" => form.file = Some((file_name.unwrap_or_default(), bytes)),
            other => tracing::debug!(field = other, "Ignoring unexpected form field"),
        }
    }

    Ok(form)
}

fn status_for(envelope: &Envelope) -> StatusCode {
    match envelope.error_kind() {
        None => StatusCode::OK,
        Some(ErrorKind::Input) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorKind::ExternalService) => StatusCode::BAD_GATEWAY,
        Some(ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Answer an assignment question
///
/// The uploaded file, if any, lives in a scratch directory that is removed
/// once the response is built.
#[utoipa::path(
    post,
    path = "/api/",
    request_body(content = QuestionForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Question answered", body = AnswerResponse),
        (status = 400, description = "Malformed form or missing question", body = ErrorResponse),
        (status = 413, description = "Form field larger than the upload cap", body = ErrorResponse),
        (status = 422, description = "Question or file cannot be processed", body = AnswerResponse),
        (status = 502, description = "Model, remote service or subprocess failed", body = AnswerResponse),
        (status = 500, description = "Internal server error", body = AnswerResponse)
    ),
    tag = "answers"
)]
#[post("/api/")]
pub async fn answer_question(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let form = read_form(payload, state.config.handlers.max_upload_bytes).await?;

    let question = form
        .question
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Missing required field: question".into()))?;

    // Browsers submit an empty, nameless part for an untouched file input
    let upload = match form.file {
        Some((name, bytes)) if !(name.is_empty() && bytes.is_empty()) => Some(
            state
                .scratch
                .save(&name, &bytes)
                .await
                .map_err(|e| ApiError::Internal(format!("Failed to store upload: {}", e)))?,
        ),
        _ => None,
    };

    tracing::info!(
        mode = state.answers.mode().as_str(),
        question_length = question.len(),
        file_name = upload.as_ref().map(|f| f.file_name()),
        file_size = upload.as_ref().map(|f| f.size()),
        "Received question"
    );

    let envelope = state.answers.answer(&question, upload.as_ref()).await?;

    Ok(HttpResponse::build(status_for(&envelope)).json(envelope))
}

/// List model names visible to the configured API key
#[utoipa::path(
    get,
    path = "/v1/models",
    responses(
        (status = 200, description = "Models listed", body = ModelList),
        (status = 502, description = "Model API failed", body = ErrorResponse)
    ),
    tag = "models"
)]
#[get("/v1/models")]
pub async fn list_models(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let models = state.model.list_models().await?;
    tracing::debug!(count = models.len(), "Listed models");
    Ok(HttpResponse::Ok().json(ModelList { models }))
}

/// Configure answer routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(answer_question).service(list_models);
}

#[derive(OpenApi)]
#[openapi(
    paths(answer_question, list_models, health::liveness, health::readiness),
    components(schemas(
        QuestionForm,
        AnswerResponse,
        ModelList,
        ErrorResponse,
        health::HealthStatus,
        health::ReadinessStatus
    )),
    tags(
        (name = "answers", description = "Assignment question answering"),
        (name = "models", description = "Generative model discovery"),
        (name = "health", description = "Liveness and readiness probes")
    ),
    info(
        title = "Assignment Router API",
        description = "Answers assignment questions with a generative model and rule-based handlers"
    )
)]
pub struct ApiDoc;
