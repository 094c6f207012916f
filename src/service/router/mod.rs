//! Classify-and-dispatch answering
//!
//! The model picks one category label for the question, then the matching
//! handler computes the answer locally. Every outcome, including failures,
//! becomes an `Envelope`.

pub mod classifier;
pub mod prompts;

pub use classifier::{Classification, parse_classification};

use std::sync::Arc;
use std::time::Instant;

use serde_json::json;

use crate::model::{Category, DebugInfo, DockerCredentials, Envelope, ErrorKind, HandlerConfig};
use crate::service::handlers::{
    HandlerContext, HandlerError, HandlerResult, cli_simulation, date_range, docker,
    file_attributes, file_comparison, file_rename, file_replacement, general, httpie,
    image_compression, json_sort, markdown, multi_cursor, prettier, spreadsheet, sql_sales,
    unicode_data, zip_csv,
};
use crate::service::llm::{GenerativeModel, LlmError};
use crate::service::upload::{ScratchSpace, UploadedFile};

const UNRECOGNIZED_MESSAGE: &str = "Unable to determine processing method";

/// Routes questions to category handlers
pub struct AssignmentRouter {
    model: Arc<dyn GenerativeModel>,
    http: reqwest::Client,
    settings: HandlerConfig,
    docker: DockerCredentials,
    scratch: ScratchSpace,
}

impl AssignmentRouter {
    pub fn new(
        model: Arc<dyn GenerativeModel>,
        http: reqwest::Client,
        settings: HandlerConfig,
        docker: DockerCredentials,
    ) -> Self {
        let scratch = ScratchSpace::new(settings.scratch_dir.clone());
        Self {
            model,
            http,
            settings,
            docker,
            scratch,
        }
    }

    /// Ask the model for a label and parse its reply
    pub async fn classify(&self, question: &str) -> Result<(Classification, String), LlmError> {
        let prompt = prompts::build_classification_prompt(question);
        let reply = self.model.generate(&prompt, None).await?;
        Ok((parse_classification(&reply), reply.trim().to_string()))
    }

    /// Classify, dispatch and wrap the outcome
    pub async fn answer(&self, question: &str, upload: Option<&UploadedFile>) -> Envelope {
        let start_time = Instant::now();

        let (classification, reply) = match self.classify(question).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(
                    model = %self.model.model_name(),
                    error = %e,
                    "Classification request failed"
                );
                return error_envelope(HandlerError::Model(e), None);
            }
        };

        let category = match classification {
            Classification::Matched(category) => category,
            Classification::Unrecognized(raw) => {
                tracing::warn!(classification = %raw, "Reply named no known category");
                return unresolved_envelope(UNRECOGNIZED_MESSAGE.to_string(), raw, Vec::new());
            }
            Classification::Ambiguous(candidates) => {
                let labels: Vec<&str> = candidates.iter().map(|c| c.label()).collect();
                tracing::warn!(candidates = ?labels, "Reply named several categories");
                return unresolved_envelope(
                    format!("Ambiguous classification: {}", labels.join(", ")),
                    reply,
                    candidates,
                );
            }
        };

        let ctx = HandlerContext {
            question,
            upload,
            model: self.model.as_ref(),
            http: &self.http,
            settings: &self.settings,
            docker: &self.docker,
            scratch: &self.scratch,
        };

        let result = dispatch(category, &ctx).await;
        let elapsed_ms = start_time.elapsed().as_millis();

        match result {
            Ok(answer) => {
                tracing::info!(%category, elapsed_ms, "Question answered");
                answer.into()
            }
            Err(e) => {
                tracing::warn!(
                    %category,
                    elapsed_ms,
                    kind = ?e.kind(),
                    error = %e,
                    "Handler failed"
                );
                error_envelope(e, Some(category.label().to_string()))
            }
        }
    }
}

/// Run the handler for `category`
pub async fn dispatch(category: Category, ctx: &HandlerContext<'_>) -> HandlerResult {
    match category {
        Category::ZipCsvExtract => zip_csv::handle(ctx).await,
        Category::JsonSort => json_sort::handle(ctx).await,
        Category::MultiCursorJson => multi_cursor::handle(ctx).await,
        Category::UnicodeDataProcessing => unicode_data::handle(ctx).await,
        Category::FileComparison => file_comparison::handle(ctx).await,
        Category::ExcelFormulaProcessing => spreadsheet::handle_excel(ctx).await,
        Category::GeneralProcessing | Category::Unknown => general::handle(ctx).await,
        Category::DateRangeCalculation => date_range::handle(ctx).await,
        Category::HttpieRequest => httpie::handle(ctx).await,
        Category::NpxPrettierSha256 => prettier::handle(ctx).await,
        Category::GoogleSheetsFormula => spreadsheet::handle_google_sheets(ctx).await,
        Category::FileReplacementSha256 => file_replacement::handle(ctx).await,
        Category::FileAttributesListing => file_attributes::handle(ctx).await,
        Category::SqlSalesCalculation => sql_sales::handle(ctx).await,
        Category::MarkdownDocumentation => markdown::handle(ctx).await,
        Category::ImageCompression => image_compression::handle(ctx).await,
        Category::DockerImagePush => docker::handle(ctx).await,
        Category::CliCommandSimulation => cli_simulation::handle(ctx).await,
        Category::FileMoveRenameHash => file_rename::handle(ctx).await,
    }
}

/// Error envelope for a handler failure
pub fn error_envelope(error: HandlerError, classification: Option<String>) -> Envelope {
    Envelope::Error {
        message: error.to_string(),
        classification,
        debug_info: DebugInfo {
            kind: error.kind(),
            details: error.details(),
        },
    }
}

fn unresolved_envelope(message: String, reply: String, candidates: Vec<Category>) -> Envelope {
    let mut details = serde_json::Map::new();
    if !candidates.is_empty() {
        details.insert("candidates".to_string(), json!(candidates));
    }
    Envelope::Error {
        message,
        classification: Some(reply),
        debug_info: DebugInfo {
            kind: ErrorKind::ExternalService,
            details,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::testing::ScriptedModel;
    use tempfile::TempDir;

    struct Harness {
        model: Arc<ScriptedModel>,
        router: AssignmentRouter,
        _root: TempDir,
    }

    fn harness(replies: &[&str]) -> Harness {
        let root = TempDir::new().unwrap();
        let model = Arc::new(ScriptedModel::new(replies));
        let settings = HandlerConfig {
            scratch_dir: Some(root.path().to_path_buf()),
            ..HandlerConfig::default()
        };
        let router = AssignmentRouter::new(
            model.clone(),
            reqwest::Client::new(),
            settings,
            DockerCredentials::default(),
        );
        Harness {
            model,
            router,
            _root: root,
        }
    }

    #[tokio::test]
    async fn test_matched_label_runs_handler() {
        let h = harness(&["DATE_RANGE_CALCULATION"]);
        let envelope = h
            .router
            .answer(
                "How many Wednesdays are there in the date range 2022-01-01 to 2022-01-31?",
                None,
            )
            .await;

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["answer"], 4);
        assert_eq!(value["start_date"], "2022-01-01");

        let prompts = h.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("DATE_RANGE_CALCULATION"));
    }

    #[tokio::test]
    async fn test_unrecognized_reply() {
        let h = harness(&["no idea"]);
        let envelope = h.router.answer("What is this?", None).await;

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], UNRECOGNIZED_MESSAGE);
        assert_eq!(value["classification"], "no idea");
        assert_eq!(h.model.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_ambiguous_reply_names_candidates() {
        let h = harness(&["JSON_SORT or MULTI_CURSOR_JSON"]);
        let envelope = h.router.answer("Sort this", None).await;

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(
            value["message"],
            "Ambiguous classification: JSON_SORT, MULTI_CURSOR_JSON"
        );
        assert_eq!(
            value["debug_info"]["candidates"],
            json!(["JSON_SORT", "MULTI_CURSOR_JSON"])
        );
    }

    #[tokio::test]
    async fn test_handler_error_carries_classification() {
        let h = harness(&["ZIP_CSV_EXTRACT"]);
        let envelope = h.router.answer("What is the answer column?", None).await;

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["message"], "Invalid or missing ZIP file");
        assert_eq!(value["classification"], "ZIP_CSV_EXTRACT");
        assert_eq!(envelope.error_kind(), Some(ErrorKind::Input));
    }

    #[tokio::test]
    async fn test_classification_failure_is_external() {
        let h = harness(&[]);
        let envelope = h.router.answer("Anything", None).await;
        assert_eq!(envelope.error_kind(), Some(ErrorKind::ExternalService));
    }

    #[tokio::test]
    async fn test_unknown_routes_to_general() {
        let h = harness(&["UNKNOWN", "1. Summary\n2. Steps"]);
        let envelope = h.router.answer("Explain the task", None).await;

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["answer"], "1. Summary\n2. Steps");
        assert_eq!(value["file_provided"], false);
        assert_eq!(h.model.prompt_count(), 2);
    }

    #[tokio::test]
    async fn test_handler_model_failure_is_external() {
        let h = harness(&["GENERAL_PROCESSING"]);
        h.model.push_error("quota exceeded");
        let envelope = h.router.answer("Explain the task", None).await;

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["classification"], "GENERAL_PROCESSING");
        assert_eq!(envelope.error_kind(), Some(ErrorKind::ExternalService));
    }
}
