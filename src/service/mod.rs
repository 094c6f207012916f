pub mod command;
pub mod handlers;
pub mod llm;
pub mod passthrough;
pub mod router;
pub mod upload;

pub use llm::{GeminiClient, GenerativeModel, LlmError};
pub use passthrough::{PassthroughError, PassthroughService};
pub use router::AssignmentRouter;
pub use upload::{ScratchSpace, UploadedFile};

use crate::model::{AnswerMode, Envelope};

/// The answering strategy selected at start-up
pub enum AnswerService {
    Router(AssignmentRouter),
    Passthrough(PassthroughService),
}

impl AnswerService {
    pub fn mode(&self) -> AnswerMode {
        match self {
            AnswerService::Router(_) => AnswerMode::Router,
            AnswerService::Passthrough(_) => AnswerMode::Passthrough,
        }
    }

    /// Router failures are folded into the envelope; passthrough failures are not
    pub async fn answer(
        &self,
        question: &str,
        upload: Option<&UploadedFile>,
    ) -> Result<Envelope, PassthroughError> {
        match self {
            AnswerService::Router(router) => Ok(router.answer(question, upload).await),
            AnswerService::Passthrough(service) => {
                Ok(service.answer(question, upload).await?.into())
            }
        }
    }
}
