//! Forward the question and uploaded file straight to the model

use std::sync::Arc;

use crate::model::Answer;
use crate::service::llm::{Attachment, GenerativeModel, LlmError};
use crate::service::upload::UploadedFile;

#[derive(Debug, thiserror::Error)]
pub enum PassthroughError {
    #[error("Model request failed: {0}")]
    Model(#[from] LlmError),

    #[error("Failed to read uploaded file: {0}")]
    Io(#[from] std::io::Error),
}

pub struct PassthroughService {
    model: Arc<dyn GenerativeModel>,
}

impl PassthroughService {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    pub async fn answer(
        &self,
        question: &str,
        upload: Option<&UploadedFile>,
    ) -> Result<Answer, PassthroughError> {
        let attachment = match upload {
            Some(file) => Some(Attachment::from_file_name(
                file.file_name(),
                file.read().await?,
            )),
            None => None,
        };

        let text = self.model.generate(question, attachment.as_ref()).await?;

        tracing::info!(
            model = %self.model.model_name(),
            answer_length = text.len(),
            "Generated passthrough answer"
        );

        Ok(Answer::new(text))
    }
}
