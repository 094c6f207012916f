//! Category handlers
//!
//! Each handler computes the answer for one question category. They share a
//! read-only `HandlerContext` and report failures through `HandlerError`.

pub mod archive;
pub mod cli_simulation;
pub mod date_range;
pub mod docker;
pub mod error;
pub mod file_attributes;
pub mod file_comparison;
pub mod file_rename;
pub mod file_replacement;
pub mod general;
pub mod httpie;
pub mod image_compression;
pub mod json_sort;
pub mod markdown;
pub mod multi_cursor;
pub mod prettier;
pub mod spreadsheet;
pub mod sql_sales;
pub mod unicode_data;
pub mod zip_csv;

pub use error::HandlerError;

use crate::model::{Answer, DockerCredentials, HandlerConfig};
use crate::service::llm::GenerativeModel;
use crate::service::upload::{ScratchSpace, UploadedFile};

pub type HandlerResult = Result<Answer, HandlerError>;

const MISSING_ZIP: &str = "Invalid or missing ZIP file";
const MISSING_FILE: &str = "No file provided";

/// Everything a handler may use while answering one question
pub struct HandlerContext<'a> {
    pub question: &'a str,
    pub upload: Option<&'a UploadedFile>,
    pub model: &'a dyn GenerativeModel,
    pub http: &'a reqwest::Client,
    pub settings: &'a HandlerConfig,
    pub docker: &'a DockerCredentials,
    pub scratch: &'a ScratchSpace,
}

impl<'a> HandlerContext<'a> {
    pub fn require_file(&self) -> Result<&'a UploadedFile, HandlerError> {
        self.upload.ok_or(HandlerError::MissingFile(MISSING_FILE))
    }

    /// The upload, provided its name ends in `.zip`
    pub fn require_zip(&self) -> Result<&'a UploadedFile, HandlerError> {
        match self.upload {
            Some(file) if file.has_extension("zip") => Ok(file),
            _ => Err(HandlerError::MissingFile(MISSING_ZIP)),
        }
    }
}

/// Run CPU- or disk-bound work off the async executor
pub(crate) async fn blocking<T, F>(work: F) -> Result<T, HandlerError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, HandlerError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| HandlerError::Internal(format!("Blocking task failed: {}", e)))?
}
