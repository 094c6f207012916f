//! Error types for category handlers

use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::model::ErrorKind;
use crate::service::command::CommandError;
use crate::service::llm::LlmError;

/// Error type for category handlers
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandlerError {
    #[error("{0}")]
    Input(String),

    #[error("{message}")]
    InputDetailed {
        message: String,
        details: Map<String, Value>,
    },

    #[error("{0}")]
    MissingFile(&'static str),

    #[error("Invalid ZIP archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Malformed CSV data: {0}")]
    Csv(#[from] csv::Error),

    #[error("Model request failed: {0}")]
    Model(#[from] LlmError),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Input error carrying structured diagnostics
    pub fn input_with(message: impl Into<String>, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("details".to_string(), other);
                map
            }
        };
        HandlerError::InputDetailed {
            message: message.into(),
            details,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            HandlerError::Input(_)
            | HandlerError::InputDetailed { .. }
            | HandlerError::MissingFile(_)
            | HandlerError::Archive(_)
            | HandlerError::Csv(_) => ErrorKind::Input,
            HandlerError::Image(image::ImageError::Decoding(_))
            | HandlerError::Image(image::ImageError::Unsupported(_)) => ErrorKind::Input,
            HandlerError::Model(_) | HandlerError::Http(_) | HandlerError::Command(_) => {
                ErrorKind::ExternalService
            }
            HandlerError::Io(_)
            | HandlerError::Database(_)
            | HandlerError::Image(_)
            | HandlerError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Structured diagnostics for the envelope's `debug_info`
    pub fn details(&self) -> Map<String, Value> {
        let value = match self {
            HandlerError::InputDetailed { details, .. } => return details.clone(),
            HandlerError::Command(CommandError::Failed {
                command,
                code,
                stdout,
                stderr,
            }) => json!({
                "command": command,
                "return_code": code,
                "stdout": stdout,
                "stderr": stderr,
            }),
            HandlerError::Command(CommandError::NotFound { program }) => json!({
                "program": program,
                "system_platform": std::env::consts::OS,
                "environment_path": std::env::var("PATH").unwrap_or_default(),
            }),
            HandlerError::Model(LlmError::Api { status, .. }) => json!({ "upstream_status": status }),
            HandlerError::Http(e) => json!({
                "url": e.url().map(|u| u.to_string()),
                "upstream_status": e.status().map(|s| s.as_u16()),
            }),
            _ => Value::Null,
        };

        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(HandlerError::Input("x".into()).kind(), ErrorKind::Input);
        assert_eq!(
            HandlerError::MissingFile("Invalid or missing ZIP file").kind(),
            ErrorKind::Input
        );
        assert_eq!(
            HandlerError::Model(LlmError::ParseError("bad".into())).kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(
            HandlerError::Command(CommandError::NotFound {
                program: "npx".into()
            })
            .kind(),
            ErrorKind::ExternalService
        );
        assert_eq!(
            HandlerError::Io(std::io::Error::other("disk")).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_command_failure_details() {
        let err = HandlerError::Command(CommandError::Failed {
            command: "npx -y prettier@3.4.2 README.md".into(),
            code: Some(2),
            stdout: String::new(),
            stderr: "boom".into(),
        });
        let details = err.details();
        assert_eq!(details["return_code"], 2);
        assert_eq!(details["stderr"], "boom");
        assert_eq!(details["command"], "npx -y prettier@3.4.2 README.md");
    }

    #[test]
    fn test_input_with_wraps_non_objects() {
        let err = HandlerError::input_with("Unable to extract two dates", json!(["2024-01-01"]));
        assert_eq!(err.to_string(), "Unable to extract two dates");
        assert_eq!(err.details()["details"], json!(["2024-01-01"]));
    }
}
