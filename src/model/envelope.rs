//! Result envelope returned by every handler and by the `/api/` endpoint

use serde::Serialize;
use serde_json::{Map, Value};

/// Coarse error taxonomy surfaced in `debug_info.kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The question or the uploaded file cannot be processed as asked
    Input,
    /// The model, a remote HTTP service or a subprocess failed
    ExternalService,
    /// Anything else (I/O, database, encoder failures)
    Internal,
}

/// Diagnostic block attached to error envelopes
#[derive(Debug, Clone, Serialize)]
pub struct DebugInfo {
    pub kind: ErrorKind,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// A successful handler result: the answer plus handler-specific details
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub answer: Value,
    pub details: Map<String, Value>,
}

impl Answer {
    pub fn new(answer: impl Into<Value>) -> Self {
        Self {
            answer: answer.into(),
            details: Map::new(),
        }
    }

    /// Attach an extra top-level field to the envelope
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// `{status: success|error, ...}` response body
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Envelope {
    Success {
        answer: Value,
        #[serde(flatten)]
        details: Map<String, Value>,
    },
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        classification: Option<String>,
        debug_info: DebugInfo,
    },
}

impl Envelope {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Envelope::Success { .. } => None,
            Envelope::Error { debug_info, .. } => Some(debug_info.kind),
        }
    }
}

impl From<Answer> for Envelope {
    fn from(answer: Answer) -> Self {
        Envelope::Success {
            answer: answer.answer,
            details: answer.details,
        }
    }
}
