//! `key=value` lines to a single JSON object

use serde_json::{Map, Value};

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::model::Answer;

/// Each `key=value` line (split at the first `=`) becomes an entry; later keys overwrite
pub fn lines_to_object(text: &str) -> Map<String, Value> {
    let mut object = Map::new();
    for line in text.lines() {
        if let Some((key, value)) = line.trim().split_once('=') {
            object.insert(key.trim().to_string(), Value::String(value.trim().to_string()));
        }
    }
    object
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_file()?;
    let bytes = file.read().await?;
    let text = String::from_utf8_lossy(&bytes);

    let object = lines_to_object(&text);
    tracing::debug!(file_name = file.file_name(), keys = object.len(), "Converted lines to JSON");

    let compact = serde_json::to_string(&object)
        .map_err(|e| HandlerError::Internal(format!("Failed to serialise JSON object: {}", e)))?;

    Ok(Answer::new(compact))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::testing::Fixture;

    #[test]
    fn test_lines_to_object_keeps_first_seen_order() {
        let object = lines_to_object("b = 2\na=1\r\nnoise line\nurl=http://x?y=z\nb=3\n");
        let keys: Vec<&String> = object.keys().collect();
        assert_eq!(keys, ["b", "a", "url"]);
        assert_eq!(object["b"], "3");
        assert_eq!(object["url"], "http://x?y=z");
    }

    #[tokio::test]
    async fn test_handle_compact_output() {
        let fixture = Fixture::new(&[])
            .with_upload("multi.txt", b"name=Ann\nage = 31\n")
            .await;
        let answer = handle(&fixture.context("Convert to JSON")).await.unwrap();
        assert_eq!(answer.answer, r#"{"name":"Ann","age":"31"}"#);
    }

    #[tokio::test]
    async fn test_handle_requires_file() {
        let fixture = Fixture::new(&[]);
        let err = handle(&fixture.context("Convert to JSON")).await.unwrap_err();
        assert_eq!(err.to_string(), "No file provided");
    }
}
