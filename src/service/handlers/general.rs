//! Fallback for questions without a dedicated handler

use super::{HandlerContext, HandlerResult};
use crate::model::Answer;

fn build_prompt(question: &str, file_provided: bool) -> String {
    format!(
        r#"Analyze the following question and provide a detailed processing strategy:

Question: {question}

File provided: {}

Provide:
1. A summary of the processing approach
2. Key steps to solve the question
3. Potential challenges"#,
        if file_provided { "Yes" } else { "No" }
    )
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file_provided = ctx.upload.is_some();
    let strategy = ctx
        .model
        .generate(&build_prompt(ctx.question, file_provided), None)
        .await?;

    Ok(Answer::new(strategy).with("file_provided", file_provided))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::HandlerError;
    use crate::service::handlers::testing::Fixture;

    #[tokio::test]
    async fn test_returns_model_strategy() {
        let fixture = Fixture::new(&["1. Read the file"]).with_upload("a.txt", b"x").await;
        let answer = handle(&fixture.context("Explain this")).await.unwrap();

        assert_eq!(answer.answer, "1. Read the file");
        assert_eq!(answer.details["file_provided"], true);
        assert!(fixture.model.prompts.lock().unwrap()[0].contains("File provided: Yes"));
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let fixture = Fixture::new(&[]);
        let err = handle(&fixture.context("Explain this")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Model(_)));
    }
}
