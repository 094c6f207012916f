//! Counting differing lines between the first two text files of a ZIP

use serde_json::json;

use super::archive::{self, ArchiveEntry};
use super::{HandlerContext, HandlerError, HandlerResult, blocking};
use crate::model::Answer;

/// Lines with their terminators, so `a\n` and `a\r\n` differ
fn lines(data: &[u8]) -> impl Iterator<Item = &[u8]> {
    data.split_inclusive(|b| *b == b'\n')
}

/// Positions where the two files differ, over the shorter file's length
pub fn count_differing_lines(a: &[u8], b: &[u8]) -> usize {
    lines(a).zip(lines(b)).filter(|(x, y)| x != y).count()
}

fn build_prompt(question: &str, files: &[&str]) -> String {
    format!(
        r#"Analyze the following question and determine the file comparison strategy:

Question: {question}

Available files: {files:?}

Respond with:
- line differences
- content similarity
- specific difference type"#
    )
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_zip()?;
    let path = file.path().to_path_buf();

    let candidates: Vec<ArchiveEntry> = blocking(move || {
        Ok(archive::read_entries(&path)?
            .into_iter()
            .filter(|e| e.has_extension(&["txt", "csv"]))
            .collect())
    })
    .await?;

    let names: Vec<&str> = candidates.iter().map(|e| e.name.as_str()).collect();
    let [first, second, ..] = candidates.as_slice() else {
        return Err(HandlerError::input_with(
            "Not enough files to compare",
            json!({ "files_found": names }),
        ));
    };

    let method = match ctx.model.generate(&build_prompt(ctx.question, &names), None).await {
        Ok(reply) if reply.to_lowercase().contains("line") => "line differences",
        Ok(_) => "default line differences",
        Err(e) => {
            tracing::warn!(error = %e, "Comparison strategy unavailable; comparing lines");
            "default line differences"
        }
    };

    let differing = count_differing_lines(&first.data, &second.data);

    Ok(Answer::new(differing.to_string())
        .with("comparison_method", method)
        .with("files_compared", json!([first.name, second.name])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::archive::testing::zip_bytes;
    use crate::service::handlers::testing::Fixture;

    #[test]
    fn test_count_differing_lines() {
        assert_eq!(count_differing_lines(b"a\nb\nc\n", b"a\nx\nc\n"), 1);
        // extra lines in the longer file are ignored
        assert_eq!(count_differing_lines(b"a\nb\n", b"a\nb\nc\nd\n"), 0);
        assert_eq!(count_differing_lines(b"a\r\n", b"a\n"), 1);
    }

    #[tokio::test]
    async fn test_handle_compares_first_two_files() {
        let zip = zip_bytes(&[
            ("image.png", b"\x89PNG"),
            ("a.txt", b"one\ntwo\nthree\n"),
            ("b.txt", b"one\nTWO\nTHREE\n"),
            ("c.txt", b"zzz\n"),
        ]);
        let fixture = Fixture::new(&["line differences"]).with_upload("q.zip", &zip).await;

        let answer = handle(&fixture.context("How many lines differ?")).await.unwrap();
        assert_eq!(answer.answer, "2");
        assert_eq!(answer.details["comparison_method"], "line differences");
        assert_eq!(answer.details["files_compared"], json!(["a.txt", "b.txt"]));
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let zip = zip_bytes(&[("a.csv", b"1\n"), ("b.csv", b"2\n")]);
        let fixture = Fixture::new(&[]).with_upload("q.zip", &zip).await;

        let answer = handle(&fixture.context("Compare")).await.unwrap();
        assert_eq!(answer.answer, "1");
        assert_eq!(answer.details["comparison_method"], "default line differences");
    }

    #[tokio::test]
    async fn test_needs_two_files() {
        let zip = zip_bytes(&[("a.txt", b"1\n")]);
        let fixture = Fixture::new(&[]).with_upload("q.zip", &zip).await;

        let err = handle(&fixture.context("Compare")).await.unwrap_err();
        assert_eq!(err.to_string(), "Not enough files to compare");
        assert_eq!(err.details()["files_found"], json!(["a.txt"]));
    }
}
