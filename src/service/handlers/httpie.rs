//! httpbin `GET /get?email=...` request, as `uv run --with httpie` would issue it

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::model::Answer;

const HTTPBIN_GET: &str = "https://httpbin.org/get";

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"email set to (\S+)").expect("valid email regex"));

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let email = EMAIL_PATTERN
        .captures(ctx.question)
        .map(|c| c[1].to_string())
        .filter(|_| ctx.question.contains(HTTPBIN_GET))
        .ok_or_else(|| HandlerError::Input("Unable to extract email or URL from the question".into()))?;

    let url = format!("{}/get", ctx.settings.httpbin_base_url.trim_end_matches('/'));
    tracing::debug!(%url, %email, "Requesting httpbin");

    let response: Value = ctx
        .http
        .get(&url)
        .query(&[("email", email.as_str())])
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    let args = response.get("args").cloned().unwrap_or_else(|| Value::Object(Default::default()));
    let pretty = serde_json::to_string_pretty(&args)
        .map_err(|e| HandlerError::Internal(format!("Failed to format response args: {}", e)))?;

    Ok(Answer::new(pretty)
        .with("command", format!("uv run --with httpie -- {}?email={}", HTTPBIN_GET, email))
        .with("full_response", response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ErrorKind;
    use crate::service::handlers::testing::Fixture;
    use httpmock::prelude::*;
    use serde_json::json;

    const QUESTION: &str = "Running uv run --with httpie -- https [URL] installs the Python package httpie. Send a HTTPS request to https://httpbin.org/get with the URL encoded parameter email set to 22f3002248@ds.study.iitm.ac.in";

    #[tokio::test]
    async fn test_handle_returns_args() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/get")
                .query_param("email", "22f3002248@ds.study.iitm.ac.in");
            then.status(200).json_body(json!({
                "args": {"email": "22f3002248@ds.study.iitm.ac.in"},
                "url": "https://httpbin.org/get?email=22f3002248%40ds.study.iitm.ac.in"
            }));
        });

        let mut fixture = Fixture::new(&[]);
        fixture.settings.httpbin_base_url = server.base_url();
        let answer = handle(&fixture.context(QUESTION)).await.unwrap();

        mock.assert();
        assert_eq!(
            answer.answer,
            "{\n  \"email\": \"22f3002248@ds.study.iitm.ac.in\"\n}"
        );
        assert_eq!(
            answer.details["command"],
            "uv run --with httpie -- https://httpbin.org/get?email=22f3002248@ds.study.iitm.ac.in"
        );
        assert!(answer.details["full_response"]["url"].is_string());
    }

    #[tokio::test]
    async fn test_upstream_error_is_external() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/get");
            then.status(503);
        });

        let mut fixture = Fixture::new(&[]);
        fixture.settings.httpbin_base_url = server.base_url();
        let err = handle(&fixture.context(QUESTION)).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ExternalService);
        assert_eq!(err.details()["upstream_status"], 503);
    }

    #[tokio::test]
    async fn test_requires_httpbin_url() {
        let fixture = Fixture::new(&[]);
        let err = handle(&fixture.context("Send a request with email set to a@b.c"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }
}
