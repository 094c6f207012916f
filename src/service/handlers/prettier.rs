//! `npx -y prettier@<version> <file> | sha256sum`

use super::archive::sha256_hex;
use super::{HandlerContext, HandlerResult};
use crate::model::Answer;
use crate::service::command::CommandSpec;

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_file()?;

    let command = CommandSpec::new("npx")
        .arg("-y")
        .arg(format!("prettier@{}", ctx.settings.prettier_version))
        .arg(file.path().to_string_lossy());
    let output = command.run().await?;

    Ok(Answer::new(sha256_hex(output.stdout.as_bytes())).with("command", command.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::HandlerError;
    use crate::service::handlers::testing::Fixture;

    #[tokio::test]
    async fn test_requires_file() {
        let fixture = Fixture::new(&[]);
        let err = handle(&fixture.context("Run prettier")).await.unwrap_err();
        assert!(matches!(err, HandlerError::MissingFile(_)));
    }

    #[tokio::test]
    #[ignore = "needs npx and network access"]
    async fn test_formats_and_hashes() {
        let fixture = Fixture::new(&[])
            .with_upload("README.md", b"#  Title\n\n* item\n")
            .await;
        let answer = handle(&fixture.context("Run npx -y prettier@3.4.2 README.md | sha256sum"))
            .await
            .unwrap();

        assert_eq!(answer.answer.as_str().unwrap().len(), 64);
        assert!(answer.details["command"].as_str().unwrap().contains("prettier@3.4.2"));
    }
}
