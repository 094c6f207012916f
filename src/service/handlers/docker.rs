//! Build a minimal image and push it to Docker Hub

use std::sync::LazyLock;

use regex::Regex;

use super::{HandlerContext, HandlerResult};
use crate::model::Answer;
use crate::service::command::CommandSpec;

static TAG_NAMED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)tag\s+named\s+([A-Za-z0-9]+)").expect("valid tag regex"));
static ANY_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("valid digits regex"));

/// Alphanumeric token after "tag named", else the first digit run, else `default`
pub fn image_tag(question: &str, default: &str) -> String {
    TAG_NAMED
        .captures(question)
        .and_then(|c| c.get(1))
        .or_else(|| ANY_DIGITS.find(question))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| default.to_string())
}

pub fn dockerfile(tag: &str) -> String {
    format!(
        "FROM alpine:latest\nLABEL maintainer=\"{}\"\nCMD [\"echo\", \"TDS Assignment Image\"]\n",
        tag
    )
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let tag = image_tag(ctx.question, &ctx.settings.default_image_tag);
    let repository = format!(
        "{}/{}-{}",
        ctx.docker.username, ctx.settings.docker_repository_prefix, tag
    );
    let image = format!("{}:{}", repository, tag);

    let build_dir = ctx.scratch.create_dir("assignment-docker-")?;
    tokio::fs::write(build_dir.path().join("Dockerfile"), dockerfile(&tag)).await?;
    let context_dir = build_dir.path().to_string_lossy().into_owned();

    let steps = [
        CommandSpec::new("docker")
            .arg("login")
            .arg("-u")
            .arg(ctx.docker.username.as_str())
            .arg("--password-stdin")
            .stdin(ctx.docker.password.as_str()),
        CommandSpec::new("docker")
            .arg("build")
            .arg("-t")
            .arg(image.as_str())
            .arg(context_dir),
        CommandSpec::new("docker").arg("push").arg(image.as_str()),
    ];
    for step in &steps {
        tracing::info!(command = %step.display(), "Running docker step");
        step.run().await?;
    }

    Ok(Answer::new(format!(
        "https://hub.docker.com/repository/docker/{}/general",
        repository
    ))
    .with("repository_name", repository)
    .with("image_tag", tag))
}
