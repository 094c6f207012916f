//! Replace `IITM` (any case) with `IIT Madras` across a ZIP and hash the result

use std::sync::LazyLock;

use regex::bytes::Regex;

use super::archive;
use super::{HandlerContext, HandlerResult, blocking};
use crate::model::Answer;

const REPLACEMENT: &[u8] = b"IIT Madras";

// Byte regex so non-UTF-8 files and CRLF endings pass through untouched
static IITM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i-u)iitm").expect("valid replacement regex"));

pub fn replace_iitm(content: &[u8]) -> Vec<u8> {
    IITM.replace_all(content, REPLACEMENT).into_owned()
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_zip()?;
    let path = file.path().to_path_buf();
    let workdir = ctx.scratch.create_dir("assignment-replace-")?;

    let (digest, processed) = blocking(move || {
        archive::extract_to(&path, workdir.path())?;
        let files = archive::files_under(workdir.path())?;

        let mut concatenated = Vec::new();
        for relative in &files {
            let target = workdir.path().join(relative);
            let replaced = replace_iitm(&std::fs::read(&target)?);
            std::fs::write(&target, &replaced)?;
            concatenated.extend_from_slice(&replaced);
        }

        let processed: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .collect();
        Ok((archive::sha256_hex(&concatenated), processed))
    })
    .await?;

    tracing::debug!(files = processed.len(), %digest, "Hashed replaced files");

    Ok(Answer::new(digest).with("processed_files", processed))
}
