//! Flatten a ZIP into one directory, shift every digit in file names, hash the listing

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value, json};

use super::archive;
use super::{HandlerContext, HandlerError, HandlerResult, blocking};
use crate::model::Answer;

const FALLBACK_EXPLANATION: &str =
    "Processed files by moving from subdirectories and renaming digits";

/// Replace each digit `d` with `(d + 1) % 10`
pub fn shift_digits(name: &str) -> String {
    name.chars()
        .map(|c| match c.to_digit(10) {
            Some(d) => char::from_digit((d + 1) % 10, 10).unwrap_or(c),
            None => c,
        })
        .collect()
}

/// Split `name` into stem and extension; leading dots belong to the stem
fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(i) => name.split_at(leading + i),
        None => (name, ""),
    }
}

/// First free name among `name`, `stem_1.ext`, `stem_2.ext`, ...
pub fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = split_extension(name);
    (1..)
        .map(|n| format!("{}_{}{}", stem, n, ext))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// `name:content` for every non-empty file, sorted case-insensitively, newline-joined
pub fn listing(files: &[(String, Vec<u8>)]) -> String {
    let mut by_name: Vec<&(String, Vec<u8>)> = files.iter().collect();
    by_name.sort_by(|a, b| a.0.cmp(&b.0));

    let mut lines: Vec<String> = by_name
        .into_iter()
        .filter_map(|(name, data)| {
            // invalid UTF-8 is dropped rather than replaced
            let text = String::from_utf8_lossy(data).replace('\u{FFFD}', "");
            let content = text.trim();
            (!content.is_empty()).then(|| format!("{}:{}", name, content))
        })
        .collect();
    lines.sort_by_key(|line| line.to_lowercase());
    lines.join("\n")
}

struct Outcome {
    digest: String,
    moved: Vec<String>,
    renamed: Vec<(String, String)>,
}

/// Extract below `workdir/extracted`, flatten into `workdir/flat`, rename into `workdir/renamed`
fn flatten_and_rename(zip: &Path, workdir: &Path) -> Result<Outcome, HandlerError> {
    let extracted = workdir.join("extracted");
    let flat = workdir.join("flat");
    let renamed_dir = workdir.join("renamed");
    for dir in [&extracted, &flat, &renamed_dir] {
        std::fs::create_dir_all(dir)?;
    }
    archive::extract_to(zip, &extracted)?;

    let mut taken = HashSet::new();
    let mut moved = Vec::new();
    for relative in archive::files_under(&extracted)? {
        let Some(name) = relative.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let target = unique_name(&name, &taken);
        std::fs::rename(extracted.join(&relative), flat.join(&target))?;
        taken.insert(target.clone());
        moved.push(target);
    }

    // renaming into a separate directory keeps `a1` -> `a2` from clobbering an existing `a2`
    let mut renamed = Vec::with_capacity(moved.len());
    let mut contents = Vec::with_capacity(moved.len());
    for name in &moved {
        let new_name = shift_digits(name);
        std::fs::rename(flat.join(name), renamed_dir.join(&new_name))?;
        contents.push((new_name.clone(), std::fs::read(renamed_dir.join(&new_name))?));
        renamed.push((name.clone(), new_name));
    }

    Ok(Outcome {
        digest: archive::sha256_hex(listing(&contents).as_bytes()),
        moved,
        renamed,
    })
}

fn build_prompt(outcome: &Outcome) -> String {
    let mapping: Vec<String> = outcome
        .renamed
        .iter()
        .map(|(from, to)| format!("{} -> {}", from, to))
        .collect();
    format!(
        r#"Analyze the file processing task:
- Files moved: {}
- Files renamed: {}
- Rename mapping: {}
- SHA256 Hash: {}

Provide a brief explanation of the process."#,
        outcome.moved.len(),
        outcome.renamed.len(),
        mapping.join(", "),
        outcome.digest
    )
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_zip()?;
    let path = file.path().to_path_buf();
    let workdir = ctx.scratch.create_dir("assignment-rename-")?;

    let outcome = blocking(move || flatten_and_rename(&path, workdir.path())).await?;

    let explanation = match ctx.model.generate(&build_prompt(&outcome), None).await {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            tracing::warn!(error = %e, "No explanation from model");
            FALLBACK_EXPLANATION.to_string()
        }
    };

    let renamed: Map<String, Value> = outcome
        .renamed
        .into_iter()
        .map(|(from, to)| (from, Value::String(to)))
        .collect();

    Ok(Answer::new(outcome.digest)
        .with("moved_files", json!(outcome.moved))
        .with("renamed_files", Value::Object(renamed))
        .with("explanation", explanation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::archive::testing::zip_bytes;
    use crate::service::handlers::testing::Fixture;

    #[test]
    fn test_shift_digits() {
        assert_eq!(shift_digits("a1b9.txt"), "a2b0.txt");
        assert_eq!(shift_digits("plain.txt"), "plain.txt");
        assert_eq!(shift_digits("0123456789"), "1234567890");
    }

    #[test]
    fn test_unique_name() {
        let mut taken = HashSet::new();
        assert_eq!(unique_name("a.txt", &taken), "a.txt");
        taken.insert("a.txt".to_string());
        taken.insert("a_1.txt".to_string());
        assert_eq!(unique_name("a.txt", &taken), "a_2.txt");
        taken.insert(".env".to_string());
        assert_eq!(unique_name(".env", &taken), ".env_1");
    }

    #[test]
    fn test_listing_sorts_case_insensitively_and_skips_empty() {
        let files = vec![
            ("b.txt".to_string(), b"  second \n".to_vec()),
            ("A.txt".to_string(), b"first".to_vec()),
            ("empty.txt".to_string(), b"\n\n".to_vec()),
        ];
        assert_eq!(listing(&files), "A.txt:first\nb.txt:second");
    }

    #[tokio::test]
    async fn test_handle_flattens_renames_and_hashes() {
        let zip = zip_bytes(&[
            ("x1.txt", b"top"),
            ("sub/x1.txt", b"nested"),
            ("sub/deeper/y9.txt", b"deep"),
        ]);
        let fixture = Fixture::new(&["Moved and renamed."]).with_upload("q.zip", &zip).await;

        let answer = handle(&fixture.context("Move and rename")).await.unwrap();

        // sorted walk order: sub/deeper/y9.txt, sub/x1.txt, x1.txt
        assert_eq!(
            answer.details["moved_files"],
            json!(["y9.txt", "x1.txt", "x1_1.txt"])
        );
        assert_eq!(answer.details["renamed_files"]["x1_1.txt"], "x2_2.txt");
        assert_eq!(answer.details["explanation"], "Moved and renamed.");

        let expected = archive::sha256_hex(b"x2.txt:nested\nx2_2.txt:top\ny0.txt:deep");
        assert_eq!(answer.answer, expected);
    }

    #[tokio::test]
    async fn test_shifted_names_do_not_clobber() {
        let zip = zip_bytes(&[("a1.txt", b"one"), ("a2.txt", b"two")]);
        let fixture = Fixture::new(&["ok"]).with_upload("q.zip", &zip).await;

        let answer = handle(&fixture.context("Move and rename")).await.unwrap();
        assert_eq!(answer.answer, archive::sha256_hex(b"a2.txt:one\na3.txt:two"));
    }

    #[tokio::test]
    async fn test_explanation_falls_back() {
        let zip = zip_bytes(&[("a1.txt", b"one")]);
        let fixture = Fixture::new(&[]).with_upload("q.zip", &zip).await;

        let answer = handle(&fixture.context("Move and rename")).await.unwrap();
        assert_eq!(answer.details["explanation"], FALLBACK_EXPLANATION);
        assert_eq!(answer.answer, archive::sha256_hex(b"a2.txt:one"));
    }
}
