//! Summing symbol values across files in mixed text encodings
//!
//! `.csv` entries are comma-separated, CP-1252 for `data1.csv` and UTF-8
//! otherwise; `.txt` entries are tab-separated UTF-16.

use std::collections::HashSet;
use std::sync::LazyLock;

use encoding_rs::{Encoding, UTF_8, UTF_16LE, WINDOWS_1252};
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use super::archive::{self, ArchiveEntry};
use super::{HandlerContext, HandlerError, HandlerResult, blocking};
use crate::model::Answer;

const DEFAULT_SYMBOLS: [&str; 3] = ["†", "Š", "…"];

static SYMBOLS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)symbol\s+matches\s+(\S+(?:\s+OR\s+\S+)*)").expect("valid symbols regex")
});
static OR_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s+OR\s+").expect("valid OR regex"));

/// Target symbols named in the question, else the defaults
pub fn target_symbols(question: &str) -> Vec<String> {
    SYMBOLS_PATTERN
        .captures(question)
        .map(|c| {
            OR_SEPARATOR
                .split(&c[1])
                .map(|s| s.trim_end_matches([',', '.', '?', ';']).to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|symbols| !symbols.is_empty())
        .unwrap_or_else(|| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect())
}

/// Encoding and delimiter for an entry, or `None` to skip it
fn layout(entry: &ArchiveEntry) -> Option<(&'static Encoding, u8)> {
    if entry.has_extension(&["csv"]) {
        let encoding = if entry.name.contains("data1.csv") {
            WINDOWS_1252
        } else {
            UTF_8
        };
        Some((encoding, b','))
    } else if entry.has_extension(&["txt"]) {
        // decode() sniffs a BOM, so big-endian files still decode correctly
        Some((UTF_16LE, b'\t'))
    } else {
        None
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FileOutcome {
    Summed {
        filename: String,
        encoding: &'static str,
        file_total: f64,
        matched_rows: usize,
    },
    Skipped {
        filename: String,
        reason: String,
    },
    Failed {
        filename: String,
        error: String,
    },
}

fn sum_entry(
    entry: &ArchiveEntry,
    encoding: &'static Encoding,
    delimiter: u8,
    symbols: &HashSet<&str>,
) -> Result<FileOutcome, HandlerError> {
    let (text, _, had_errors) = encoding.decode(&entry.data);
    if had_errors {
        tracing::warn!(file = %entry.name, encoding = encoding.name(), "Replaced undecodable bytes");
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let (Some(symbol_col), Some(value_col)) = (column("symbol"), column("value")) else {
        return Ok(FileOutcome::Skipped {
            filename: entry.name.clone(),
            reason: "Missing required columns".to_string(),
        });
    };

    let mut total = 0.0;
    let mut matched = 0;
    for record in reader.records() {
        let record = record?;
        let symbol = record.get(symbol_col).unwrap_or("").trim();
        if !symbols.contains(symbol) {
            continue;
        }
        let raw = record.get(value_col).unwrap_or("").trim();
        let value: f64 = raw
            .parse()
            .map_err(|_| HandlerError::Input(format!("Non-numeric value {:?}", raw)))?;
        total += value;
        matched += 1;
    }

    Ok(FileOutcome::Summed {
        filename: entry.name.clone(),
        encoding: encoding.name(),
        file_total: total,
        matched_rows: matched,
    })
}

/// Integral totals print without a fractional part
fn format_total(total: f64) -> String {
    if total.fract() == 0.0 && total.abs() < 1e15 {
        format!("{}", total as i64)
    } else {
        total.to_string()
    }
}

pub fn sum_entries(entries: &[ArchiveEntry], symbols: &[String]) -> (f64, Vec<FileOutcome>) {
    let targets: HashSet<&str> = symbols.iter().map(String::as_str).collect();
    let mut total = 0.0;
    let mut outcomes = Vec::new();

    for entry in entries {
        let Some((encoding, delimiter)) = layout(entry) else {
            continue;
        };
        match sum_entry(entry, encoding, delimiter, &targets) {
            Ok(outcome) => {
                if let FileOutcome::Summed { file_total, .. } = &outcome {
                    total += file_total;
                }
                outcomes.push(outcome);
            }
            Err(e) => {
                tracing::warn!(file = %entry.name, error = %e, "Skipping unreadable file");
                outcomes.push(FileOutcome::Failed {
                    filename: entry.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    (total, outcomes)
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_zip()?;
    let path = file.path().to_path_buf();
    let symbols = target_symbols(ctx.question);

    let task_symbols = symbols.clone();
    let (total, outcomes) = blocking(move || {
        let entries = archive::read_entries(&path)?;
        Ok(sum_entries(&entries, &task_symbols))
    })
    .await?;

    Ok(Answer::new(format_total(total))
        .with("symbols", json!(symbols))
        .with("files", json!(outcomes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::archive::testing::zip_bytes;
    use crate::service::handlers::testing::Fixture;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    fn sample_zip() -> Vec<u8> {
        // CP-1252: 0x86 = †, 0x8A = Š
        let data1: &[u8] = b"symbol,value\n\x86,10\nA,5\n\x8A,1\n";
        let data2 = "symbol,value\nŠ,7\n…,2\nB,100\n".as_bytes();
        let data3 = utf16le_with_bom("symbol\tvalue\n…\t3\r\nC\t50\r\n");
        zip_bytes(&[
            ("data1.csv", data1),
            ("data2.csv", data2),
            ("data3.txt", data3.as_slice()),
            ("notes.md", b"ignored"),
        ])
    }

    #[test]
    fn test_target_symbols() {
        assert_eq!(
            target_symbols("Sum up all the values where the symbol matches œ OR Ž OR Ÿ across all three files."),
            vec!["œ", "Ž", "Ÿ"]
        );
        assert_eq!(target_symbols("Sum the values"), vec!["†", "Š", "…"]);
    }

    #[test]
    fn test_format_total() {
        assert_eq!(format_total(23.0), "23");
        assert_eq!(format_total(2.5), "2.5");
    }

    #[tokio::test]
    async fn test_handle_sums_across_encodings() {
        let fixture = Fixture::new(&[]).with_upload("q.zip", &sample_zip()).await;
        let answer = handle(&fixture.context("Sum the values for the default symbols"))
            .await
            .unwrap();

        // 10 + 1 + 7 + 2 + 3
        assert_eq!(answer.answer, "23");
        let files = answer.details["files"].as_array().unwrap();
        assert_eq!(files.len(), 3);
        assert_eq!(files[0]["encoding"], "windows-1252");
        assert_eq!(files[2]["matched_rows"], 1);
    }

    #[tokio::test]
    async fn test_bad_file_is_recorded_and_skipped() {
        let zip = zip_bytes(&[
            ("data2.csv", "symbol,value\nŠ,oops\n".as_bytes()),
            ("data4.csv", "symbol,value\n†,4\n".as_bytes()),
            ("other.csv", b"name,score\nx,1\n"),
        ]);
        let fixture = Fixture::new(&[]).with_upload("q.zip", &zip).await;
        let answer = handle(&fixture.context("Sum")).await.unwrap();

        assert_eq!(answer.answer, "4");
        let files = answer.details["files"].as_array().unwrap();
        assert!(files[0]["error"].as_str().unwrap().contains("oops"));
        assert_eq!(files[2]["reason"], "Missing required columns");
    }
}
