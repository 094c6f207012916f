//! Total size of ZIP entries above a size and modification-time threshold

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use serde_json::json;

use super::archive;
use super::{HandlerContext, HandlerResult, blocking};
use crate::model::Answer;

const DEFAULT_MIN_SIZE: u64 = 9552;
const LISTING_FORMAT: &str = "%a, %d %b %Y, %I:%M %p";

static SIZE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)at\s+least\s+(\d+)\s+bytes").expect("valid size regex"));

// e.g. "on or after Fri, 10 Nov, 2000, 2:33 pm"; the weekday is not checked
static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)on\s+or\s+after\s+(?:[a-z]{3},\s*)?(\d{1,2})\s+([a-z]{3}),?\s+(\d{4}),?\s+(\d{1,2}):(\d{2})\s*([ap]m)",
    )
    .expect("valid reference time regex")
});

fn default_reference() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 11, 10)
        .and_then(|d| d.and_hms_opt(14, 33, 0))
        .unwrap_or_default()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Criteria {
    pub min_size: u64,
    pub modified_since: NaiveDateTime,
}

impl Criteria {
    pub fn from_question(question: &str) -> Self {
        let min_size = SIZE_PATTERN
            .captures(question)
            .and_then(|c| c[1].parse().ok())
            .unwrap_or(DEFAULT_MIN_SIZE);

        let modified_since = TIME_PATTERN
            .captures(question)
            .and_then(|c| {
                let normalized = format!("{} {} {} {}:{} {}", &c[1], &c[2], &c[3], &c[4], &c[5], &c[6]);
                NaiveDateTime::parse_from_str(&normalized, "%d %b %Y %I:%M %p").ok()
            })
            .unwrap_or_else(default_reference);

        Self {
            min_size,
            modified_since,
        }
    }

    pub fn matches(&self, size: u64, modified: Option<NaiveDateTime>) -> bool {
        size >= self.min_size
            && modified
                .and_then(truncate_to_minute)
                .is_some_and(|m| m >= self.modified_since)
    }
}

fn truncate_to_minute(time: NaiveDateTime) -> Option<NaiveDateTime> {
    time.with_second(0)?.with_nanosecond(0)
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_zip()?;
    let path = file.path().to_path_buf();
    let criteria = Criteria::from_question(ctx.question);

    let entries = blocking(move || archive::read_entries(&path)).await?;

    let mut total = 0u64;
    let mut filtered = Vec::new();
    for entry in entries.iter().filter(|e| criteria.matches(e.size, e.modified)) {
        total += entry.size;
        filtered.push(json!({
            "filename": entry.name,
            "size": entry.size,
            "modified": entry.modified.map(|m| m.format(LISTING_FORMAT).to_string()),
        }));
    }

    tracing::debug!(
        min_size = criteria.min_size,
        since = %criteria.modified_since,
        matched = filtered.len(),
        total,
        "Filtered archive entries"
    );

    Ok(Answer::new(total.to_string()).with("filtered_files", filtered))
}
