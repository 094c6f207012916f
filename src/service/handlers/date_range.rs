//! Weekday counting over an inclusive date range

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, Weekday};
use regex::Regex;
use serde_json::json;

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::model::Answer;

static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("valid date regex"));

static WEEKDAY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(monday|tuesday|wednesday|thursday|friday|saturday|sunday)s?\b")
        .expect("valid weekday regex")
});

/// Weekday named in the question; Wednesday when none is
fn target_weekday(question: &str) -> Weekday {
    WEEKDAY_PATTERN
        .captures(question)
        .and_then(|c| c[1].parse::<Weekday>().ok())
        .unwrap_or(Weekday::Wed)
}

/// Count days in `start..=end` falling on `weekday`, stepping one day at a time
pub fn count_weekday(start: NaiveDate, end: NaiveDate, weekday: Weekday) -> u32 {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| day.weekday() == weekday)
        .count() as u32
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let dates: Vec<&str> = DATE_PATTERN
        .find_iter(ctx.question)
        .map(|m| m.as_str())
        .collect();

    if dates.len() != 2 {
        return Err(HandlerError::input_with(
            "Unable to extract two dates from the question",
            json!({ "found_dates": dates }),
        ));
    }

    let parse = |raw: &str| {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| HandlerError::Input(format!("Invalid date {}: {}", raw, e)))
    };
    let start = parse(dates[0])?;
    let end = parse(dates[1])?;
    let weekday = target_weekday(ctx.question);

    let count = count_weekday(start, end, weekday);

    tracing::debug!(%start, %end, ?weekday, count, "Counted weekdays in range");

    Ok(Answer::new(count)
        .with("start_date", start.format("%Y-%m-%d").to_string())
        .with("end_date", end.format("%Y-%m-%d").to_string())
        .with("weekday", format!("{:?}", weekday)))
}
