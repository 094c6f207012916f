//! Numeric evaluation of the spreadsheet formulas used in the assignments
//!
//! Google Sheets: `=SUM(ARRAY_CONSTRAIN(SEQUENCE(rows, cols, start, step), r, c))`
//! Excel: `=SUM(TAKE(SORTBY({values}, {keys}), rows, cols))`

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::model::Answer;

const DEFAULT_CONSTRAIN: (usize, usize) = (1, 10);
const DEFAULT_TAKE_COLUMNS: i64 = 6;

static SEQUENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)SEQUENCE\(\s*(\d+)\s*,\s*(\d+)\s*(?:,\s*(-?\d+)\s*)?(?:,\s*(-?\d+)\s*)?\)",
    )
    .expect("valid SEQUENCE regex")
});

static CONSTRAIN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ARRAY_CONSTRAIN\(\s*SEQUENCE\([^)]*\)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)")
        .expect("valid ARRAY_CONSTRAIN regex")
});

static ARRAY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("valid array literal regex"));

static TAKE_ARGS_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\)\s*,\s*(-?\d+)\s*(?:,\s*(-?\d+)\s*)?\)").expect("valid TAKE regex")
});

/// `SEQUENCE(rows, cols, start, step)`, filled row by row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sequence {
    pub rows: usize,
    pub cols: usize,
    pub start: i64,
    pub step: i64,
}

impl Sequence {
    pub fn value_at(&self, row: usize, col: usize) -> Option<i64> {
        let offset = (row as i128)
            .checked_mul(self.cols as i128)?
            .checked_add(col as i128)?;
        let value = offset
            .checked_mul(self.step as i128)?
            .checked_add(self.start as i128)?;
        i64::try_from(value).ok()
    }

    /// Sum of the top-left `rows` x `cols` block (ARRAY_CONSTRAIN then SUM)
    ///
    /// Closed form: `r*c*start + step * (c*cols*r(r-1)/2 + r*c(c-1)/2)`.
    pub fn constrained_sum(&self, rows: usize, cols: usize) -> Result<i64, HandlerError> {
        self.checked_block_sum(rows.min(self.rows) as i128, cols.min(self.cols) as i128)
            .and_then(|sum| i64::try_from(sum).ok())
            .ok_or_else(out_of_range)
    }

    fn checked_block_sum(&self, r: i128, c: i128) -> Option<i128> {
        let cells = r.checked_mul(c)?;
        let row_offsets = r.checked_mul(r - 1)? / 2;
        let col_offsets = c.checked_mul(c - 1)? / 2;
        let offsets = c
            .checked_mul(self.cols as i128)?
            .checked_mul(row_offsets)?
            .checked_add(r.checked_mul(col_offsets)?)?;
        cells
            .checked_mul(self.start as i128)?
            .checked_add(offsets.checked_mul(self.step as i128)?)
    }
}

fn out_of_range() -> HandlerError {
    HandlerError::Input("Formula result out of range".into())
}

fn parse_int<T: std::str::FromStr>(raw: &str) -> Result<T, HandlerError> {
    raw.trim()
        .parse()
        .map_err(|_| HandlerError::Input(format!("Invalid number in formula: {}", raw.trim())))
}

fn parse_sequence(question: &str) -> Result<(Sequence, (usize, usize)), HandlerError> {
    let caps = SEQUENCE_PATTERN
        .captures(question)
        .ok_or_else(|| HandlerError::Input("Unable to extract Google Sheets formula".into()))?;

    let sequence = Sequence {
        rows: parse_int(&caps[1])?,
        cols: parse_int(&caps[2])?,
        start: caps.get(3).map(|m| parse_int(m.as_str())).transpose()?.unwrap_or(1),
        step: caps.get(4).map(|m| parse_int(m.as_str())).transpose()?.unwrap_or(1),
    };

    let constrain = match CONSTRAIN_PATTERN.captures(question) {
        Some(c) => (parse_int(&c[1])?, parse_int(&c[2])?),
        None => DEFAULT_CONSTRAIN,
    };

    Ok((sequence, constrain))
}

pub async fn handle_google_sheets(ctx: &HandlerContext<'_>) -> HandlerResult {
    let (sequence, (rows, cols)) = parse_sequence(ctx.question)?;
    let sum = sequence.constrained_sum(rows, cols)?;

    tracing::debug!(?sequence, rows, cols, sum, "Evaluated SEQUENCE formula");

    Ok(Answer::new(sum))
}

/// SORTBY: stable ascending sort of `values` by `keys`; values without a key go last
pub fn sort_by_keys(values: &[i64], keys: &[i64]) -> Vec<i64> {
    let mut indexed: Vec<(usize, i64)> = values.iter().copied().enumerate().collect();
    indexed.sort_by_key(|(i, _)| keys.get(*i).map_or((1, 0), |k| (0, *k)));
    indexed.into_iter().map(|(_, v)| v).collect()
}

/// TAKE on a single-row array: `rows` must be non-zero; `cols` counts from the end when negative
pub fn take_row(row: &[i64], rows: i64, cols: Option<i64>) -> Result<Vec<i64>, HandlerError> {
    if rows == 0 || cols == Some(0) {
        return Err(HandlerError::Input(
            "TAKE with zero rows or columns yields an empty array".into(),
        ));
    }
    let taken = match cols {
        None => row.to_vec(),
        Some(n) if n > 0 => row.iter().take(n as usize).copied().collect(),
        Some(n) => {
            let n = n.unsigned_abs() as usize;
            row[row.len().saturating_sub(n)..].to_vec()
        }
    };
    Ok(taken)
}

fn parse_array(raw: &str) -> Result<Vec<i64>, HandlerError> {
    raw.split(',').map(parse_int::<i64>).collect()
}

pub async fn handle_excel(ctx: &HandlerContext<'_>) -> HandlerResult {
    let arrays: Vec<_> = ARRAY_PATTERN.captures_iter(ctx.question).collect();
    if arrays.len() < 2 {
        return Err(HandlerError::input_with(
            "Unable to extract arrays from the formula",
            json!({
                "array_matches": arrays.iter().map(|c| c[1].to_string()).collect::<Vec<_>>()
            }),
        ));
    }

    let values = parse_array(&arrays[0][1])?;
    let keys = parse_array(&arrays[1][1])?;

    // TAKE's arguments follow the closing paren of SORTBY
    let tail_start = arrays[1].get(0).map_or(0, |m| m.end());
    let (rows, cols) = match TAKE_ARGS_PATTERN.captures(&ctx.question[tail_start..]) {
        Some(c) => (
            parse_int(&c[1])?,
            c.get(2).map(|m| parse_int(m.as_str())).transpose()?,
        ),
        None => (1, Some(DEFAULT_TAKE_COLUMNS)),
    };

    let sorted = sort_by_keys(&values, &keys);
    let taken = take_row(&sorted, rows, cols)?;
    let sum = taken
        .iter()
        .try_fold(0i64, |acc, v| acc.checked_add(*v))
        .ok_or_else(out_of_range)?;

    tracing::debug!(?sorted, ?taken, sum, "Evaluated SORTBY/TAKE formula");

    Ok(Answer::new(sum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::handlers::testing::Fixture;

    #[test]
    fn test_sequence_is_row_major() {
        let seq = Sequence {
            rows: 3,
            cols: 4,
            start: 1,
            step: 2,
        };
        assert_eq!(seq.value_at(0, 0), Some(1));
        assert_eq!(seq.value_at(0, 3), Some(7));
        assert_eq!(seq.value_at(1, 0), Some(9));
        // full block: 1,3,...,23
        assert_eq!(
            seq.constrained_sum(10, 10).unwrap(),
            (0..12).map(|i| 1 + 2 * i).sum::<i64>()
        );
    }

    #[test]
    fn test_block_sum_matches_cell_by_cell() {
        let seq = Sequence {
            rows: 7,
            cols: 5,
            start: -4,
            step: 3,
        };
        for (rows, cols) in [(1, 1), (1, 5), (3, 2), (7, 5), (2, 9)] {
            let expected: i64 = (0..rows.min(7))
                .flat_map(|r| (0..cols.min(5)).map(move |c| (r, c)))
                .map(|(r, c)| seq.value_at(r, c).unwrap())
                .sum();
            assert_eq!(seq.constrained_sum(rows, cols).unwrap(), expected);
        }
        assert_eq!(seq.constrained_sum(0, 3).unwrap(), 0);
    }

    #[test]
    fn test_parse_sequence_defaults() {
        let (seq, constrain) = parse_sequence("=SUM(SEQUENCE(2, 3))").unwrap();
        assert_eq!(
            seq,
            Sequence {
                rows: 2,
                cols: 3,
                start: 1,
                step: 1
            }
        );
        assert_eq!(constrain, DEFAULT_CONSTRAIN);
    }

    #[tokio::test]
    async fn test_google_sheets_formula() {
        let fixture = Fixture::new(&[]);
        let answer = handle_google_sheets(&fixture.context(
            "Type this formula into Google Sheets: =SUM(ARRAY_CONSTRAIN(SEQUENCE(100, 100, 15, 7), 1, 10)) What is the result?",
        ))
        .await
        .unwrap();
        // 15 + 22 + ... + 78
        assert_eq!(answer.answer, json!(465));
    }

    #[tokio::test]
    async fn test_google_sheets_respects_constrain_arguments() {
        let fixture = Fixture::new(&[]);
        let answer = handle_google_sheets(
            &fixture.context("=SUM(ARRAY_CONSTRAIN(SEQUENCE(3, 3, 0, 1), 2, 2))"),
        )
        .await
        .unwrap();
        // 0 + 1 + 3 + 4
        assert_eq!(answer.answer, json!(8));
    }

    #[tokio::test]
    async fn test_google_sheets_without_formula() {
        let fixture = Fixture::new(&[]);
        let err = handle_google_sheets(&fixture.context("What does SUM do?"))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Input(_)));
    }

    #[test]
    fn test_sort_by_keys_is_stable_and_pushes_unkeyed_last() {
        assert_eq!(sort_by_keys(&[5, 6, 7, 8], &[2, 1, 2]), vec![6, 5, 7, 8]);
    }

    #[test]
    fn test_take_row() {
        let row = [1, 2, 3, 4];
        assert_eq!(take_row(&row, 1, Some(2)).unwrap(), vec![1, 2]);
        assert_eq!(take_row(&row, 1, Some(-2)).unwrap(), vec![3, 4]);
        assert_eq!(take_row(&row, 1, None).unwrap(), row.to_vec());
        assert_eq!(take_row(&row, 1, Some(10)).unwrap(), row.to_vec());
        assert!(take_row(&row, 0, Some(2)).is_err());
    }

    #[tokio::test]
    async fn test_excel_formula() {
        let fixture = Fixture::new(&[]);
        let answer = handle_excel(&fixture.context(
            "=SUM(TAKE(SORTBY({1,10,12,4,6,8,9,13,6,15,14,15,2,13,0,3}, {10,9,13,2,11,8,16,14,7,15,5,4,6,1,3,12}), 1, 6))",
        ))
        .await
        .unwrap();
        // keys 1..6 pick 13, 4, 0, 15, 14, 2
        assert_eq!(answer.answer, json!(48));
    }

    #[tokio::test]
    async fn test_excel_formula_needs_two_arrays() {
        let fixture = Fixture::new(&[]);
        let err = handle_excel(&fixture.context("=SUM(TAKE(SORTBY({1,2,3}), 1, 2))"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unable to extract arrays from the formula");
    }

    #[tokio::test]
    async fn test_google_sheets_overflow_is_input_error() {
        let fixture = Fixture::new(&[]);
        let err = handle_google_sheets(&fixture.context(
            "=SUM(ARRAY_CONSTRAIN(SEQUENCE(1, 10, 0, 9223372036854775807), 1, 10))",
        ))
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Formula result out of range");
    }

    #[tokio::test]
    async fn test_google_sheets_huge_block_is_computed_directly() {
        let fixture = Fixture::new(&[]);
        let answer = handle_google_sheets(&fixture.context(
            "=SUM(ARRAY_CONSTRAIN(SEQUENCE(100000, 100000, 0, 0), 100000, 100000))",
        ))
        .await
        .unwrap();
        assert_eq!(answer.answer, json!(0));

        let answer = handle_google_sheets(&fixture.context(
            "=SUM(ARRAY_CONSTRAIN(SEQUENCE(100000, 100000, 1, 1), 100000, 10))",
        ))
        .await
        .unwrap();
        assert_eq!(answer.answer, json!(4_999_950_005_500_000i64));

        // 1 + 2 + ... + 10^10 does not fit in i64
        let err = handle_google_sheets(&fixture.context(
            "=SUM(ARRAY_CONSTRAIN(SEQUENCE(100000, 100000, 1, 1), 100000, 100000))",
        ))
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Formula result out of range");
    }

    #[tokio::test]
    async fn test_excel_overflow_is_input_error() {
        let fixture = Fixture::new(&[]);
        let err = handle_excel(&fixture.context(
            "=SUM(TAKE(SORTBY({9223372036854775807,1}, {1,2}), 1, 2))",
        ))
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Formula result out of range");
    }
}
