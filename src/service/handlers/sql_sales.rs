//! Total sales for one ticket type in a SQLite `tickets` table

use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::model::Answer;

const DEFAULT_TICKET_TYPE: &str = "gold";

const SALES_QUERY: &str = r#"
SELECT
    CAST(SUM(units * price) AS REAL) AS total_sales,
    COUNT(*) AS row_count,
    GROUP_CONCAT(type) AS matched_types
FROM tickets
WHERE LOWER(TRIM(type)) = ?
"#;

const SAMPLE_TICKETS: [(&str, i64, f64); 5] = [
    ("silver", 422, 1.26),
    ("GOLD", 400, 0.63),
    ("GOLD", 460, 0.9),
    ("GOLD", 487, 1.25),
    ("BRONZE", 395, 0.74),
];

static TICKET_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["“']([^"”']+)["”']\s+ticket\s+type"#).expect("valid ticket type regex")
});

/// Ticket type quoted before "ticket type", lowercased and trimmed
pub fn ticket_type(question: &str) -> String {
    TICKET_TYPE
        .captures(question)
        .map(|c| c[1].trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| DEFAULT_TICKET_TYPE.to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct SalesSummary {
    pub total_sales: Option<f64>,
    pub row_count: i64,
    pub matched_types: Option<String>,
}

async fn sample_database() -> Result<SqliteConnection, sqlx::Error> {
    let mut conn = SqliteConnection::connect_with(&SqliteConnectOptions::from_str("sqlite::memory:")?).await?;
    sqlx::query("CREATE TABLE tickets (type TEXT, units INTEGER, price REAL)")
        .execute(&mut conn)
        .await?;
    for (kind, units, price) in SAMPLE_TICKETS {
        sqlx::query("INSERT INTO tickets (type, units, price) VALUES (?, ?, ?)")
            .bind(kind)
            .bind(units)
            .bind(price)
            .execute(&mut conn)
            .await?;
    }
    Ok(conn)
}

pub async fn summarize(
    conn: &mut SqliteConnection,
    ticket_type: &str,
) -> Result<SalesSummary, sqlx::Error> {
    let (total_sales, row_count, matched_types): (Option<f64>, i64, Option<String>) =
        sqlx::query_as(SALES_QUERY)
            .bind(ticket_type)
            .fetch_one(&mut *conn)
            .await?;
    Ok(SalesSummary {
        total_sales,
        row_count,
        matched_types,
    })
}

async fn summarize_upload(path: &Path, ticket_type: &str) -> Result<SalesSummary, sqlx::Error> {
    let options = SqliteConnectOptions::new().filename(path).read_only(true);
    let mut conn = SqliteConnection::connect_with(&options).await?;
    let summary = summarize(&mut conn, ticket_type).await?;
    conn.close().await?;
    Ok(summary)
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let ticket_type = ticket_type(ctx.question);

    let summary = match ctx.upload {
        Some(file) => summarize_upload(file.path(), &ticket_type)
            .await
            .map_err(|e| {
                HandlerError::Input(format!("Uploaded file is not a usable tickets database: {e}"))
            })?,
        None => {
            let mut conn = sample_database().await?;
            let summary = summarize(&mut conn, &ticket_type).await?;
            conn.close().await?;
            summary
        }
    };

    tracing::debug!(
        %ticket_type,
        rows = summary.row_count,
        total = ?summary.total_sales,
        "Summed ticket sales"
    );

    Ok(Answer::new(summary.total_sales.unwrap_or(0.0))
        .with("ticket_type", ticket_type)
        .with("row_count", summary.row_count)
        .with("matched_types", summary.matched_types))
}
