//! Answering from the first CSV inside an uploaded ZIP

use super::archive::{self, ArchiveEntry};
use super::{HandlerContext, HandlerError, HandlerResult, blocking};
use crate::model::Answer;

/// Parsed CSV: header row plus data rows
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn parse(data: &[u8]) -> Result<Self, HandlerError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let rows = reader
            .records()
            .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, _>>()?;
        Ok(Self { headers, rows })
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// First value of the named column
    pub fn first_value(&self, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.first()?.get(index).map(String::as_str)
    }

    /// Plain-text rendering with space-padded columns
    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);
        fn cell(row: &[String], i: usize) -> &str {
            row.get(i).map(String::as_str).unwrap_or("")
        }

        let widths: Vec<usize> = (0..columns)
            .map(|i| {
                std::iter::once(cell(&self.headers, i))
                    .chain(self.rows.iter().map(|r| cell(r, i)))
                    .map(|c| c.chars().count())
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        std::iter::once(&self.headers)
            .chain(self.rows.iter())
            .map(|row| {
                (0..columns)
                    .map(|i| format!("{:<width$}", cell(row, i), width = widths[i]))
                    .collect::<Vec<_>>()
                    .join("  ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn build_prompt(question: &str, headers: &[String]) -> String {
    format!(
        r#"Given the CSV file contents and the question:
{question}

Columns in the CSV: {headers:?}

Determine the most relevant column or value to extract.
Respond with ONLY the column name or specific extraction instruction."#
    )
}

/// Strip quotes or backticks the model may wrap a column name in
fn clean_reply(reply: &str) -> &str {
    reply.trim().trim_matches(|c| matches!(c, '"' | '\'' | '`')).trim()
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let file = ctx.require_zip()?;
    let path = file.path().to_path_buf();

    let (entry, table) = blocking(move || {
        let entry = archive::read_entries(&path)?
            .into_iter()
            .find(|e| e.has_extension(&["csv"]))
            .ok_or_else(|| HandlerError::Input("No CSV file found in ZIP".into()))?;
        let table = Table::parse(&entry.data)?;
        Ok::<(ArchiveEntry, Table), HandlerError>((entry, table))
    })
    .await?;

    tracing::debug!(
        csv = %entry.name,
        columns = table.headers.len(),
        rows = table.rows.len(),
        "Loaded CSV from archive"
    );

    let reply = ctx
        .model
        .generate(&build_prompt(ctx.question, &table.headers), None)
        .await?;
    let instruction = clean_reply(&reply).to_string();

    let answer = match table.first_value(&instruction) {
        Some(value) => value.to_string(),
        None => table.render(),
    };

    Ok(Answer::new(answer).with("extraction_method", instruction))
}
