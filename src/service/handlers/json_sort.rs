//! Sorting a JSON array of people by age and/or name

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use super::{HandlerContext, HandlerError, HandlerResult};
use crate::model::Answer;

static AGE_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bages?\b").expect("valid age regex"));
static NAME_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bnames?\b").expect("valid name regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    AgeThenName,
    Age,
    Name,
    Unchanged,
}

impl SortKey {
    /// Interpret the model's free-text sort instruction
    pub fn from_instruction(instruction: &str) -> Self {
        match (AGE_WORD.is_match(instruction), NAME_WORD.is_match(instruction)) {
            (true, true) => SortKey::AgeThenName,
            (true, false) => SortKey::Age,
            (false, true) => SortKey::Name,
            (false, false) => SortKey::Unchanged,
        }
    }
}

fn sample_people() -> Vec<Value> {
    [
        ("Alice", 80),
        ("Bob", 52),
        ("Charlie", 1),
        ("David", 10),
        ("Emma", 34),
        ("Frank", 17),
        ("Grace", 79),
        ("Henry", 61),
        ("Ivy", 66),
        ("Jack", 25),
        ("Karen", 21),
        ("Liam", 69),
        ("Mary", 78),
        ("Nora", 25),
        ("Oscar", 12),
        ("Paul", 66),
    ]
    .into_iter()
    .map(|(name, age)| json!({ "name": name, "age": age }))
    .collect()
}

/// First JSON array of objects embedded in the question
fn embedded_array(question: &str) -> Option<Vec<Value>> {
    question.match_indices('[').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&question[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Array(items)))
                if !items.is_empty() && items.iter().all(Value::is_object) =>
            {
                Some(items)
            }
            _ => None,
        }
    })
}

fn compare_age(a: &Value, b: &Value) -> Ordering {
    let age = |v: &Value| v.get("age").and_then(Value::as_f64);
    age(a).partial_cmp(&age(b)).unwrap_or(Ordering::Equal)
}

fn compare_name(a: &Value, b: &Value) -> Ordering {
    let name = |v: &Value| v.get("name").and_then(Value::as_str).map(str::to_owned);
    name(a).cmp(&name(b))
}

/// Stable sort of `people` by `key`
pub fn sort_people(people: &mut [Value], key: SortKey) {
    match key {
        SortKey::AgeThenName => {
            people.sort_by(|a, b| compare_age(a, b).then_with(|| compare_name(a, b)))
        }
        SortKey::Age => people.sort_by(compare_age),
        SortKey::Name => people.sort_by(compare_name),
        SortKey::Unchanged => {}
    }
}

fn build_prompt(question: &str) -> String {
    format!(
        r#"Analyze the following question and determine the sorting criteria:
{question}

Possible sorting keys:
- Sort by age (ascending)
- Sort by name (alphabetical)
- Sort by age, then by name

Respond with ONLY the sorting instruction."#
    )
}

pub async fn handle(ctx: &HandlerContext<'_>) -> HandlerResult {
    let mut people = embedded_array(ctx.question).unwrap_or_else(sample_people);

    let instruction = ctx
        .model
        .generate(&build_prompt(ctx.question), None)
        .await?
        .trim()
        .to_lowercase();
    let key = SortKey::from_instruction(&instruction);

    tracing::debug!(?key, count = people.len(), "Sorting JSON array");
    sort_people(&mut people, key);

    let compact = serde_json::to_string(&people)
        .map_err(|e| HandlerError::Internal(format!("Failed to serialise sorted JSON: {}", e)))?;

    Ok(Answer::new(compact).with("sort_method", instruction))
}
