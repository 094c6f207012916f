//! Prompts for question classification

use crate::model::Category;

/// Instructions preceding the label list
pub const CLASSIFICATION_INSTRUCTIONS: &str = r#"Carefully analyze the following question and classify its type based on the processing requirements.

## Output Requirements

- Respond with ONLY the classification label, exactly as written below
- Do not add explanations, punctuation or formatting
- If no label fits, respond with UNKNOWN"#;

/// Build the classification prompt for one question
pub fn build_classification_prompt(question: &str) -> String {
    let labels = Category::ALL
        .iter()
        .map(|c| format!("- {}: {}", c.label(), c.description()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\n## Question\n\n{}\n\n## Possible Classifications\n\n{}\n",
        CLASSIFICATION_INSTRUCTIONS, question, labels
    )
}
