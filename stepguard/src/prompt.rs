//! Linearize a contract and its input values into generation-ready text.
//!
//! Field order is the contract's order, so a retry contract shows the
//! rejected outputs and the corrections before asking for new outputs.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;
use serde_json::Value;

use crate::core::contract::Contract;
use crate::core::types::Values;

const CONTRACT_TEMPLATE: &str = include_str!("prompts/contract.md");

/// One rendered `prefix value` line.
#[derive(Debug, Clone, Serialize)]
struct FieldLine {
    prefix: String,
    value: String,
}

/// Render `contract` with `values`.
///
/// Inputs without a value are skipped. The first output's prefix closes the
/// text as the completion cue.
pub fn render(contract: &Contract, values: &Values) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("contract", CONTRACT_TEMPLATE)?;

    let inputs: Vec<FieldLine> = contract
        .input_fields()
        .filter_map(|(name, field)| {
            let value = values.get(name)?;
            Some(FieldLine {
                prefix: field.prefix.clone(),
                value: display_value(value),
            })
        })
        .collect();
    let cue = contract
        .output_fields()
        .next()
        .map(|(_, field)| field.prefix.as_str())
        .unwrap_or_default();

    let template = env.get_template("contract")?;
    let rendered = template.render(context! {
        instructions => (!contract.instructions().trim().is_empty()).then(|| contract.instructions().trim()),
        inputs => inputs,
        cue => cue,
    })?;
    Ok(rendered)
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contract::build_retry_contract;
    use crate::test_support::values;
    use serde_json::json;

    fn qa() -> Contract {
        Contract::builder("Answer questions with short factoid answers.")
            .input("question")
            .output("answer")
            .build()
            .expect("contract")
    }

    #[test]
    fn renders_instructions_inputs_and_cue() {
        let text = render(&qa(), &values(&[("question", json!("Capital of France?"))]))
            .expect("render");

        assert!(text.starts_with("Answer questions with short factoid answers."));
        assert!(text.contains("Question: Capital of France?"));
        assert!(text.trim_end().ends_with("Answer:"));
    }

    /// Retry prompts must show the rejected answer and the corrections before
    /// asking for a new answer.
    #[test]
    fn retry_prompt_orders_past_output_and_feedback_before_cue() {
        let text = render(
            &build_retry_contract(&qa()),
            &values(&[
                ("question", json!("Capital of France?")),
                ("past_answer", json!("Lyon")),
                ("feedback", json!("Answer with the capital city")),
            ]),
        )
        .expect("render");

        let question = text.find("Question:").expect("question");
        let past = text.find("Past Answer: Lyon").expect("past answer");
        let feedback = text
            .find("Instructions: Answer with the capital city")
            .expect("feedback");
        let cue = text.rfind("Answer:").expect("cue");

        assert!(question < past, "question before past answer");
        assert!(past < feedback, "past answer before feedback");
        assert!(feedback < cue, "feedback before cue");
    }

    #[test]
    fn missing_inputs_are_skipped() {
        let text = render(&build_retry_contract(&qa()), &values(&[("question", json!(1))]))
            .expect("render");
        assert!(text.contains("Question: 1"));
        assert!(!text.contains("Instructions:"));
    }
}
