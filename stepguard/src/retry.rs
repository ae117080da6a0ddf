//! Predictor invocation as performed by the execution engine.
//!
//! When the predictor is the current backtrack target it runs under the
//! extended contract, with its rejected outputs and the accumulated feedback
//! merged into its inputs. Every invocation is recorded in the trace.

use serde_json::Value;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::core::contract::{FEEDBACK_FIELD, PAST_PREFIX, StepRef, build_retry_contract};
use crate::core::state::BacktrackArgs;
use crate::core::trace::TraceEntry;
use crate::core::types::Values;
use crate::error::ConstraintError;
use crate::step::Predictor;

impl ExecutionContext {
    /// Run `predictor` on `inputs` and record the invocation.
    pub fn invoke<P: Predictor + ?Sized>(
        &mut self,
        predictor: &P,
        inputs: Values,
    ) -> Result<Values, ConstraintError> {
        let step = StepRef::from(predictor.contract());
        let (contract, inputs) = match self.backtrack().args_for(&step) {
            Some(args) => {
                debug!(step = %step, "invoking backtrack target with retry contract");
                let contract = build_retry_contract(predictor.contract());
                let inputs = merge_backtrack_args(inputs, args, |name| {
                    contract.field(name).is_some()
                });
                (contract, inputs)
            }
            None => (predictor.contract().clone(), inputs),
        };

        let outputs = predictor.generate(&contract, &inputs)?;
        self.record(TraceEntry::new(step, inputs, outputs.clone()));
        Ok(outputs)
    }
}

/// Fill `past_<name>` and `feedback` inputs without overriding caller values.
fn merge_backtrack_args(
    mut inputs: Values,
    args: &BacktrackArgs,
    declared: impl Fn(&str) -> bool,
) -> Values {
    for (name, value) in &args.past_outputs {
        let key = format!("{PAST_PREFIX}{name}");
        if declared(&key) {
            inputs.entry(key).or_insert_with(|| value.clone());
        }
    }
    inputs
        .entry(FEEDBACK_FIELD.to_string())
        .or_insert_with(|| Value::String(args.feedback.clone()));
    inputs
}
