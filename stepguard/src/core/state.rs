//! Backtrack bookkeeping carried from a failed attempt into the next one.

use serde_json::Value;

use crate::core::contract::{Contract, StepRef};
use crate::core::trace::TraceEntry;
use crate::core::types::Values;

/// Extra inputs handed to the backtrack target on the next attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktrackArgs {
    /// Every correction recorded for the target, newline separated.
    pub feedback: String,
    /// Rejected outputs keyed by the target's output field names.
    pub past_outputs: Values,
}

/// Which step to re-invoke, and with what, on the next attempt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktrackState {
    target: Option<StepRef>,
    args: Option<BacktrackArgs>,
}

impl BacktrackState {
    pub fn set(&mut self, target: StepRef, args: BacktrackArgs) {
        self.target = Some(target);
        self.args = Some(args);
    }

    pub fn clear(&mut self) {
        self.target = None;
        self.args = None;
    }

    pub fn target(&self) -> Option<&StepRef> {
        self.target.as_ref()
    }

    pub fn args(&self) -> Option<&BacktrackArgs> {
        self.args.as_ref()
    }

    /// Arguments for `step` if it is the current backtrack target.
    pub fn args_for(&self, step: &StepRef) -> Option<&BacktrackArgs> {
        match &self.target {
            Some(target) if target == step => self.args.as_ref(),
            _ => None,
        }
    }
}

/// Pick the step to retry for a soft violation.
///
/// With an explicit `target`, scan from the newest entry to the oldest for a
/// step with an equal contract. Without one, blame the newest entry.
pub fn resolve_target(trace: &[TraceEntry], target: Option<&StepRef>) -> Option<StepRef> {
    match target {
        Some(wanted) => trace
            .iter()
            .rev()
            .find(|entry| &entry.step == wanted)
            .map(|entry| entry.step.clone()),
        None => trace.last().map(|entry| entry.step.clone()),
    }
}

/// Collect the rejected outputs for `target_contract`.
///
/// Values are read from `latest` (the newest trace entry), not from the
/// target's own entry; names the entry lacks map to `null`.
pub fn past_outputs(target_contract: &Contract, latest: &TraceEntry) -> Values {
    target_contract
        .output_fields()
        .map(|(name, _)| {
            let value = latest.outputs.get(name).cloned().unwrap_or(Value::Null);
            (name.to_string(), value)
        })
        .collect()
}
