//! Per-call execution context threaded through every step invocation.
//!
//! Holds what would otherwise be process-wide: bypass flags, the trace, the
//! feedback store and the backtrack state. Each top-level call owns its
//! context, so concurrent calls cannot corrupt each other's bookkeeping.

use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tracing::error;

use crate::core::constraint::{Constraint, ConstraintKind, Verdict};
use crate::core::contract::{Contract, StepRef};
use crate::core::feedback::FeedbackStore;
use crate::core::state::BacktrackState;
use crate::core::trace::{Trace, TraceEntry};
use crate::core::types::{Settings, SettingsOverride};
use crate::error::ConstraintError;
use crate::io::config::BacktrackConfig;

#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    settings: Settings,
    trace: Trace,
    feedback: FeedbackStore,
    backtrack: BacktrackState,
    depth: u32,
}

/// Bookkeeping of an enclosing backtracking call, set aside while a nested
/// one runs.
#[derive(Debug)]
pub(crate) struct OuterCall {
    feedback: FeedbackStore,
    backtrack: BacktrackState,
}

impl ExecutionContext {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn from_config(config: &BacktrackConfig) -> Self {
        Self::new(config.settings())
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Apply `overrides` until changed again.
    pub fn configure(&mut self, overrides: SettingsOverride) {
        self.settings = self.settings.apply(overrides);
    }

    /// Apply `overrides` for the duration of the returned guard.
    ///
    /// The previous settings come back when the guard drops, whichever way the
    /// scoped call exits.
    pub fn scoped(&mut self, overrides: SettingsOverride) -> ScopedSettings<'_> {
        let prior = self.settings;
        self.configure(overrides);
        ScopedSettings { ctx: self, prior }
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Append a step snapshot. Called by the execution engine after every
    /// invocation, retried ones included.
    pub fn record(&mut self, entry: TraceEntry) {
        self.trace.push(entry);
    }

    pub fn feedback(&self) -> &FeedbackStore {
        &self.feedback
    }

    pub fn backtrack(&self) -> &BacktrackState {
        &self.backtrack
    }

    pub(crate) fn feedback_mut(&mut self) -> &mut FeedbackStore {
        &mut self.feedback
    }

    pub(crate) fn backtrack_mut(&mut self) -> &mut BacktrackState {
        &mut self.backtrack
    }

    /// Start a backtracking call with empty feedback and no target.
    ///
    /// The trace is left alone. When the call is nested in another one, the
    /// outer feedback and backtrack state are returned for [`end_call`](Self::end_call).
    pub(crate) fn begin_call(&mut self) -> Option<OuterCall> {
        self.depth += 1;
        let feedback = std::mem::take(&mut self.feedback);
        let backtrack = std::mem::take(&mut self.backtrack);
        (self.depth > 1).then_some(OuterCall {
            feedback,
            backtrack,
        })
    }

    /// Finish a backtracking call. A nested call hands the outer state back;
    /// a top-level call keeps its feedback readable and drops its target.
    pub(crate) fn end_call(&mut self, outer: Option<OuterCall>) {
        self.depth = self.depth.saturating_sub(1);
        match outer {
            Some(outer) => {
                self.feedback = outer.feedback;
                self.backtrack = outer.backtrack;
            }
            None => self.backtrack.clear(),
        }
    }

    /// Evaluate a hard constraint.
    pub fn hard(&self, satisfied: bool, message: impl Into<String>) -> Result<(), ConstraintError> {
        self.evaluate(Constraint::new(ConstraintKind::Hard, satisfied, message, None))
    }

    /// Evaluate a soft constraint that blames the most recent step.
    pub fn soft(&self, satisfied: bool, message: impl Into<String>) -> Result<(), ConstraintError> {
        self.evaluate(Constraint::new(ConstraintKind::Soft, satisfied, message, None))
    }

    /// Evaluate a soft constraint that blames the step declaring `target`.
    pub fn soft_targeting(
        &self,
        satisfied: bool,
        message: impl Into<String>,
        target: &Contract,
    ) -> Result<(), ConstraintError> {
        self.evaluate(Constraint::new(
            ConstraintKind::Soft,
            satisfied,
            message,
            Some(StepRef::from(target)),
        ))
    }

    /// Evaluate a constraint whose result comes from loosely typed data.
    pub fn check_value(
        &self,
        kind: ConstraintKind,
        value: &Value,
        message: impl Into<String>,
        target: Option<&Contract>,
    ) -> Result<(), ConstraintError> {
        let constraint = Constraint::from_value(kind, value, message, target.map(StepRef::from))?;
        self.evaluate(constraint)
    }

    fn evaluate(&self, constraint: Constraint) -> Result<(), ConstraintError> {
        let verdict = constraint.verdict(self.settings);
        if verdict == Verdict::Satisfied {
            return Ok(());
        }
        let kind = match constraint.kind() {
            ConstraintKind::Hard => "hard",
            ConstraintKind::Soft => "soft",
        };
        error!(
            kind,
            id = %constraint.id(),
            bypassed = verdict == Verdict::Bypassed,
            "constraint failed: {}",
            constraint.message()
        );
        match verdict {
            Verdict::Violated => Err(constraint.into_violation(self.trace.snapshot())),
            _ => Ok(()),
        }
    }
}

/// Settings override that is undone on drop.
#[derive(Debug)]
pub struct ScopedSettings<'a> {
    ctx: &'a mut ExecutionContext,
    prior: Settings,
}

impl Deref for ScopedSettings<'_> {
    type Target = ExecutionContext;

    fn deref(&self) -> &Self::Target {
        &*self.ctx
    }
}

impl DerefMut for ScopedSettings<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.ctx
    }
}

impl Drop for ScopedSettings<'_> {
    fn drop(&mut self) {
        self.ctx.settings = self.prior;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Values;
    use serde_json::json;

    fn contract() -> Contract {
        Contract::builder("")
            .input("question")
            .output("answer")
            .build()
            .expect("contract")
    }

    #[test]
    fn failed_hard_constraint_carries_trace_snapshot() {
        let mut ctx = ExecutionContext::default();
        ctx.record(TraceEntry::new(
            StepRef::from(contract()),
            Values::new(),
            Values::new(),
        ));

        let err = ctx.hard(false, "must cite").expect_err("violation");
        match err {
            ConstraintError::Hard(violation) => {
                assert_eq!(violation.message, "must cite");
                assert_eq!(violation.trace.len(), 1);
            }
            other => panic!("expected hard violation, got {other:?}"),
        }
    }

    #[test]
    fn bypass_flags_turn_failures_into_success() {
        let ctx = ExecutionContext::new(Settings {
            bypass_hard: true,
            bypass_soft: true,
        });
        ctx.hard(false, "ignored").expect("hard bypassed");
        ctx.soft(false, "ignored").expect("soft bypassed");
    }

    #[test]
    fn soft_targeting_names_the_step() {
        let ctx = ExecutionContext::default();
        let err = ctx
            .soft_targeting(false, "rephrase", &contract())
            .expect_err("violation");
        match err {
            ConstraintError::Soft(violation) => {
                assert_eq!(violation.target, Some(StepRef::from(contract())));
            }
            other => panic!("expected soft violation, got {other:?}"),
        }
    }

    #[test]
    fn check_value_rejects_non_booleans_even_when_bypassing() {
        let ctx = ExecutionContext::new(Settings {
            bypass_hard: true,
            bypass_soft: true,
        });
        let err = ctx
            .check_value(ConstraintKind::Hard, &json!(1), "numeric", None)
            .expect_err("invalid");
        assert!(matches!(err, ConstraintError::InvalidConstraintResult { .. }));
    }

    #[test]
    fn scoped_settings_are_restored_after_an_error() {
        let mut ctx = ExecutionContext::default();
        let scoped = ctx.scoped(SettingsOverride {
            bypass_hard: Some(true),
            bypass_soft: None,
        });
        assert!(scoped.settings().bypass_hard);
        let result = scoped.soft(false, "fails inside scope");
        drop(scoped);

        assert!(result.is_err());
        assert_eq!(ctx.settings(), Settings::default());
    }
}
