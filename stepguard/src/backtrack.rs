//! Bounded backtracking over soft constraint failures.
//!
//! Each top-level call makes at most `max_backtracks + 1` attempts:
//!
//! ```text
//! START -> RUNNING -> SUCCESS | FATAL | RUNNING (next attempt) -> ... -> FINAL_ATTEMPT -> SUCCESS | FATAL
//! ```
//!
//! A soft violation schedules a retry of the blamed step with feedback. A
//! hard violation (or any other error) ends the call at once. The final
//! attempt runs with soft bypass forced on so the call cannot loop forever.

use tracing::{debug, error, info, instrument};

use crate::context::ExecutionContext;
use crate::core::state::{BacktrackArgs, past_outputs, resolve_target};
use crate::core::types::Values;
use crate::error::{ConstraintError, SoftConstraintViolation};
use crate::io::config::BacktrackConfig;
use crate::policy::Policy;
use crate::step::Step;

/// Default bound on retries after the first attempt.
pub const DEFAULT_MAX_BACKTRACKS: u32 = 2;

/// The backtracking controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backtracker {
    max_backtracks: u32,
    bypass_soft_on_final: bool,
}

impl Default for Backtracker {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BACKTRACKS)
    }
}

impl Backtracker {
    pub fn new(max_backtracks: u32) -> Self {
        Self {
            max_backtracks,
            bypass_soft_on_final: true,
        }
    }

    pub fn from_config(config: &BacktrackConfig) -> Self {
        Self {
            max_backtracks: config.max_backtracks,
            bypass_soft_on_final: config.bypass_soft_on_final,
        }
    }

    /// When `false`, no final attempt is made: once the backtracks are used
    /// up the last soft violation is returned to the caller.
    pub fn with_bypass_soft_on_final(mut self, bypass: bool) -> Self {
        self.bypass_soft_on_final = bypass;
        self
    }

    pub fn max_backtracks(&self) -> u32 {
        self.max_backtracks
    }

    /// Run `step` with retries. Feedback and backtrack state start empty; an
    /// enclosing call gets its own back on return. The trace is never reset.
    #[instrument(skip_all, fields(max_backtracks = self.max_backtracks))]
    pub fn run<S: Step + ?Sized>(
        &self,
        step: &S,
        ctx: &mut ExecutionContext,
        inputs: &Values,
    ) -> Result<S::Output, ConstraintError> {
        let outer = ctx.begin_call();
        let outcome = self.run_attempts(step, ctx, inputs);
        ctx.end_call(outer);
        outcome
    }

    fn run_attempts<S: Step + ?Sized>(
        &self,
        step: &S,
        ctx: &mut ExecutionContext,
        inputs: &Values,
    ) -> Result<S::Output, ConstraintError> {
        let mut last_violation = None;
        for attempt in 0..self.max_backtracks {
            debug!(attempt, "starting attempt");
            match step.call(ctx, inputs) {
                Ok(output) => return Ok(output),
                Err(ConstraintError::Soft(violation)) => {
                    debug!(attempt, message = %violation.message, "soft constraint failed, backtracking");
                    schedule_retry(ctx, &violation);
                    last_violation = Some(violation);
                }
                Err(err) => return Err(err),
            }
        }

        let attempt = self.max_backtracks;
        if !self.bypass_soft_on_final {
            info!(attempt, "backtracks exhausted, skipping final attempt");
            let violation = last_violation.unwrap_or_else(|| {
                SoftConstraintViolation::new(
                    "no attempt allowed without final soft bypass",
                    None,
                    ctx.trace().snapshot(),
                )
            });
            return Err(violation.into());
        }

        info!(attempt, "final attempt with soft constraints bypassed");
        let mut scoped = ctx.scoped(Policy::SuggestOnlyBypass.overrides());
        step.call(&mut scoped, inputs)
    }
}

/// Run `step` with at most `max_backtracks` retries on soft violations.
///
/// Hard violations propagate unchanged and are never retried. The final
/// attempt bypasses soft constraints and its outcome is returned as-is.
pub fn run_with_backtrack<S: Step + ?Sized>(
    step: &S,
    ctx: &mut ExecutionContext,
    inputs: &Values,
    max_backtracks: u32,
) -> Result<S::Output, ConstraintError> {
    Backtracker::new(max_backtracks).run(step, ctx, inputs)
}

/// Resolve the blamed step and publish feedback and past outputs for it.
fn schedule_retry(ctx: &mut ExecutionContext, violation: &SoftConstraintViolation) {
    let Some(latest) = violation.trace.last() else {
        error!(message = %violation.message, "soft constraint failed with an empty trace; nothing to backtrack to");
        ctx.backtrack_mut().clear();
        return;
    };
    let Some(target) = resolve_target(&violation.trace, violation.target.as_ref()) else {
        error!(message = %violation.message, "backtrack target not found in trace");
        ctx.backtrack_mut().clear();
        return;
    };

    ctx.feedback_mut().record(&target, &violation.message);
    let args = BacktrackArgs {
        feedback: ctx.feedback().joined(&target),
        past_outputs: past_outputs(target.contract(), latest),
    };
    debug!(step = %target, "scheduled retry");
    ctx.backtrack_mut().set(target, args);
}
