//! Attach an assertion handler to a step.

use serde_json::Value;
use tracing::{info, warn};

use crate::backtrack::Backtracker;
use crate::context::ExecutionContext;
use crate::core::types::{SettingsOverride, Values};
use crate::error::ConstraintError;
use crate::policy::Policy;
use crate::step::Step;

/// Input key a caller may set to toggle hard-constraint bypass for a call.
pub const BYPASS_ASSERT_KEY: &str = "bypass_assert";

/// How a transformed step reacts to constraint failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    /// Retry on soft failures with feedback.
    Backtrack(Backtracker),
    /// Run under a fixed bypass policy.
    Policy(Policy),
}

impl Default for Handler {
    fn default() -> Self {
        Handler::Backtrack(Backtracker::default())
    }
}

/// A step with an assertion handler attached.
#[derive(Debug, Clone)]
pub struct Asserted<S> {
    inner: S,
    handler: Handler,
}

impl<S> Asserted<S> {
    pub fn handler(&self) -> Handler {
        self.handler
    }
}

impl<S: Step> Step for Asserted<S> {
    type Output = S::Output;

    fn call(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Values,
    ) -> Result<Self::Output, ConstraintError> {
        match inputs.get(BYPASS_ASSERT_KEY) {
            Some(Value::Bool(bypass)) => ctx.configure(SettingsOverride {
                bypass_hard: Some(*bypass),
                bypass_soft: None,
            }),
            Some(other) => warn!(value = %other, "ignoring non-boolean {BYPASS_ASSERT_KEY}"),
            None => {}
        }

        match self.handler {
            Handler::Backtrack(backtracker) => backtracker.run(&self.inner, ctx, inputs),
            Handler::Policy(policy) => {
                let mut scoped = ctx.scoped(policy.overrides());
                self.inner.call(&mut scoped, inputs)
            }
        }
    }

    fn is_transformed(&self) -> bool {
        true
    }
}

/// Attach `handler` to `step`.
pub fn with_assertions<S: Step>(step: S, handler: Handler) -> Asserted<S> {
    if step.is_transformed() {
        info!("step already has an assertion handler; wrapping it again");
    }
    Asserted {
        inner: step,
        handler,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::from_fn;
    use crate::test_support::{CountingStep, values};
    use serde_json::json;

    #[test]
    fn default_handler_backtracks_twice() {
        let step = CountingStep::failing_soft(2);
        let transformed = with_assertions(&step, Handler::default());
        let mut ctx = ExecutionContext::default();

        assert!(transformed.call(&mut ctx, &Values::new()).expect("success"));
        assert_eq!(step.calls(), 3);
        assert!(transformed.is_transformed());
    }

    #[test]
    fn policy_handler_scopes_settings() {
        let step = from_fn(|ctx: &mut ExecutionContext, _inputs: &Values| {
            ctx.hard(false, "ignored")?;
            Ok(ctx.settings().bypass_hard)
        });
        let transformed = with_assertions(step, Handler::Policy(Policy::FullBypass));
        let mut ctx = ExecutionContext::default();

        assert!(transformed.call(&mut ctx, &Values::new()).expect("bypassed"));
        assert!(!ctx.settings().bypass_hard);
    }

    #[test]
    fn bypass_assert_input_configures_context() {
        let step = from_fn(|ctx: &mut ExecutionContext, _inputs: &Values| {
            ctx.hard(false, "would abort")?;
            Ok(())
        });
        let transformed = with_assertions(step, Handler::default());
        let mut ctx = ExecutionContext::default();

        transformed
            .call(&mut ctx, &values(&[(BYPASS_ASSERT_KEY, json!(true))]))
            .expect("bypassed");
        assert!(ctx.settings().bypass_hard);

        let err = transformed
            .call(&mut ctx, &values(&[(BYPASS_ASSERT_KEY, json!(false))]))
            .expect_err("strict again");
        assert!(err.is_hard());
    }

    #[test]
    fn non_boolean_bypass_assert_is_ignored() {
        let step = from_fn(|ctx: &mut ExecutionContext, _inputs: &Values| Ok(ctx.settings()));
        let transformed = with_assertions(step, Handler::Policy(Policy::Strict));
        let mut ctx = ExecutionContext::default();

        transformed
            .call(&mut ctx, &values(&[(BYPASS_ASSERT_KEY, json!("yes"))]))
            .expect("ok");
        assert!(!ctx.settings().bypass_hard);
    }

    #[test]
    fn transforming_twice_keeps_working() {
        let step = CountingStep::failing_soft(1);
        let once = with_assertions(&step, Handler::default());
        let twice = with_assertions(&once, Handler::Policy(Policy::Strict));
        let mut ctx = ExecutionContext::default();

        assert!(twice.call(&mut ctx, &Values::new()).expect("success"));
        assert_eq!(step.calls(), 2);
    }
}
