//! Invocation policies that scope the bypass flags for one call.
//!
//! Every wrapper restores the caller's settings on all exit paths and keeps
//! the wrapped step's signature (the swallowing wrapper only widens the
//! output to `Option`).

use tracing::debug;

use crate::context::ExecutionContext;
use crate::core::types::{SettingsOverride, Values};
use crate::error::ConstraintError;
use crate::step::Step;

/// Bypass configuration applied around a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Both constraint kinds fail normally.
    Strict,
    /// Soft failures are logged only; hard failures still abort.
    SuggestOnlyBypass,
    /// Hard failures are logged only; soft handling is left as configured.
    AssertOnlyBypass,
    /// Both kinds are logged only.
    FullBypass,
}

impl Policy {
    pub fn overrides(self) -> SettingsOverride {
        let (bypass_hard, bypass_soft) = match self {
            Policy::Strict => (Some(false), Some(false)),
            Policy::SuggestOnlyBypass => (Some(false), Some(true)),
            Policy::AssertOnlyBypass => (Some(true), None),
            Policy::FullBypass => (Some(true), Some(true)),
        };
        SettingsOverride {
            bypass_hard,
            bypass_soft,
        }
    }
}

/// A step running under a [`Policy`].
#[derive(Debug, Clone)]
pub struct Wrapped<S> {
    inner: S,
    policy: Policy,
}

impl<S> Wrapped<S> {
    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Step> Step for Wrapped<S> {
    type Output = S::Output;

    fn call(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Values,
    ) -> Result<Self::Output, ConstraintError> {
        let mut scoped = ctx.scoped(self.policy.overrides());
        self.inner.call(&mut scoped, inputs)
    }

    fn is_transformed(&self) -> bool {
        self.inner.is_transformed()
    }
}

/// Run `step` under `policy` on every call.
pub fn wrap<S: Step>(step: S, policy: Policy) -> Wrapped<S> {
    Wrapped {
        inner: step,
        policy,
    }
}

/// A strict step whose hard violations become an empty result.
#[derive(Debug, Clone)]
pub struct SwallowHard<S> {
    inner: S,
}

impl<S: Step> Step for SwallowHard<S> {
    type Output = Option<S::Output>;

    fn call(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Values,
    ) -> Result<Self::Output, ConstraintError> {
        let mut scoped = ctx.scoped(Policy::Strict.overrides());
        match self.inner.call(&mut scoped, inputs) {
            Ok(output) => Ok(Some(output)),
            Err(ConstraintError::Hard(violation)) => {
                debug!(message = %violation.message, "hard constraint failure swallowed");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn is_transformed(&self) -> bool {
        self.inner.is_transformed()
    }
}

/// Run `step` strictly and turn a hard violation into `None`.
pub fn swallow_hard_to_empty<S: Step>(step: S) -> SwallowHard<S> {
    SwallowHard { inner: step }
}
