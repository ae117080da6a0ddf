//! Seams between the engine and the code it runs.
//!
//! A [`Predictor`] is the generation backend behind one contract. A [`Step`]
//! is any callable unit of pipeline work (usually a program that invokes
//! several predictors and checks constraints on their outputs); wrappers and
//! the backtracking controller take and return steps.

use crate::context::ExecutionContext;
use crate::core::contract::Contract;
use crate::core::types::Values;
use crate::error::ConstraintError;

/// Produces outputs for a contract.
pub trait Predictor {
    /// The contract this predictor declares.
    fn contract(&self) -> &Contract;

    /// Generate outputs for `contract`, which is either [`contract`](Self::contract)
    /// or its retry extension. Must not drop any of the original fields.
    fn generate(&self, contract: &Contract, inputs: &Values) -> Result<Values, ConstraintError>;
}

/// A callable unit of pipeline execution.
pub trait Step {
    type Output;

    fn call(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Values,
    ) -> Result<Self::Output, ConstraintError>;

    /// Whether an assertion handler is already attached.
    fn is_transformed(&self) -> bool {
        false
    }
}

impl<S: Step + ?Sized> Step for &S {
    type Output = S::Output;

    fn call(
        &self,
        ctx: &mut ExecutionContext,
        inputs: &Values,
    ) -> Result<Self::Output, ConstraintError> {
        (**self).call(ctx, inputs)
    }

    fn is_transformed(&self) -> bool {
        (**self).is_transformed()
    }
}

/// Step backed by a closure. Built with [`from_fn`].
#[derive(Debug, Clone, Copy)]
pub struct FnStep<F>(F);

/// Turn a closure into a [`Step`].
pub fn from_fn<F, T>(f: F) -> FnStep<F>
where
    F: Fn(&mut ExecutionContext, &Values) -> Result<T, ConstraintError>,
{
    FnStep(f)
}

impl<F, T> Step for FnStep<F>
where
    F: Fn(&mut ExecutionContext, &Values) -> Result<T, ConstraintError>,
{
    type Output = T;

    fn call(&self, ctx: &mut ExecutionContext, inputs: &Values) -> Result<T, ConstraintError> {
        (self.0)(ctx, inputs)
    }
}
