//! Test-only helpers: scripted predictors and counting steps.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use anyhow::anyhow;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::core::contract::Contract;
use crate::core::types::Values;
use crate::error::{ConstraintError, HardConstraintViolation, SoftConstraintViolation};
use crate::step::{Predictor, Step};

/// Build [`Values`] from `(name, value)` pairs, keeping their order.
pub fn values(pairs: &[(&str, Value)]) -> Values {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// One recorded predictor call.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictorCall {
    pub contract: Contract,
    pub inputs: Values,
}

/// Predictor that returns queued outputs in order and records every call.
#[derive(Debug)]
pub struct ScriptedPredictor {
    contract: Contract,
    outputs: RefCell<VecDeque<Values>>,
    calls: RefCell<Vec<PredictorCall>>,
}

impl ScriptedPredictor {
    pub fn new(contract: Contract, outputs: Vec<Values>) -> Self {
        Self {
            contract,
            outputs: RefCell::new(outputs.into()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<PredictorCall> {
        self.calls.borrow().clone()
    }
}

impl Predictor for ScriptedPredictor {
    fn contract(&self) -> &Contract {
        &self.contract
    }

    fn generate(&self, contract: &Contract, inputs: &Values) -> Result<Values, ConstraintError> {
        self.calls.borrow_mut().push(PredictorCall {
            contract: contract.clone(),
            inputs: inputs.clone(),
        });
        self.outputs
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted predictor for '{}' exhausted", self.contract).into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    Soft,
    Hard,
}

/// Step that fails its first `fail_first` calls, then returns `true`.
///
/// Failures are raised directly rather than through constraint evaluation, so
/// bypass flags do not suppress them.
#[derive(Debug)]
pub struct CountingStep {
    fail_first: u32,
    failure: FailureKind,
    calls: Cell<u32>,
}

impl CountingStep {
    pub fn failing_soft(fail_first: u32) -> Self {
        Self {
            fail_first,
            failure: FailureKind::Soft,
            calls: Cell::new(0),
        }
    }

    pub fn failing_hard(fail_first: u32) -> Self {
        Self {
            fail_first,
            failure: FailureKind::Hard,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.get()
    }
}

impl Step for CountingStep {
    type Output = bool;

    fn call(&self, ctx: &mut ExecutionContext, _inputs: &Values) -> Result<bool, ConstraintError> {
        let call = self.calls.get() + 1;
        self.calls.set(call);
        if call > self.fail_first {
            return Ok(true);
        }
        let message = format!("call {call} rejected");
        Err(match self.failure {
            FailureKind::Soft => {
                SoftConstraintViolation::new(message, None, ctx.trace().snapshot()).into()
            }
            FailureKind::Hard => HardConstraintViolation::new(message, ctx.trace().snapshot()).into(),
        })
    }
}
