//! Typed failures raised while a step runs under constraints.
//!
//! Soft and hard violations are two variants of one error so the backtracking
//! controller can pattern-match on them while they unwind through arbitrarily
//! nested step calls.

use thiserror::Error;
use uuid::Uuid;

use crate::core::contract::StepRef;
use crate::core::trace::TraceEntry;

/// A required condition failed and no bypass was active.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct HardConstraintViolation {
    /// Identifier of the constraint that failed.
    pub id: Uuid,
    pub message: String,
    /// Trace contents at the moment the constraint was evaluated.
    pub trace: Vec<TraceEntry>,
}

impl HardConstraintViolation {
    pub fn new(message: impl Into<String>, trace: Vec<TraceEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            trace,
        }
    }
}

/// A preferred condition failed; the controller may retry the responsible step.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SoftConstraintViolation {
    pub id: Uuid,
    pub message: String,
    /// Step the constraint blames, if it named one.
    pub target: Option<StepRef>,
    pub trace: Vec<TraceEntry>,
}

impl SoftConstraintViolation {
    pub fn new(message: impl Into<String>, target: Option<StepRef>, trace: Vec<TraceEntry>) -> Self {
        Self {
            id: Uuid::new_v4(),
            message: message.into(),
            target,
            trace,
        }
    }
}

/// Everything a step invocation can fail with.
#[derive(Debug, Error)]
pub enum ConstraintError {
    /// A constraint was built from something other than a boolean. Never
    /// bypassed and never retried.
    #[error("constraint result must be a boolean, found {found}")]
    InvalidConstraintResult { found: String },
    #[error("hard constraint violated: {0}")]
    Hard(#[from] HardConstraintViolation),
    #[error("soft constraint violated: {0}")]
    Soft(#[from] SoftConstraintViolation),
    #[error(transparent)]
    Contract(#[from] ContractError),
    /// Failure of a collaborator (generation backend, step body).
    #[error(transparent)]
    Step(#[from] anyhow::Error),
}

impl ConstraintError {
    pub fn is_hard(&self) -> bool {
        matches!(self, Self::Hard(_))
    }

    pub fn is_soft(&self) -> bool {
        matches!(self, Self::Soft(_))
    }
}

/// Invalid contract declarations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("{0} already exists in fields")]
    DuplicateField(String),
}
