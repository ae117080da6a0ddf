//! Runtime constraints and bounded backtracking for step pipelines.
//!
//! A pipeline step checks its own outputs with two kinds of constraints:
//!
//! - **Hard constraints** abort the call unless the caller opted into a bypass.
//! - **Soft constraints** make the [`backtrack`] controller re-run the step,
//!   handing the responsible predictor its earlier outputs and the accumulated
//!   feedback through an extended contract.
//!
//! The crate keeps the same separation as the rest of the workspace:
//!
//! - **[`core`]**: Pure, deterministic logic (contracts, constraints, trace,
//!   feedback bookkeeping, target resolution). No I/O.
//! - **[`io`]**: Side-effecting helpers (configuration on disk).
//!
//! Orchestration modules ([`context`], [`retry`], [`backtrack`], [`policy`],
//! [`transform`]) thread an explicit [`context::ExecutionContext`] through
//! every call instead of relying on process-wide settings.

pub mod backtrack;
pub mod context;
pub mod core;
pub mod error;
pub mod io;
pub mod logging;
pub mod policy;
pub mod prompt;
pub mod retry;
pub mod step;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod transform;

pub use backtrack::{Backtracker, run_with_backtrack};
pub use context::ExecutionContext;
pub use crate::core::contract::{Contract, Field, FieldKind, StepRef, build_retry_contract};
pub use crate::core::types::{Settings, SettingsOverride, Values};
pub use error::{ConstraintError, HardConstraintViolation, SoftConstraintViolation};
pub use policy::{Policy, swallow_hard_to_empty, wrap};
pub use step::{Predictor, Step, from_fn};
pub use transform::{Handler, with_assertions};
