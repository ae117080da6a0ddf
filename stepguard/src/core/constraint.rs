//! Constraints: evaluated conditions a step places on its own outputs.

use serde_json::Value;
use uuid::Uuid;

use crate::core::contract::StepRef;
use crate::core::trace::TraceEntry;
use crate::core::types::Settings;
use crate::error::{ConstraintError, HardConstraintViolation, SoftConstraintViolation};

/// How a failed constraint propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// Fatal unless hard bypass is active.
    Hard,
    /// Triggers a backtrack unless soft bypass is active.
    Soft,
}

/// Result of evaluating a constraint against the active settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Satisfied,
    /// Failed, but the matching bypass flag is set.
    Bypassed,
    Violated,
}

/// An already-evaluated condition. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    id: Uuid,
    kind: ConstraintKind,
    satisfied: bool,
    message: String,
    target: Option<StepRef>,
}

impl Constraint {
    pub(crate) fn new(
        kind: ConstraintKind,
        satisfied: bool,
        message: impl Into<String>,
        target: Option<StepRef>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            satisfied,
            message: message.into(),
            target,
        }
    }

    /// Build from a loosely typed result. Only `Value::Bool` is accepted;
    /// truthy or falsy values of any other type are rejected.
    pub(crate) fn from_value(
        kind: ConstraintKind,
        value: &Value,
        message: impl Into<String>,
        target: Option<StepRef>,
    ) -> Result<Self, ConstraintError> {
        let Value::Bool(satisfied) = value else {
            return Err(ConstraintError::InvalidConstraintResult {
                found: value.to_string(),
            });
        };
        Ok(Self::new(kind, *satisfied, message, target))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn satisfied(&self) -> bool {
        self.satisfied
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn target(&self) -> Option<&StepRef> {
        self.target.as_ref()
    }

    pub fn verdict(&self, settings: Settings) -> Verdict {
        if self.satisfied {
            return Verdict::Satisfied;
        }
        let bypassed = match self.kind {
            ConstraintKind::Hard => settings.bypass_hard,
            ConstraintKind::Soft => settings.bypass_soft,
        };
        if bypassed {
            Verdict::Bypassed
        } else {
            Verdict::Violated
        }
    }

    /// Turn a failed constraint into the matching violation.
    pub fn into_violation(self, trace: Vec<TraceEntry>) -> ConstraintError {
        match self.kind {
            ConstraintKind::Hard => HardConstraintViolation {
                id: self.id,
                message: self.message,
                trace,
            }
            .into(),
            ConstraintKind::Soft => SoftConstraintViolation {
                id: self.id,
                message: self.message,
                target: self.target,
                trace,
            }
            .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const STRICT: Settings = Settings {
        bypass_hard: false,
        bypass_soft: false,
    };

    #[test]
    fn non_boolean_results_are_rejected_regardless_of_truthiness() {
        for value in [json!(1), json!(0), json!("true"), json!(""), json!(null), json!([true])] {
            let err = Constraint::from_value(ConstraintKind::Soft, &value, "", None)
                .expect_err("non-boolean must fail");
            assert!(
                matches!(err, ConstraintError::InvalidConstraintResult { .. }),
                "{value} should be rejected"
            );
        }
        let ok = Constraint::from_value(ConstraintKind::Hard, &json!(false), "m", None)
            .expect("bool accepted");
        assert!(!ok.satisfied());
    }

    #[test]
    fn verdict_honours_matching_bypass_flag_only() {
        let hard = Constraint::new(ConstraintKind::Hard, false, "h", None);
        let soft = Constraint::new(ConstraintKind::Soft, false, "s", None);
        let soft_bypass = Settings {
            bypass_hard: false,
            bypass_soft: true,
        };

        assert_eq!(hard.verdict(STRICT), Verdict::Violated);
        assert_eq!(hard.verdict(soft_bypass), Verdict::Violated);
        assert_eq!(soft.verdict(STRICT), Verdict::Violated);
        assert_eq!(soft.verdict(soft_bypass), Verdict::Bypassed);

        let passing = Constraint::new(ConstraintKind::Hard, true, "", None);
        assert_eq!(passing.verdict(STRICT), Verdict::Satisfied);
    }

    #[test]
    fn violation_keeps_id_message_and_target() {
        let soft = Constraint::new(ConstraintKind::Soft, false, "too long", None);
        let id = soft.id();
        match soft.into_violation(Vec::new()) {
            ConstraintError::Soft(violation) => {
                assert_eq!(violation.id, id);
                assert_eq!(violation.message, "too long");
                assert!(violation.target.is_none());
            }
            other => panic!("expected soft violation, got {other:?}"),
        }
    }

    #[test]
    fn every_constraint_gets_a_fresh_id() {
        let a = Constraint::new(ConstraintKind::Soft, true, "", None);
        let b = Constraint::new(ConstraintKind::Soft, true, "", None);
        assert_ne!(a.id(), b.id());
    }
}
