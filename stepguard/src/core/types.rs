//! Shared deterministic types for the constraint engine.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Named values flowing in or out of a step, in declaration order.
pub type Values = IndexMap<String, serde_json::Value>;

/// Execution switches consulted whenever a constraint fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Log failed hard constraints instead of aborting.
    pub bypass_hard: bool,
    /// Log failed soft constraints instead of requesting a retry.
    pub bypass_soft: bool,
}

impl Settings {
    /// Return these settings with every `Some` field of `overrides` applied.
    pub fn apply(self, overrides: SettingsOverride) -> Self {
        Self {
            bypass_hard: overrides.bypass_hard.unwrap_or(self.bypass_hard),
            bypass_soft: overrides.bypass_soft.unwrap_or(self.bypass_soft),
        }
    }
}

/// Partial update of [`Settings`]; `None` leaves the current value in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsOverride {
    pub bypass_hard: Option<bool>,
    pub bypass_soft: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_only_touches_overridden_fields() {
        let base = Settings {
            bypass_hard: true,
            bypass_soft: false,
        };
        let next = base.apply(SettingsOverride {
            bypass_hard: None,
            bypass_soft: Some(true),
        });
        assert_eq!(
            next,
            Settings {
                bypass_hard: true,
                bypass_soft: true
            }
        );
        assert_eq!(base.apply(SettingsOverride::default()), base);
    }
}
