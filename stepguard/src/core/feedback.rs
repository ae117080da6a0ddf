//! Per-step correction messages accumulated during one top-level call.

use crate::core::contract::StepRef;

/// Ordered, deduplicated feedback messages keyed by backtrack target.
///
/// Targets are compared structurally, so a linear scan keeps the store free of
/// hashing requirements on contracts. Pipelines hold a handful of steps.
#[derive(Debug, Clone, Default)]
pub struct FeedbackStore {
    entries: Vec<(StepRef, Vec<String>)>,
}

impl FeedbackStore {
    /// Record `message` for `target`. Returns `false` when it was already present.
    pub fn record(&mut self, target: &StepRef, message: &str) -> bool {
        let idx = match self.entries.iter().position(|(step, _)| step == target) {
            Some(idx) => idx,
            None => {
                self.entries.push((target.clone(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let messages = &mut self.entries[idx].1;
        if messages.iter().any(|existing| existing == message) {
            return false;
        }
        messages.push(message.to_string());
        true
    }

    /// Messages for `target` in insertion order.
    pub fn messages(&self, target: &StepRef) -> &[String] {
        self.entries
            .iter()
            .find(|(step, _)| step == target)
            .map(|(_, messages)| messages.as_slice())
            .unwrap_or(&[])
    }

    /// All messages for `target` joined by newlines.
    pub fn joined(&self, target: &StepRef) -> String {
        self.messages(target).join("\n")
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::contract::Contract;

    fn step(output: &str) -> StepRef {
        Contract::builder("")
            .input("question")
            .output(output)
            .build()
            .expect("contract")
            .into()
    }

    #[test]
    fn record_deduplicates_per_target() {
        let mut store = FeedbackStore::default();
        let target = step("answer");

        assert!(store.record(&target, "be brief"));
        assert!(store.record(&target, "cite a source"));
        assert!(!store.record(&target, "be brief"));

        assert_eq!(store.messages(&target), ["be brief", "cite a source"]);
        assert_eq!(store.joined(&target), "be brief\ncite a source");
    }

    #[test]
    fn targets_are_kept_apart() {
        let mut store = FeedbackStore::default();
        store.record(&step("answer"), "be brief");
        store.record(&step("query"), "be brief");

        assert_eq!(store.messages(&step("answer")).len(), 1);
        assert_eq!(store.messages(&step("query")).len(), 1);
        assert!(store.messages(&step("other")).is_empty());
        assert_eq!(store.joined(&step("other")), "");
    }
}
