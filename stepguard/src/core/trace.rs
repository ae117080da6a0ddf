//! Ordered log of executed step invocations for one top-level call.

use crate::core::contract::StepRef;
use crate::core::types::Values;

/// Output key under which earlier corrections may be carried by a step.
pub const PRIOR_FEEDBACK_KEY: &str = "_prior_feedback";
/// Output key under which an earlier trace may be carried by a step.
pub const PRIOR_TRACE_KEY: &str = "_prior_trace";

const BOOKKEEPING_KEYS: [&str; 2] = [PRIOR_FEEDBACK_KEY, PRIOR_TRACE_KEY];

/// Snapshot of one step invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEntry {
    pub step: StepRef,
    pub inputs: Values,
    pub outputs: Values,
}

impl TraceEntry {
    /// Build an entry, stripping bookkeeping keys from `outputs` so corrective
    /// context never shows up as a past output on the next retry.
    pub fn new(step: StepRef, inputs: Values, mut outputs: Values) -> Self {
        for key in BOOKKEEPING_KEYS {
            outputs.shift_remove(key);
        }
        Self {
            step,
            inputs,
            outputs,
        }
    }
}

/// Append-only trace written by the execution engine, read by the controller.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    /// Copy of the current contents, oldest first.
    pub fn snapshot(&self) -> Vec<TraceEntry> {
        self.entries.clone()
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&TraceEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
