//! Trigger statistics.

use std::collections::{BTreeMap, HashMap};

use crate::binding::BindingType;

/// Per-round bookkeeping carried from the first step to the terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundState {
    visited: Vec<String>,
    invoked: usize,
}

impl RoundState {
    /// Records that an event of `name` is about to run.
    pub(crate) fn visit(&mut self, name: String) {
        if !self.visited.contains(&name) {
            self.visited.push(name);
        }
    }

    pub(crate) fn record_invocation(&mut self) {
        self.invoked += 1;
    }

    /// Distinct pattern names visited so far, in first-visit order.
    #[must_use]
    pub fn visited(&self) -> &[String] {
        &self.visited
    }

    /// Handler invocations so far.
    #[must_use]
    pub const fn invoked(&self) -> usize {
        self.invoked
    }
}

/// Count of completed rounds per pattern name, per binding type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerStats {
    counts: HashMap<BindingType, BTreeMap<String, u64>>,
}

impl TriggerStats {
    /// Adds one to each name visited by a completed round.
    pub(crate) fn record(&mut self, binding_type: BindingType, round: &RoundState) {
        if round.visited.is_empty() {
            return;
        }
        let counts = self.counts.entry(binding_type).or_default();
        for name in &round.visited {
            *counts.entry(name.clone()).or_insert(0) += 1;
        }
    }

    /// Counts for `binding_type`.
    #[must_use]
    pub fn get(&self, binding_type: BindingType) -> BTreeMap<String, u64> {
        self.counts.get(&binding_type).cloned().unwrap_or_default()
    }

    /// Clears every count.
    pub fn clear(&mut self) {
        self.counts.clear();
    }
}
