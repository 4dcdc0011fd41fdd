//! Delta calculation between a run's findings and the Seen-Set.
//!
//! A finding is new if and only if its identity key is absent from the
//! previous Seen-Set. Changes to fields outside the key are never reported.

use std::collections::HashSet;

use crate::models::{Finding, IdentityKey, Retention, SeenSet};

/// Outcome of comparing one run against the previous Seen-Set.
#[derive(Debug, Clone, Default)]
pub struct Delta {
    /// First finding for each key not seen before, in source order
    pub new_findings: Vec<Finding>,
    /// Every key observed by the current run
    pub current_keys: SeenSet,
}

impl Delta {
    /// Check if there is anything to report.
    pub fn has_changes(&self) -> bool {
        !self.new_findings.is_empty()
    }

    /// Seen-Set to persist at the end of the run.
    pub fn next_state(&self, previous: &SeenSet, retention: Retention) -> SeenSet {
        match retention {
            Retention::Replace => self.current_keys.clone(),
            Retention::Accumulate => previous.union(&self.current_keys).cloned().collect(),
        }
    }
}

/// Calculate `current − previous` keyed by identity.
pub fn calculate_delta(current: &[Finding], previous: &SeenSet) -> Delta {
    let mut current_keys = SeenSet::new();
    let mut reported: HashSet<IdentityKey> = HashSet::new();
    let mut new_findings = Vec::new();

    for finding in current {
        let key = finding.identity();
        if !previous.contains(&key) && !reported.contains(&key) {
            reported.insert(key.clone());
            new_findings.push(finding.clone());
        }
        current_keys.insert(key);
    }

    Delta {
        new_findings,
        current_keys,
    }
}
