// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation diffing between two spec snapshots.
//!
//! Given the currently-running set of specs and a newly-loaded set, compute
//! which labels must stop, which must start, and which can be hot-reloaded
//! in place — the partition described in spec.md §3.

use indexmap::IndexMap;

use crate::label::Label;
use crate::spec::{ServiceType, VersionedServiceSpec};

/// The outcome of reconciling a current spec set against a new one.
///
/// `stop`, `start`, and `reload` are always pairwise disjoint: every label
/// present in more than one of `stop`/`start` would indicate a bug in
/// [`reconcile`], not a legitimate state (the P5 property in spec.md §7).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileDiff {
    pub stop: Vec<Label>,
    pub start: Vec<Label>,
    pub reload: Vec<Label>,
}

impl ReconcileDiff {
    pub fn is_empty(&self) -> bool {
        self.stop.is_empty() && self.start.is_empty() && self.reload.is_empty()
    }
}

/// Diff `current` against `next`.
///
/// - `reload`: label exists in both, `hot_reloadable` is true, and the specs
///   differ *only* in their resolved version bytes.
/// - `stop`: label exists only in `current`, or exists in both with a
///   non-reload-eligible difference. Labels of type [`ServiceType::Group`]
///   are never stopped — a group has no running process of its own.
/// - `start`: label exists only in `next`, plus every label that was placed
///   in `stop` (other than the ones no longer present at all) because it
///   needs to come back up under the new spec.
pub fn reconcile(
    current: &IndexMap<Label, VersionedServiceSpec>,
    next: &IndexMap<Label, VersionedServiceSpec>,
) -> ReconcileDiff {
    let mut diff = ReconcileDiff::default();

    for (label, current_spec) in current {
        match next.get(label) {
            None => {
                if current_spec.spec.ty != ServiceType::Group {
                    diff.stop.push(label.clone());
                }
            }
            Some(next_spec) => {
                if current_spec.is_identical(next_spec) {
                    continue;
                }
                if current_spec.spec.hot_reloadable
                    && next_spec.spec.hot_reloadable
                    && current_spec.differs_only_in_version(next_spec)
                {
                    diff.reload.push(label.clone());
                } else {
                    if current_spec.spec.ty != ServiceType::Group {
                        diff.stop.push(label.clone());
                    }
                    diff.start.push(label.clone());
                }
            }
        }
    }

    for label in next.keys() {
        if !current.contains_key(label) {
            diff.start.push(label.clone());
        }
    }

    diff
}

#[cfg(test)]
#[path = "diff_tests.rs"]
mod tests;
