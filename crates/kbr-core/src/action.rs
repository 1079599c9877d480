//! Diff actions and the per-kind plan produced by the Differ.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;

/// One outcome of comparing a single identity between a snapshot and live
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Present in both, and structurally equal: no change needed.
    Skip { identity: String },
    /// Present in the snapshot, absent live: would be created.
    Add { identity: String, entity: Entity },
    /// Present in both, but structurally different.
    Update {
        identity: String,
        from: Entity,
        to: Entity,
        /// Field names whose values differ between `from` and `to`.
        changed_fields: BTreeSet<String>,
    },
    /// Absent from the snapshot, present live: would be removed.
    Remove { identity: String, entity: Entity },
}

impl Action {
    /// The identity key this action concerns, regardless of variant.
    pub fn identity(&self) -> &str {
        match self {
            Action::Skip { identity }
            | Action::Add { identity, .. }
            | Action::Update { identity, .. }
            | Action::Remove { identity, .. } => identity,
        }
    }
}

/// The ordered, per-kind action list produced for one Kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindPlan {
    pub kind: String,
    pub actions: Vec<Action>,
}

impl KindPlan {
    /// True if every action in this kind's plan is a `Skip`.
    pub fn is_noop(&self) -> bool {
        self.actions.iter().all(|a| matches!(a, Action::Skip { .. }))
    }
}

/// A full restore plan: per-kind action lists in planner order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Plan {
    pub kinds: Vec<KindPlan>,
}

impl Plan {
    /// True if applying this plan would change nothing.
    pub fn is_noop(&self) -> bool {
        self.kinds.iter().all(KindPlan::is_noop)
    }

    /// Total count of `add` actions across all kinds.
    pub fn add_count(&self) -> usize {
        self.kinds
            .iter()
            .flat_map(|k| &k.actions)
            .filter(|a| matches!(a, Action::Add { .. }))
            .count()
    }

    /// Total count of `update` actions across all kinds.
    pub fn update_count(&self) -> usize {
        self.kinds
            .iter()
            .flat_map(|k| &k.actions)
            .filter(|a| matches!(a, Action::Update { .. }))
            .count()
    }

    /// Total count of `remove` actions across all kinds.
    pub fn remove_count(&self) -> usize {
        self.kinds
            .iter()
            .flat_map(|k| &k.actions)
            .filter(|a| matches!(a, Action::Remove { .. }))
            .count()
    }
}
