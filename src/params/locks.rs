//! Per-group lock flags
//!
//! Locks are toggled only by explicit user action and read by the suggestion
//! applier before any write. Undo and preset loads ignore them.

use std::sync::atomic::{AtomicBool, Ordering};

use super::{ParamGroup, ParamId};

/// One boolean lock flag per [`ParamGroup`]
#[derive(Debug, Default)]
pub struct LockState {
    locked: [AtomicBool; ParamGroup::COUNT],
}

impl LockState {
    /// All groups unlocked
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_locked(&self, group: ParamGroup, locked: bool) {
        self.locked[group.index()].store(locked, Ordering::Release);
    }

    /// Flip a group's lock and return the new state
    pub fn toggle(&self, group: ParamGroup) -> bool {
        !self.locked[group.index()].fetch_xor(true, Ordering::AcqRel)
    }

    pub fn is_group_locked(&self, group: ParamGroup) -> bool {
        self.locked[group.index()].load(Ordering::Acquire)
    }

    /// Whether `id` sits in a locked group
    pub fn is_locked(&self, id: ParamId) -> bool {
        self.is_group_locked(id.group())
    }

    /// Every parameter currently protected from automated mutation
    pub fn locked_params(&self) -> Vec<ParamId> {
        ParamId::ALL
            .iter()
            .copied()
            .filter(|&id| self.is_locked(id))
            .collect()
    }

    pub fn locked_groups(&self) -> Vec<ParamGroup> {
        ParamGroup::ALL
            .iter()
            .copied()
            .filter(|&g| self.is_group_locked(g))
            .collect()
    }
}
