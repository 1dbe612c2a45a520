//! Single-slot undo for suggestion requests

use crate::params::{ParamValues, ParameterStore};

/// Pre-suggestion copy of every parameter
///
/// One slot only: a second capture before a restore discards the first.
#[derive(Debug, Clone, Default)]
pub struct UndoSnapshot {
    slot: Option<ParamValues>,
}

impl UndoSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy the store's current values into the slot
    pub fn capture(&mut self, store: &ParameterStore) {
        self.slot = Some(store.snapshot());
    }

    /// Write the captured values back and empty the slot.
    ///
    /// Locks are ignored. Returns `false` if nothing was captured.
    pub fn restore(&mut self, store: &ParameterStore) -> bool {
        match self.slot.take() {
            Some(values) => {
                store.restore(&values);
                true
            }
            None => false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.slot.is_some()
    }

    /// The captured values, if any
    pub fn values(&self) -> Option<&ParamValues> {
        self.slot.as_ref()
    }
}
