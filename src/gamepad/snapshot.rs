//! Most recently decoded controller state.
//!
//! Single writer (the decoder path in [`super::InputDispatcher`]), any
//! number of readers.  Updates replace the whole record, and readers get
//! a copy, so a reader never sees half of an update.

use super::report::{decode, ControllerState};
use crate::error::DecodeError;

#[derive(Clone, Debug, Default)]
pub struct SnapshotStore {
    latest: Option<ControllerState>,
    updates: u32,
}

impl SnapshotStore {
    pub const fn new() -> Self {
        Self {
            latest: None,
            updates: 0,
        }
    }

    /// Decode `data` and, only on success, replace the stored state.
    pub fn update(&mut self, data: &[u8]) -> Result<ControllerState, DecodeError> {
        let state = decode(data)?;
        self.latest = Some(state);
        self.updates = self.updates.wrapping_add(1);
        Ok(state)
    }

    /// Copy of the latest state, if any report has been decoded yet.
    pub fn latest(&self) -> Option<ControllerState> {
        self.latest
    }

    /// Number of successful updates since creation.
    pub fn updates(&self) -> u32 {
        self.updates
    }
}
