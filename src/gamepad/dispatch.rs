//! Delivers raw input reports to the registered consumer.
//!
//! Each report first refreshes the [`SnapshotStore`]; the consumer then
//! receives the unchanged bytes and can query the snapshot or decode
//! again itself.

use super::report::ControllerState;
use super::snapshot::SnapshotStore;

/// Consumer of raw input reports.
pub type InputCallback = fn(&[u8]);

#[derive(Default)]
pub struct InputDispatcher {
    snapshot: SnapshotStore,
    callback: Option<InputCallback>,
}

impl InputDispatcher {
    pub const fn new() -> Self {
        Self {
            snapshot: SnapshotStore::new(),
            callback: None,
        }
    }

    /// Register the consumer, replacing any previous one.
    pub fn register(&mut self, callback: InputCallback) {
        self.callback = Some(callback);
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }

    /// Update the snapshot from `data`, then hand `data` to the consumer.
    ///
    /// Payloads that fail to decode leave the snapshot alone but are
    /// still forwarded.
    pub fn dispatch(&mut self, data: &[u8]) {
        if let Err(e) = self.snapshot.update(data) {
            warn!("input report dropped from snapshot: {}", e);
        }
        if let Some(callback) = self.callback {
            callback(data);
        }
    }

    pub fn snapshot(&self) -> &SnapshotStore {
        &self.snapshot
    }

    /// Shorthand for `snapshot().latest()`.
    pub fn latest(&self) -> Option<ControllerState> {
        self.snapshot.latest()
    }
}
