//! Published view of all consumer groups.

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::model::{Group, OffsetSnapshot};

/// Holds the latest merged snapshot.
///
/// Readers never block and never observe a half-built view: the refresher
/// builds a complete [`OffsetSnapshot`] off to the side and swaps it in with
/// [`OffsetStore::replace`]. Before the first refresh the store is empty.
pub struct OffsetStore {
    current: ArcSwap<OffsetSnapshot>,
}

impl Default for OffsetStore {
    fn default() -> Self {
        Self {
            current: ArcSwap::from_pointee(OffsetSnapshot::default()),
        }
    }
}

impl OffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically publish a new snapshot.
    pub fn replace(&self, snapshot: OffsetSnapshot) {
        self.current.store(Arc::new(snapshot));
    }

    /// The current snapshot. Consecutive calls on the returned value are
    /// consistent with each other.
    pub fn snapshot(&self) -> Arc<OffsetSnapshot> {
        self.current.load_full()
    }

    /// Group ids of the current snapshot, sorted.
    pub fn list(&self) -> Vec<String> {
        self.current.load().group_ids()
    }

    pub fn get(&self, group_id: &str) -> Option<Group> {
        self.current.load().get(group_id).cloned()
    }

    pub fn refreshed_at(&self) -> Option<i64> {
        self.current.load().refreshed_at
    }
}
