//! Dropped-write reporting
//!
//! Insert, update and delete callers never hold a handle, so a failed bulk
//! write cannot reach them. The executor reports it to a [`FailureSink`]
//! and moves on: delivery is at-most-once and nothing is retried.

use parking_lot::Mutex;

use crate::error::StoreError;
use crate::operation::{Document, Filter, OperationKind};

/// The item a dropped write was carrying
#[derive(Debug, Clone, PartialEq)]
pub enum FailedItem {
    Insert(Document),
    Update { filter: Filter, changes: Document },
    Delete(Filter),
}

/// A group of writes the store did not apply
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedWrite {
    pub kind: OperationKind,
    pub collection: String,

    /// The items that were lost, in arrival order
    pub items: Vec<FailedItem>,

    /// Why the call failed; for a partial failure, the first rejection
    pub error: StoreError,

    /// True when the whole bulk call failed rather than some items in it
    pub whole_group: bool,
}

/// Receives every write the engine drops
pub trait FailureSink: Send + Sync {
    fn report(&self, dropped: DroppedWrite);
}

/// Default sink: one `tracing` error event per dropped group
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn report(&self, dropped: DroppedWrite) {
        tracing::error!(
            kind = %dropped.kind,
            collection = %dropped.collection,
            items = dropped.items.len(),
            whole_group = dropped.whole_group,
            error = %dropped.error,
            "dropped {} write(s) on {}: {:?}",
            dropped.kind,
            dropped.collection,
            dropped.items
        );
    }
}

/// Sink that keeps every report in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    dropped: Mutex<Vec<DroppedWrite>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dropped(&self) -> Vec<DroppedWrite> {
        self.dropped.lock().clone()
    }

    /// Total number of items lost across all reports
    pub fn dropped_items(&self) -> usize {
        self.dropped.lock().iter().map(|d| d.items.len()).sum()
    }
}

impl FailureSink for CollectingSink {
    fn report(&self, dropped: DroppedWrite) {
        self.dropped.lock().push(dropped);
    }
}
