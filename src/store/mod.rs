//! Store Module
//!
//! The backing document store, seen by the engine as four opaque calls.
//!
//! ## Responsibilities
//! - `DocumentStore`: the bulk-write and query surface the executor drives
//! - `MemoryStore`: an in-process implementation with a call log
//!
//! Connection pooling and thread safety belong to the store: the executor
//! shares one instance across all four queues and calls it from several
//! threads at once.

mod memory;

pub use memory::{MemoryStore, StoreCall};

use crate::error::StoreError;
use crate::operation::{Document, Filter, FindOptions};

/// Result alias for store calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A single item of a bulk call that the store refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Position of the item within the bulk call
    pub index: usize,

    pub error: StoreError,
}

/// Outcome of a bulk write that reached the store
///
/// A store returns `Err` only when the call failed as a whole; per-item
/// rejections are reported in `failures`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    /// Items sent in the call
    pub attempted: usize,

    /// Documents inserted, modified or removed
    pub affected: usize,

    /// Items the store rejected
    pub failures: Vec<ItemFailure>,
}

impl BulkWriteResult {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Backing store driven by the batch executor
pub trait DocumentStore: Send + Sync {
    /// Insert all documents into `collection`, in order
    fn insert_many(&self, collection: &str, documents: &[Document]) -> StoreResult<BulkWriteResult>;

    /// Apply `(filter, changes)` pairs in order
    fn update_many(
        &self,
        collection: &str,
        updates: &[(Filter, Document)],
    ) -> StoreResult<BulkWriteResult>;

    /// Remove every document matching any of the filters
    fn delete_many(&self, collection: &str, filters: &[Filter]) -> StoreResult<BulkWriteResult>;

    /// Run one query
    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>>;
}
