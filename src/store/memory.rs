//! In-memory document store
//!
//! HashMap of collections wrapped in a RwLock. Supports unique fields (to
//! produce partial bulk failures), per-collection outage injection, and
//! records every call it receives.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;

use super::{BulkWriteResult, DocumentStore, ItemFailure, StoreResult};
use crate::error::StoreError;
use crate::operation::{Document, Filter, FindOptions, OperationKind};

/// One call received by the store
#[derive(Debug, Clone)]
pub struct StoreCall {
    pub kind: OperationKind,
    pub collection: String,

    /// Items in the bulk call (1 for a query)
    pub items: usize,

    pub at: Instant,
}

/// In-process implementation of [`DocumentStore`]
#[derive(Default)]
pub struct MemoryStore {
    /// collection -> documents in insertion order
    collections: RwLock<HashMap<String, Vec<Document>>>,

    /// collection -> fields whose values must be unique
    unique_fields: RwLock<HashMap<String, Vec<String>>>,

    /// collection -> error returned for every call touching it
    outages: RwLock<HashMap<String, StoreError>>,

    calls: Mutex<Vec<StoreCall>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject inserts that repeat an existing value of `field`
    pub fn with_unique_field(self, collection: &str, field: &str) -> Self {
        self.unique_fields
            .write()
            .entry(collection.to_string())
            .or_default()
            .push(field.to_string());
        self
    }

    /// Make every call against `collection` fail with `error`
    pub fn set_outage(&self, collection: &str, error: StoreError) {
        self.outages.write().insert(collection.to_string(), error);
    }

    pub fn clear_outage(&self, collection: &str) {
        self.outages.write().remove(collection);
    }

    /// Snapshot of a collection's documents
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Every call received so far, oldest first
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Calls of one kind
    pub fn calls_of(&self, kind: OperationKind) -> Vec<StoreCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.kind == kind)
            .cloned()
            .collect()
    }

    fn record(&self, kind: OperationKind, collection: &str, items: usize) {
        self.calls.lock().push(StoreCall {
            kind,
            collection: collection.to_string(),
            items,
            at: Instant::now(),
        });
    }

    fn check_outage(&self, collection: &str) -> StoreResult<()> {
        match self.outages.read().get(collection) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Values of `field` already taken in `docs`
    fn taken_values(docs: &[Document], field: &str) -> HashSet<String> {
        docs.iter()
            .filter_map(|doc| doc.get(field))
            .map(Value::to_string)
            .collect()
    }
}

impl DocumentStore for MemoryStore {
    fn insert_many(
        &self,
        collection: &str,
        documents: &[Document],
    ) -> StoreResult<BulkWriteResult> {
        self.record(OperationKind::Insert, collection, documents.len());
        self.check_outage(collection)?;

        let unique = self
            .unique_fields
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default();

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();

        let mut taken: Vec<(String, HashSet<String>)> = unique
            .iter()
            .map(|field| (field.clone(), Self::taken_values(docs.as_slice(), field)))
            .collect();

        let mut result = BulkWriteResult {
            attempted: documents.len(),
            ..Default::default()
        };

        // unordered bulk insert: a rejected item does not stop the rest
        for (index, document) in documents.iter().enumerate() {
            let duplicate = taken.iter().find_map(|(field, values)| {
                document
                    .get(field)
                    .filter(|value| values.contains(&value.to_string()))
                    .map(|value| format!("duplicate {} {}", field, value))
            });

            if let Some(reason) = duplicate {
                result.failures.push(ItemFailure {
                    index,
                    error: StoreError::Rejected(reason),
                });
                continue;
            }

            for (field, values) in taken.iter_mut() {
                if let Some(value) = document.get(field.as_str()) {
                    values.insert(value.to_string());
                }
            }
            docs.push(document.clone());
            result.affected += 1;
        }

        Ok(result)
    }

    fn update_many(
        &self,
        collection: &str,
        updates: &[(Filter, Document)],
    ) -> StoreResult<BulkWriteResult> {
        self.record(OperationKind::Update, collection, updates.len());
        self.check_outage(collection)?;

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();

        let mut result = BulkWriteResult {
            attempted: updates.len(),
            ..Default::default()
        };

        for (filter, changes) in updates {
            for doc in docs.iter_mut().filter(|doc| filter.matches(doc)) {
                for (field, value) in changes {
                    doc.insert(field.clone(), value.clone());
                }
                result.affected += 1;
            }
        }

        Ok(result)
    }

    fn delete_many(&self, collection: &str, filters: &[Filter]) -> StoreResult<BulkWriteResult> {
        self.record(OperationKind::Delete, collection, filters.len());
        self.check_outage(collection)?;

        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();

        let before = docs.len();
        docs.retain(|doc| !filters.iter().any(|filter| filter.matches(doc)));

        Ok(BulkWriteResult {
            attempted: filters.len(),
            affected: before - docs.len(),
            failures: Vec::new(),
        })
    }

    fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.record(OperationKind::Select, collection, 1);
        self.check_outage(collection)?;

        let matching: Vec<Document> = self
            .collections
            .read()
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).cloned().collect())
            .unwrap_or_default();

        Ok(options.apply(matching))
    }
}
