//! Operation records
//!
//! Constructors validate their inputs, so a record that exists is always
//! well-formed and malformed calls fail before reaching a queue.

use std::fmt;
use std::time::Instant;

use crate::error::{BatchError, Result};
use crate::operation::handle::select_channel;
use crate::operation::{Document, Filter, FindOptions, SelectHandle, SelectResolver};

/// Operation kinds, one queue each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
    Select,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Delete,
        OperationKind::Select,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Select => "select",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The work a record carries
#[derive(Debug)]
pub enum Operation {
    /// Insert a document
    Insert { document: Document },

    /// Set `changes` on every document matching `filter`
    Update { filter: Filter, changes: Document },

    /// Delete every document matching `filter`
    Delete { filter: Filter },

    /// Read matching documents and resolve the caller's handle
    Select {
        filter: Filter,
        options: FindOptions,
        reply: SelectResolver,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Insert { .. } => OperationKind::Insert,
            Operation::Update { .. } => OperationKind::Update,
            Operation::Delete { .. } => OperationKind::Delete,
            Operation::Select { .. } => OperationKind::Select,
        }
    }
}

/// One pending unit of work
#[derive(Debug)]
pub struct OperationRecord {
    collection: String,
    operation: Operation,
    enqueued_at: Instant,
}

impl OperationRecord {
    pub fn insert(collection: impl Into<String>, document: Document) -> Result<Self> {
        let collection = validate_collection(collection.into())?;
        Ok(Self::new(collection, Operation::Insert { document }))
    }

    pub fn update(
        collection: impl Into<String>,
        filter: Filter,
        changes: Document,
    ) -> Result<Self> {
        let collection = validate_collection(collection.into())?;
        validate_filter(OperationKind::Update, &filter)?;
        if changes.is_empty() {
            return Err(BatchError::InvalidOperation(
                "update requires a non-empty payload".to_string(),
            ));
        }
        Ok(Self::new(collection, Operation::Update { filter, changes }))
    }

    pub fn delete(collection: impl Into<String>, filter: Filter) -> Result<Self> {
        let collection = validate_collection(collection.into())?;
        validate_filter(OperationKind::Delete, &filter)?;
        Ok(Self::new(collection, Operation::Delete { filter }))
    }

    /// Build a select record and the handle its caller will wait on
    ///
    /// An empty filter is allowed here and selects the whole collection.
    pub fn select(
        collection: impl Into<String>,
        filter: Filter,
        options: FindOptions,
    ) -> Result<(Self, SelectHandle)> {
        let collection = validate_collection(collection.into())?;
        let (reply, handle) = select_channel();
        let record = Self::new(
            collection,
            Operation::Select {
                filter,
                options,
                reply,
            },
        );
        Ok((record, handle))
    }

    fn new(collection: String, operation: Operation) -> Self {
        Self {
            collection,
            operation,
            enqueued_at: Instant::now(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// When the record was created (diagnostics only)
    pub fn enqueued_at(&self) -> Instant {
        self.enqueued_at
    }

    pub fn into_parts(self) -> (String, Operation) {
        (self.collection, self.operation)
    }
}

fn validate_collection(collection: String) -> Result<String> {
    if collection.trim().is_empty() {
        return Err(BatchError::InvalidOperation(
            "collection name is required".to_string(),
        ));
    }
    Ok(collection)
}

fn validate_filter(kind: OperationKind, filter: &Filter) -> Result<()> {
    if filter.is_empty() {
        return Err(BatchError::InvalidOperation(format!(
            "{} requires a non-empty filter",
            kind
        )));
    }
    Ok(())
}
