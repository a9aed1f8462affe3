//! Operation Module
//!
//! Values describing one pending unit of work.
//!
//! ## Responsibilities
//! - Document / filter / find-option types handed to the backing store
//! - Immutable operation records, validated at construction
//! - Single-resolution result handles for selects
//!
//! A record is created at the facade call site, sits in exactly one queue,
//! and is consumed by the flush that drains it.

mod document;
mod handle;
mod record;

pub use document::{into_document, Document, Filter, FindOptions, SortOrder};
pub use handle::{SelectHandle, SelectResolver, SelectResult};
pub use record::{Operation, OperationKind, OperationRecord};
