//! # batchq
//!
//! A write-behind micro-batching engine for a document store:
//! - Four independent queues (insert, update, delete, select)
//! - Dual-trigger flushes: interval elapsed or batch size reached
//! - One bulk call per collection per flush for writes
//! - Select waves that resolve each caller with its own rows
//! - Fire-and-forget writes with an injectable failure sink
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Callers (handlers)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ queue_insert / update / delete / select
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     QueueManager                            │
//! │        (validation, routing, flush, shutdown, stats)        │
//! └──────┬──────────────┬──────────────┬──────────────┬─────────┘
//!        ▼              ▼              ▼              ▼
//!   ┌─────────┐    ┌─────────┐    ┌─────────┐    ┌─────────┐
//!   │ insert  │    │ update  │    │ delete  │    │ select  │
//!   │ queue + │    │ queue + │    │ queue + │    │ queue + │
//!   │ flusher │    │ flusher │    │ flusher │    │ flusher │
//!   └────┬────┘    └────┬────┘    └────┬────┘    └────┬────┘
//!        └──────────────┴──────┬───────┴──────────────┘
//!                              ▼
//!                      ┌───────────────┐      ┌─────────────┐
//!                      │ BatchExecutor │─────►│ FailureSink │
//!                      └───────┬───────┘      └─────────────┘
//!                              ▼
//!                      ┌───────────────┐
//!                      │ DocumentStore │
//!                      └───────────────┘
//! ```
//!
//! Queued records live only in memory. A crash loses whatever has not been
//! flushed; [`QueueManager::shutdown`] drains the queues on a clean exit.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod executor;
pub mod manager;
pub mod operation;
pub mod queue;
pub mod sink;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{BatchConfig, QueueConfig};
pub use error::{BatchError, Result, StoreError};
pub use manager::{ManagerStats, QueueManager};
pub use operation::{Document, Filter, FindOptions, OperationKind, SelectHandle, SortOrder};
pub use store::{DocumentStore, MemoryStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of batchq
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
