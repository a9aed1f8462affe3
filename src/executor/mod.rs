//! Executor Module
//!
//! Turns a drained queue into the fewest backing-store calls.
//!
//! ## Responsibilities
//! - Group records by collection, keeping arrival order within each group
//! - One bulk call per collection for inserts, updates and deletes
//! - Report write failures to the injected `FailureSink` and drop them
//! - Dispatch selects as one concurrent wave and resolve each caller
//! - Contain store panics so they surface as ordinary store errors
//!
//! ## Select waves
//! Selects are never merged into a compound query. Each select runs its own
//! filter and gets its own rows; batching only aligns *when* a burst of
//! reads is dispatched. Merging filters would change what each caller sees.

mod batch;
mod grouping;
mod guard;
mod select;

pub use batch::{BatchExecutor, FlushReport};
pub use grouping::group_by_collection;
pub(crate) use guard::panic_reason;
pub use select::MAX_WAVE_WIDTH;
