//! Queue Module
//!
//! One ordered queue per operation kind, each with its own flush thread.
//!
//! ## Dual trigger
//! ```text
//!   push ──► pending ──(len >= max_batch_size)──► sealed ──┐
//!               │                                          │
//!               └──────(interval elapsed)──────────────────┤
//!                                                          ▼
//!                                                  flush thread ──► executor
//! ```
//!
//! - **Size**: the pushing thread seals the pending records as a batch of
//!   exactly the size at that instant and wakes the flush thread.
//! - **Timer**: the flush thread drains whatever is pending when the
//!   interval elapses. An empty queue produces no flush.
//!
//! Every flush resets the timer, so the interval is measured from the last
//! flush. All flushes of one queue run on its single flush thread, so they
//! never overlap and batches leave in FIFO order.

mod batch_queue;
mod flusher;

pub use batch_queue::{BatchQueue, QueueStats};
pub(crate) use flusher::{spawn_flusher, Signal};

use std::fmt;

/// Why a batch was flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// The interval elapsed with records pending
    Timer,

    /// An enqueue brought the queue to its batch-size threshold
    Size,

    /// `QueueManager::flush` was called
    Forced,

    /// Final drain during shutdown
    Shutdown,
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlushTrigger::Timer => "timer",
            FlushTrigger::Size => "size",
            FlushTrigger::Forced => "forced",
            FlushTrigger::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}
