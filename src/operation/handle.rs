//! Select result handles
//!
//! A select hands its caller a [`SelectHandle`] immediately; the executor
//! keeps the paired [`SelectResolver`] inside the queued record and resolves
//! it exactly once when the select's flush wave runs.

use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::{BatchError, Result, StoreError};
use crate::operation::Document;

/// Outcome delivered to a select caller
pub type SelectResult = std::result::Result<Vec<Document>, StoreError>;

/// Create a connected resolver/handle pair
pub(crate) fn select_channel() -> (SelectResolver, SelectHandle) {
    // one slot: a resolution never blocks the executor
    let (tx, rx) = channel::bounded(1);
    (SelectResolver { tx }, SelectHandle { rx })
}

/// Executor side of a select: resolves the caller's handle once
#[derive(Debug)]
pub struct SelectResolver {
    tx: Sender<SelectResult>,
}

impl SelectResolver {
    /// Deliver the rows (or the query error) to the waiting caller
    ///
    /// Returns false when the caller already dropped its handle.
    pub fn resolve(self, result: SelectResult) -> bool {
        self.tx.send(result).is_ok()
    }
}

/// Caller side of a select
#[derive(Debug)]
pub struct SelectHandle {
    rx: Receiver<SelectResult>,
}

impl SelectHandle {
    /// Block until the select's flush wave resolves this handle
    pub fn wait(self) -> Result<Vec<Document>> {
        match self.rx.recv() {
            Ok(result) => result.map_err(BatchError::from),
            // resolver dropped without resolving: the worker went away
            Err(_) => Err(BatchError::Shutdown),
        }
    }

    /// Block for at most `timeout`
    ///
    /// Timing out does not cancel the read; it still runs in its wave and
    /// the late result is discarded.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Vec<Document>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result.map_err(BatchError::from),
            Err(RecvTimeoutError::Timeout) => Err(BatchError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(BatchError::Shutdown),
        }
    }

    /// Poll without blocking; `None` while the select is still queued
    pub fn try_result(&self) -> Option<Result<Vec<Document>>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result.map_err(BatchError::from)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(BatchError::Shutdown)),
        }
    }
}
