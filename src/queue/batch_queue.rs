//! Per-kind batch queue
//!
//! Pending records and sealed (size-triggered) batches share one lock, which
//! is the critical section for every enqueue.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::channel::Sender;
use parking_lot::Mutex;

use crate::config::QueueConfig;
use crate::error::{BatchError, Result};
use crate::executor::FlushReport;
use crate::operation::{OperationKind, OperationRecord};

use super::{FlushTrigger, Signal};

/// Records waiting for a flush
#[derive(Default)]
struct QueueState {
    /// Arrival order
    pending: Vec<OperationRecord>,

    /// Batches sealed by the size trigger, oldest first
    sealed: VecDeque<Vec<OperationRecord>>,

    /// Set once shutdown has begun; later pushes are refused
    closed: bool,
}

/// A single operation-kind queue
pub struct BatchQueue {
    kind: OperationKind,
    config: QueueConfig,
    state: Mutex<QueueState>,

    /// Wakes the flush thread
    signal: Sender<Signal>,

    counters: Counters,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    flushes_by_timer: AtomicU64,
    flushes_by_size: AtomicU64,
    flushes_forced: AtomicU64,
    items_flushed: AtomicU64,
    items_failed: AtomicU64,
}

/// Point-in-time counters for one queue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub enqueued: u64,
    pub flushes_by_timer: u64,
    pub flushes_by_size: u64,
    pub flushes_forced: u64,
    pub items_flushed: u64,
    pub items_failed: u64,
}

impl QueueStats {
    pub fn flushes(&self) -> u64 {
        self.flushes_by_timer + self.flushes_by_size + self.flushes_forced
    }
}

impl BatchQueue {
    pub(crate) fn new(kind: OperationKind, config: QueueConfig, signal: Sender<Signal>) -> Self {
        Self {
            kind,
            config,
            state: Mutex::new(QueueState::default()),
            signal,
            counters: Counters::default(),
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn config(&self) -> QueueConfig {
        self.config
    }

    /// Append a record; never blocks on a flush
    ///
    /// When the queue reaches its threshold the pending records are sealed
    /// into a batch and the flush thread is woken to execute it.
    pub fn push(&self, record: OperationRecord) -> Result<()> {
        debug_assert_eq!(record.kind(), self.kind);

        let sealed = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BatchError::Shutdown);
            }

            state.pending.push(record);
            self.counters.enqueued.fetch_add(1, Ordering::Relaxed);

            if state.pending.len() >= self.config.max_batch_size {
                let batch = std::mem::take(&mut state.pending);
                tracing::trace!("{} queue sealed batch of {}", self.kind, batch.len());
                state.sealed.push_back(batch);
                true
            } else {
                false
            }
        };

        if sealed {
            // receiver lives as long as the flush thread
            let _ = self.signal.send(Signal::Sealed);
        }

        Ok(())
    }

    /// Records waiting, sealed or not
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.pending.len() + state.sealed.iter().map(Vec::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Take batches for a flush, oldest first
    ///
    /// Sealed batches always come out (tagged `Size`). The unsealed pending
    /// records come out too unless the trigger is `Size`.
    pub(crate) fn drain(&self, trigger: FlushTrigger) -> Vec<(FlushTrigger, Vec<OperationRecord>)> {
        let mut state = self.state.lock();
        if trigger == FlushTrigger::Shutdown {
            state.closed = true;
        }

        let mut batches: Vec<_> = state
            .sealed
            .drain(..)
            .map(|batch| (FlushTrigger::Size, batch))
            .collect();

        if trigger != FlushTrigger::Size && !state.pending.is_empty() {
            batches.push((trigger, std::mem::take(&mut state.pending)));
        }

        batches
    }

    pub(crate) fn record_flush(&self, trigger: FlushTrigger, report: &FlushReport) {
        let counter = match trigger {
            FlushTrigger::Timer => &self.counters.flushes_by_timer,
            FlushTrigger::Size => &self.counters.flushes_by_size,
            FlushTrigger::Forced | FlushTrigger::Shutdown => &self.counters.flushes_forced,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.counters
            .items_flushed
            .fetch_add(report.records as u64, Ordering::Relaxed);
        self.counters
            .items_failed
            .fetch_add(report.failed as u64, Ordering::Relaxed);
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.len(),
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            flushes_by_timer: self.counters.flushes_by_timer.load(Ordering::Relaxed),
            flushes_by_size: self.counters.flushes_by_size.load(Ordering::Relaxed),
            flushes_forced: self.counters.flushes_forced.load(Ordering::Relaxed),
            items_flushed: self.counters.items_flushed.load(Ordering::Relaxed),
            items_failed: self.counters.items_failed.load(Ordering::Relaxed),
        }
    }
}
