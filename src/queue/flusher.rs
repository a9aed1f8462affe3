//! Flush scheduler
//!
//! One thread per queue. It owns the queue's recurring timer and is the only
//! place batches are executed, which serializes flushes per queue.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};

use crate::error::{BatchError, Result};
use crate::executor::{panic_reason, BatchExecutor, FlushReport};

use super::{BatchQueue, FlushTrigger};

/// Messages to a flush thread
pub(crate) enum Signal {
    /// A size-triggered batch was sealed
    Sealed,

    /// Drain everything now; ack when done
    Flush(Sender<()>),

    /// Drain everything, then exit
    Shutdown,
}

/// Start the flush thread for `queue`
pub(crate) fn spawn_flusher(
    queue: Arc<BatchQueue>,
    signals: Receiver<Signal>,
    executor: Arc<BatchExecutor>,
) -> Result<JoinHandle<()>> {
    let name = format!("batchq-{}-flusher", queue.kind());
    thread::Builder::new()
        .name(name)
        .spawn(move || run_flusher(&queue, &signals, &executor))
        .map_err(|e| BatchError::Worker(format!("failed to spawn flush thread: {}", e)))
}

fn run_flusher(queue: &BatchQueue, signals: &Receiver<Signal>, executor: &BatchExecutor) {
    let interval = queue.config().interval;
    let mut deadline = Instant::now() + interval;

    tracing::debug!(
        "{} flusher started (interval={:?}, max_batch_size={})",
        queue.kind(),
        interval,
        queue.config().max_batch_size
    );

    loop {
        match signals.recv_deadline(deadline) {
            Ok(Signal::Sealed) => {
                // a timer tick may already have taken the sealed batch
                if flush(queue, executor, FlushTrigger::Size) {
                    deadline = Instant::now() + interval;
                }
            }
            Ok(Signal::Flush(ack)) => {
                flush(queue, executor, FlushTrigger::Forced);
                deadline = Instant::now() + interval;
                let _ = ack.send(());
            }
            Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                flush(queue, executor, FlushTrigger::Shutdown);
                break;
            }
            Err(RecvTimeoutError::Timeout) => {
                // recurring tick: restarts whether or not anything was flushed
                flush(queue, executor, FlushTrigger::Timer);
                deadline = Instant::now() + interval;
            }
        }
    }

    tracing::debug!("{} flusher stopped", queue.kind());
}

/// Drain and execute; returns false when there was nothing to flush
fn flush(queue: &BatchQueue, executor: &BatchExecutor, trigger: FlushTrigger) -> bool {
    let batches = queue.drain(trigger);
    if batches.is_empty() {
        return false;
    }

    for (batch_trigger, records) in batches {
        let oldest = records.first().map(|r| r.enqueued_at().elapsed());
        let count = records.len();

        // a panicking sink must not stop this queue; unresolved selects see Shutdown
        let report = match panic::catch_unwind(AssertUnwindSafe(|| executor.execute(records))) {
            Ok(report) => report,
            Err(payload) => {
                tracing::error!(
                    "{} flush of {} record(s) panicked, records dropped: {}",
                    queue.kind(),
                    count,
                    panic_reason(payload.as_ref())
                );
                FlushReport {
                    records: count,
                    failed: count,
                    ..Default::default()
                }
            }
        };

        tracing::debug!(
            kind = %queue.kind(),
            trigger = %batch_trigger,
            records = report.records,
            store_calls = report.store_calls,
            failed = report.failed,
            "flushed {} {} record(s) (oldest waited {:?})",
            report.records,
            queue.kind(),
            oldest.unwrap_or_default()
        );

        queue.record_flush(batch_trigger, &report);
    }

    true
}
