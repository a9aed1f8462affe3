//! Queue Manager
//!
//! The facade external callers use. Owns the four queues, their flush
//! threads, and the executor they share.
//!
//! ## Responsibilities
//! - Validate calls before anything is queued
//! - Route records to the queue for their kind
//! - Hand selects their result handle immediately
//! - Forced flush, stats, and graceful shutdown

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel;
use parking_lot::Mutex;

use crate::config::BatchConfig;
use crate::error::{BatchError, Result};
use crate::executor::BatchExecutor;
use crate::operation::{
    Document, Filter, FindOptions, OperationKind, OperationRecord, SelectHandle,
};
use crate::queue::{spawn_flusher, BatchQueue, QueueStats, Signal};
use crate::sink::{FailureSink, TracingSink};
use crate::store::DocumentStore;

/// Stats for all four queues
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerStats {
    pub insert: QueueStats,
    pub update: QueueStats,
    pub delete: QueueStats,
    pub select: QueueStats,
}

impl ManagerStats {
    pub fn for_kind(&self, kind: OperationKind) -> &QueueStats {
        match kind {
            OperationKind::Insert => &self.insert,
            OperationKind::Update => &self.update,
            OperationKind::Delete => &self.delete,
            OperationKind::Select => &self.select,
        }
    }
}

/// A queue together with the channel that drives its flush thread
struct QueueSlot {
    queue: Arc<BatchQueue>,
    signal: channel::Sender<Signal>,
}

/// Process-wide batching facade
///
/// ## Concurrency Model
///
/// - **Enqueue**: any number of threads; each call takes only its queue's
///   lock, appends, and returns. Never waits on a flush.
/// - **Flush**: one thread per queue. Size triggers seal batches on the
///   calling thread; execution always happens on the flush thread.
/// - **Store**: shared by all four flush threads (and select waves).
///
/// There is no ordering between queues: an insert and a later delete of
/// the same document may reach the store in either order.
pub struct QueueManager {
    config: BatchConfig,
    slots: [QueueSlot; 4],
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl QueueManager {
    /// Start a manager whose dropped writes are logged through `tracing`
    pub fn new(config: BatchConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        Self::with_sink(config, store, Arc::new(TracingSink))
    }

    /// Start a manager reporting dropped writes to `sink`
    pub fn with_sink(
        config: BatchConfig,
        store: Arc<dyn DocumentStore>,
        sink: Arc<dyn FailureSink>,
    ) -> Result<Self> {
        config.validate()?;

        let executor = Arc::new(BatchExecutor::new(store, sink));
        let mut workers = Vec::with_capacity(4);

        let mut make_slot = |kind: OperationKind| -> Result<QueueSlot> {
            let (tx, rx) = channel::unbounded();
            let queue = Arc::new(BatchQueue::new(kind, config.for_kind(kind), tx.clone()));
            workers.push(spawn_flusher(Arc::clone(&queue), rx, Arc::clone(&executor))?);
            Ok(QueueSlot { queue, signal: tx })
        };

        let slots = [
            make_slot(OperationKind::Insert)?,
            make_slot(OperationKind::Update)?,
            make_slot(OperationKind::Delete)?,
            make_slot(OperationKind::Select)?,
        ];

        tracing::info!("queue manager started: {:?}", config);

        Ok(Self {
            config,
            slots,
            workers: Mutex::new(workers),
        })
    }

    // =========================================================================
    // Facade
    // =========================================================================

    /// Queue an insert (fire-and-forget)
    pub fn queue_insert(&self, collection: &str, document: Document) -> Result<()> {
        let record = OperationRecord::insert(collection, document)?;
        self.enqueue(record)
    }

    /// Queue an update of every document matching `filter` (fire-and-forget)
    pub fn queue_update(&self, collection: &str, filter: Filter, changes: Document) -> Result<()> {
        let record = OperationRecord::update(collection, filter, changes)?;
        self.enqueue(record)
    }

    /// Queue a delete of every document matching `filter` (fire-and-forget)
    pub fn queue_delete(&self, collection: &str, filter: Filter) -> Result<()> {
        let record = OperationRecord::delete(collection, filter)?;
        self.enqueue(record)
    }

    /// Queue a select and return the handle its rows will arrive on
    ///
    /// The select runs in the next select wave; it is not merged with other
    /// selects in that wave.
    pub fn queue_select(
        &self,
        collection: &str,
        filter: Filter,
        options: FindOptions,
    ) -> Result<SelectHandle> {
        let (record, handle) = OperationRecord::select(collection, filter, options)?;
        self.enqueue(record)?;
        Ok(handle)
    }

    /// Queue a select of a whole collection
    pub fn queue_select_all(&self, collection: &str, options: FindOptions) -> Result<SelectHandle> {
        self.queue_select(collection, Filter::new(), options)
    }

    fn enqueue(&self, record: OperationRecord) -> Result<()> {
        let kind = record.kind();
        tracing::trace!("enqueue {} on {}", kind, record.collection());
        self.slot(kind).queue.push(record)
    }

    // =========================================================================
    // Control
    // =========================================================================

    /// Drain all four queues and wait until every drained batch has run
    pub fn flush(&self) -> Result<()> {
        let mut acks = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            let (ack_tx, ack_rx) = channel::bounded(1);
            slot.signal
                .send(Signal::Flush(ack_tx))
                .map_err(|_| BatchError::Shutdown)?;
            acks.push(ack_rx);
        }

        for ack in acks {
            ack.recv().map_err(|_| BatchError::Shutdown)?;
        }
        Ok(())
    }

    /// Stop accepting work, drain what is queued, and join the flush threads
    ///
    /// Idempotent. Also run on drop.
    pub fn shutdown(&self) {
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        if workers.is_empty() {
            return;
        }

        for slot in &self.slots {
            let _ = slot.signal.send(Signal::Shutdown);
        }
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("flush thread panicked during shutdown");
            }
        }

        tracing::info!("queue manager stopped");
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            insert: self.slot(OperationKind::Insert).queue.stats(),
            update: self.slot(OperationKind::Update).queue.stats(),
            delete: self.slot(OperationKind::Delete).queue.stats(),
            select: self.slot(OperationKind::Select).queue.stats(),
        }
    }

    /// Records waiting in one queue
    pub fn pending(&self, kind: OperationKind) -> usize {
        self.slot(kind).queue.len()
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    fn slot(&self, kind: OperationKind) -> &QueueSlot {
        let index = match kind {
            OperationKind::Insert => 0,
            OperationKind::Update => 1,
            OperationKind::Delete => 2,
            OperationKind::Select => 3,
        };
        &self.slots[index]
    }
}

impl Drop for QueueManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
