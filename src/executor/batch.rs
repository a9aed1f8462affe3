//! Batch executor
//!
//! Executes one drained batch. Insert, update and delete groups each become
//! a single bulk call; failures go to the sink and are not retried.

use std::sync::Arc;

use crate::error::StoreError;
use crate::operation::{Document, Filter, Operation, OperationKind, OperationRecord};
use crate::sink::{DroppedWrite, FailedItem, FailureSink};
use crate::store::{BulkWriteResult, DocumentStore, StoreResult};

use super::grouping::group_by_collection;
use super::guard::guarded;
use super::select::{run_wave, SelectJob};

/// What one flush did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Records drained
    pub records: usize,

    /// Bulk calls or queries issued
    pub store_calls: usize,

    /// Documents inserted, modified, removed or returned
    pub affected: usize,

    /// Records dropped (writes) or rejected (selects)
    pub failed: usize,
}

/// Executes drained batches against the shared store
pub struct BatchExecutor {
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn FailureSink>,
}

impl BatchExecutor {
    pub fn new(store: Arc<dyn DocumentStore>, sink: Arc<dyn FailureSink>) -> Self {
        Self { store, sink }
    }

    /// Execute a drained batch
    ///
    /// A queue only ever holds one kind, but records are dispatched on their
    /// own operation so a mixed batch is still handled correctly.
    pub fn execute(&self, records: Vec<OperationRecord>) -> FlushReport {
        let mut report = FlushReport {
            records: records.len(),
            ..Default::default()
        };

        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        let mut deletes = Vec::new();
        let mut selects = Vec::new();

        for record in records {
            let (collection, operation) = record.into_parts();
            match operation {
                Operation::Insert { document } => inserts.push((collection, document)),
                Operation::Update { filter, changes } => {
                    updates.push((collection, (filter, changes)))
                }
                Operation::Delete { filter } => deletes.push((collection, filter)),
                Operation::Select {
                    filter,
                    options,
                    reply,
                } => selects.push(SelectJob {
                    collection,
                    filter,
                    options,
                    reply,
                }),
            }
        }

        for (collection, documents) in group_by_collection(inserts) {
            let outcome = guarded("insert", &collection, || {
                self.store.insert_many(&collection, &documents)
            });
            self.settle(
                OperationKind::Insert,
                &collection,
                &documents,
                outcome,
                |doc: &Document| FailedItem::Insert(doc.clone()),
                &mut report,
            );
        }

        for (collection, pairs) in group_by_collection(updates) {
            let outcome = guarded("update", &collection, || {
                self.store.update_many(&collection, &pairs)
            });
            self.settle(
                OperationKind::Update,
                &collection,
                &pairs,
                outcome,
                |(filter, changes): &(Filter, Document)| FailedItem::Update {
                    filter: filter.clone(),
                    changes: changes.clone(),
                },
                &mut report,
            );
        }

        for (collection, filters) in group_by_collection(deletes) {
            let outcome = guarded("delete", &collection, || {
                self.store.delete_many(&collection, &filters)
            });
            self.settle(
                OperationKind::Delete,
                &collection,
                &filters,
                outcome,
                |filter: &Filter| FailedItem::Delete(filter.clone()),
                &mut report,
            );
        }

        if !selects.is_empty() {
            report.store_calls += selects.len();
            let wave = run_wave(self.store.as_ref(), selects);
            report.affected += wave.resolved;
            report.failed += wave.failed;
        }

        report
    }

    /// Account for one bulk call and hand any losses to the sink
    fn settle<T>(
        &self,
        kind: OperationKind,
        collection: &str,
        items: &[T],
        outcome: StoreResult<BulkWriteResult>,
        to_failed: impl Fn(&T) -> FailedItem,
        report: &mut FlushReport,
    ) {
        report.store_calls += 1;

        match outcome {
            Ok(result) => {
                report.affected += result.affected;
                if result.is_complete() {
                    tracing::trace!(
                        "bulk {} on {}: {} item(s), {} affected",
                        kind,
                        collection,
                        items.len(),
                        result.affected
                    );
                    return;
                }

                let mut error = None;
                let mut lost = Vec::with_capacity(result.failures.len());
                for failure in result.failures {
                    let Some(item) = items.get(failure.index) else {
                        tracing::debug!(
                            "store reported failure for unknown index {}",
                            failure.index
                        );
                        continue;
                    };
                    lost.push(to_failed(item));
                    if error.is_none() {
                        error = Some(failure.error);
                    }
                }

                let Some(error) = error else {
                    return;
                };
                tracing::warn!(
                    "bulk {} on {}: {} of {} item(s) rejected: {}",
                    kind,
                    collection,
                    lost.len(),
                    items.len(),
                    error
                );
                report.failed += lost.len();
                self.sink.report(DroppedWrite {
                    kind,
                    collection: collection.to_string(),
                    items: lost,
                    error,
                    whole_group: false,
                });
            }
            Err(error) => {
                tracing::error!(
                    "bulk {} on {} failed, dropping {} item(s): {}",
                    kind,
                    collection,
                    items.len(),
                    error
                );
                report.failed += items.len();
                self.drop_group(kind, collection, items.iter().map(to_failed).collect(), error);
            }
        }
    }

    fn drop_group(
        &self,
        kind: OperationKind,
        collection: &str,
        items: Vec<FailedItem>,
        error: StoreError,
    ) {
        self.sink.report(DroppedWrite {
            kind,
            collection: collection.to_string(),
            items,
            error,
            whole_group: true,
        });
    }
}
