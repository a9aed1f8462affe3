//! Select waves
//!
//! Every select drained in one flush is dispatched together on a small set of
//! scoped threads. Each query is independent: one failing query rejects only
//! its own caller.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::channel;

use crate::operation::{Filter, FindOptions, SelectResolver};
use crate::store::DocumentStore;

use super::guard::guarded;

/// Upper bound on threads used for one wave
pub const MAX_WAVE_WIDTH: usize = 16;

/// A drained select waiting for its query
pub(crate) struct SelectJob {
    pub collection: String,
    pub filter: Filter,
    pub options: FindOptions,
    pub reply: SelectResolver,
}

/// Counts from one wave
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WaveOutcome {
    pub resolved: usize,
    pub failed: usize,
}

/// Run every job, resolving each caller's handle with its own rows
pub(crate) fn run_wave(store: &dyn DocumentStore, jobs: Vec<SelectJob>) -> WaveOutcome {
    let width = jobs.len().min(MAX_WAVE_WIDTH);
    if width <= 1 {
        let mut outcome = WaveOutcome::default();
        for job in jobs {
            run_job(store, job, &mut outcome);
        }
        return outcome;
    }

    let (tx, rx) = channel::unbounded();
    for job in jobs {
        // receiver is alive, send cannot fail
        let _ = tx.send(job);
    }
    drop(tx);

    let resolved = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let scope_result = crossbeam::thread::scope(|s| {
        for _ in 0..width {
            let rx = rx.clone();
            let resolved = &resolved;
            let failed = &failed;
            s.spawn(move |_| {
                let mut local = WaveOutcome::default();
                while let Ok(job) = rx.recv() {
                    run_job(store, job, &mut local);
                }
                resolved.fetch_add(local.resolved, Ordering::Relaxed);
                failed.fetch_add(local.failed, Ordering::Relaxed);
            });
        }
    });

    if scope_result.is_err() {
        // jobs left in the channel drop their resolvers; callers see Shutdown
        tracing::error!("select wave worker panicked");
    }

    WaveOutcome {
        resolved: resolved.into_inner(),
        failed: failed.into_inner(),
    }
}

fn run_job(store: &dyn DocumentStore, job: SelectJob, outcome: &mut WaveOutcome) {
    let result = guarded("select", &job.collection, || {
        store.find(&job.collection, &job.filter, &job.options)
    });
    match &result {
        Ok(rows) => {
            tracing::trace!("select on {} returned {} row(s)", job.collection, rows.len());
            outcome.resolved += 1;
        }
        Err(e) => {
            tracing::debug!("select on {} failed: {}", job.collection, e);
            outcome.failed += 1;
        }
    }
    if !job.reply.resolve(result) {
        tracing::trace!("select caller on {} no longer waiting", job.collection);
    }
}
