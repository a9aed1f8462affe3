//! batchq Load Generator
//!
//! Drives the queue manager from many threads against an in-memory store
//! and reports how the traffic was batched.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use batchq::{
    BatchConfig, Document, Filter, FindOptions, MemoryStore, OperationKind, QueueManager,
};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// batchq load generator
#[derive(Parser, Debug)]
#[command(name = "batchq-loadgen")]
#[command(about = "Generate concurrent traffic through the batching engine")]
#[command(version)]
struct Args {
    /// Number of caller threads
    #[arg(short, long, default_value = "8")]
    threads: usize,

    /// Operations issued by each thread
    #[arg(short, long, default_value = "1000")]
    ops_per_thread: usize,

    /// Number of distinct collections
    #[arg(short, long, default_value = "4")]
    collections: usize,

    /// Fraction of operations that are selects, 0.0 to 1.0
    #[arg(long, default_value = "0.1")]
    select_ratio: f64,

    /// Insert flush interval in milliseconds
    #[arg(long, default_value = "500")]
    insert_interval: u64,

    /// Insert batch-size threshold
    #[arg(long, default_value = "100")]
    insert_batch_size: usize,

    /// Update flush interval in milliseconds
    #[arg(long, default_value = "500")]
    update_interval: u64,

    /// Update batch-size threshold
    #[arg(long, default_value = "100")]
    update_batch_size: usize,

    /// Delete flush interval in milliseconds
    #[arg(long, default_value = "500")]
    delete_interval: u64,

    /// Delete batch-size threshold
    #[arg(long, default_value = "100")]
    delete_batch_size: usize,

    /// Select flush interval in milliseconds
    #[arg(long, default_value = "50")]
    select_interval: u64,

    /// Select batch-size threshold
    #[arg(long, default_value = "50")]
    select_batch_size: usize,
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,batchq=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("batchq load generator v{}", batchq::VERSION);

    let config = match BatchConfig::builder()
        .insert_interval_ms(args.insert_interval)
        .insert_batch_size(args.insert_batch_size)
        .update_interval_ms(args.update_interval)
        .update_batch_size(args.update_batch_size)
        .delete_interval_ms(args.delete_interval)
        .delete_batch_size(args.delete_batch_size)
        .select_interval_ms(args.select_interval)
        .select_batch_size(args.select_batch_size)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let store = Arc::new(MemoryStore::new());
    let manager = match QueueManager::new(config, store.clone()) {
        Ok(m) => Arc::new(m),
        Err(e) => {
            tracing::error!("Failed to start queue manager: {}", e);
            std::process::exit(1);
        }
    };

    let started = Instant::now();
    let workers: Vec<_> = (0..args.threads)
        .map(|thread_id| {
            let manager = Arc::clone(&manager);
            let collections = args.collections.max(1);
            let ops = args.ops_per_thread;
            let select_ratio = args.select_ratio.clamp(0.0, 1.0);
            thread::spawn(move || drive(&manager, thread_id, ops, collections, select_ratio))
        })
        .collect();

    let mut rows_read = 0usize;
    for worker in workers {
        match worker.join() {
            Ok(rows) => rows_read += rows,
            Err(_) => tracing::error!("caller thread panicked"),
        }
    }

    manager.shutdown();
    let elapsed = started.elapsed();

    let stats = manager.stats();
    for kind in OperationKind::ALL {
        let q = stats.for_kind(kind);
        tracing::info!(
            "{:>6}: enqueued={} flushed={} failed={} flushes(timer={}, size={}, forced={}) store_calls={}",
            kind,
            q.enqueued,
            q.items_flushed,
            q.items_failed,
            q.flushes_by_timer,
            q.flushes_by_size,
            q.flushes_forced,
            store.calls_of(kind).len(),
        );
    }
    tracing::info!("rows read by selects: {}", rows_read);
    tracing::info!("finished in {:?}", elapsed);
}

/// Issue a mix of operations; returns rows received from selects
fn drive(
    manager: &QueueManager,
    thread_id: usize,
    ops: usize,
    collections: usize,
    select_ratio: f64,
) -> usize {
    let mut rows = 0;

    for i in 0..ops {
        let collection = format!("collection_{}", (thread_id + i) % collections);
        let id = format!("{}-{}", thread_id, i);

        // selects land evenly: whenever the running share crosses an integer
        let is_select =
            ((i + 1) as f64 * select_ratio).floor() > (i as f64 * select_ratio).floor();

        let result = if is_select {
            let filter = Filter::new().with("thread", thread_id as u64);
            manager
                .queue_select(&collection, filter, FindOptions::new().limit(10))
                .and_then(|handle| handle.wait_timeout(Duration::from_secs(5)))
                .map(|found| rows += found.len())
        } else {
            match i % 4 {
                0 | 1 => {
                    let mut doc = Document::new();
                    doc.insert("id".into(), id.into());
                    doc.insert("thread".into(), (thread_id as u64).into());
                    doc.insert("seq".into(), (i as u64).into());
                    manager.queue_insert(&collection, doc)
                }
                2 => {
                    let mut changes = Document::new();
                    changes.insert("touched".into(), true.into());
                    let previous = format!("{}-{}", thread_id, i - 1);
                    manager.queue_update(&collection, Filter::new().with("id", previous), changes)
                }
                _ => {
                    let previous = format!("{}-{}", thread_id, i - 3);
                    manager.queue_delete(&collection, Filter::new().with("id", previous))
                }
            }
        };

        if let Err(e) = result {
            tracing::warn!("thread {} operation {} failed: {}", thread_id, i, e);
        }
    }

    rows
}
