//! Configuration for batchq
//!
//! Each of the four queues gets its own flush interval and batch-size
//! threshold. Configuration is fixed once a [`QueueManager`] is built.
//!
//! [`QueueManager`]: crate::manager::QueueManager

use std::time::Duration;

use crate::error::{BatchError, Result};
use crate::operation::OperationKind;

/// Flush policy for a single queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Time between flushes (measured from the previous flush)
    pub interval: Duration,

    /// Queue length at which an eager flush fires
    pub max_batch_size: usize,
}

impl QueueConfig {
    pub fn new(interval_ms: u64, max_batch_size: usize) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            max_batch_size,
        }
    }

    fn validate(&self, kind: OperationKind) -> Result<()> {
        if self.interval.is_zero() {
            return Err(BatchError::Config(format!(
                "{} interval must be positive",
                kind
            )));
        }
        if self.max_batch_size == 0 {
            return Err(BatchError::Config(format!(
                "{} batch size must be positive",
                kind
            )));
        }
        Ok(())
    }
}

/// Main configuration: one [`QueueConfig`] per operation kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub insert: QueueConfig,
    pub update: QueueConfig,
    pub delete: QueueConfig,
    pub select: QueueConfig,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let queue = QueueConfig::new(500, 100);
        Self {
            insert: queue,
            update: queue,
            delete: queue,
            select: queue,
        }
    }
}

impl BatchConfig {
    /// Create a new config builder
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder::default()
    }

    /// Get the queue config for a kind
    pub fn for_kind(&self, kind: OperationKind) -> QueueConfig {
        match kind {
            OperationKind::Insert => self.insert,
            OperationKind::Update => self.update,
            OperationKind::Delete => self.delete,
            OperationKind::Select => self.select,
        }
    }

    /// Check that every interval and batch size is positive
    pub fn validate(&self) -> Result<()> {
        for kind in OperationKind::ALL {
            self.for_kind(kind).validate(kind)?;
        }
        Ok(())
    }
}

/// Builder for BatchConfig
#[derive(Default)]
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    /// Set the insert flush interval (in milliseconds)
    pub fn insert_interval_ms(mut self, ms: u64) -> Self {
        self.config.insert.interval = Duration::from_millis(ms);
        self
    }

    /// Set the insert batch-size threshold
    pub fn insert_batch_size(mut self, size: usize) -> Self {
        self.config.insert.max_batch_size = size;
        self
    }

    /// Set the update flush interval (in milliseconds)
    pub fn update_interval_ms(mut self, ms: u64) -> Self {
        self.config.update.interval = Duration::from_millis(ms);
        self
    }

    /// Set the update batch-size threshold
    pub fn update_batch_size(mut self, size: usize) -> Self {
        self.config.update.max_batch_size = size;
        self
    }

    /// Set the delete flush interval (in milliseconds)
    pub fn delete_interval_ms(mut self, ms: u64) -> Self {
        self.config.delete.interval = Duration::from_millis(ms);
        self
    }

    /// Set the delete batch-size threshold
    pub fn delete_batch_size(mut self, size: usize) -> Self {
        self.config.delete.max_batch_size = size;
        self
    }

    /// Set the select flush interval (in milliseconds)
    pub fn select_interval_ms(mut self, ms: u64) -> Self {
        self.config.select.interval = Duration::from_millis(ms);
        self
    }

    /// Set the select batch-size threshold
    pub fn select_batch_size(mut self, size: usize) -> Self {
        self.config.select.max_batch_size = size;
        self
    }

    /// Apply the same policy to all four queues
    pub fn all(mut self, interval_ms: u64, batch_size: usize) -> Self {
        let queue = QueueConfig::new(interval_ms, batch_size);
        self.config.insert = queue;
        self.config.update = queue;
        self.config.delete = queue;
        self.config.select = queue;
        self
    }

    /// Validate and return the config
    pub fn build(self) -> Result<BatchConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
