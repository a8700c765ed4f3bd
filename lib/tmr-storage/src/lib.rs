/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use slog::{Logger, info, o};
use tokio_util::sync::CancellationToken;

use tmr_retry::RetryPolicy;
use tmr_types::{Metric, MetricKind};

mod error;
pub use error::StoreError;

mod memory;
pub use memory::{MemoryStore, Undo};

mod file;
pub use file::{FileStore, FileStoreConfig};

mod sql;
pub use sql::{SqlStore, SqlStoreConfig};

/// The storage engine seen by the ingestion layer.
///
/// Gauges are last-write-wins, counters accumulate their deltas. A batch
/// passed to [`MetricStore::store`] is applied completely or not at all.
#[async_trait]
pub trait MetricStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn get_gauge(&self, name: &str) -> Result<Option<Metric>, StoreError>;
    async fn get_counter(&self, name: &str) -> Result<Option<Metric>, StoreError>;

    async fn get(&self, kind: MetricKind, name: &str) -> Result<Option<Metric>, StoreError> {
        match kind {
            MetricKind::Gauge => self.get_gauge(name).await,
            MetricKind::Counter => self.get_counter(name).await,
        }
    }

    async fn store(&self, metrics: &[Metric]) -> Result<(), StoreError>;

    /// Every stored metric, ordered by name then type.
    async fn list_all(&self) -> Result<Vec<Metric>, StoreError>;

    async fn health_check(&self) -> bool;

    /// Persist anything still pending. Called once on shutdown.
    async fn flush(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

pub(crate) fn sort_metrics(metrics: &mut [Metric]) {
    metrics.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.kind().as_str().cmp(b.kind().as_str()))
    });
}

pub(crate) fn validate_batch(metrics: &[Metric]) -> Result<(), StoreError> {
    for m in metrics {
        m.validate()?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_dsn: Option<String>,
    pub file_path: Option<PathBuf>,
    pub store_interval: Duration,
    pub restore: bool,
    pub max_db_connections: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_dsn: None,
            file_path: None,
            store_interval: Duration::from_secs(300),
            restore: true,
            max_db_connections: 8,
        }
    }
}

/// Build the single active backend.
///
/// A database dsn wins over a file path, and with neither the metrics only
/// live in memory.
pub async fn build_store(
    config: &StoreConfig,
    retry: RetryPolicy,
    quit: CancellationToken,
    logger: &Logger,
) -> Result<Arc<dyn MetricStore>, StoreError> {
    if let Some(dsn) = &config.database_dsn {
        let sql_config = SqlStoreConfig {
            dsn: dsn.clone(),
            max_connections: config.max_db_connections,
        };
        let logger = logger.new(o!("store" => "sql"));
        let store = SqlStore::connect(&sql_config, retry, quit, logger.clone()).await?;
        info!(logger, "using relational storage");
        return Ok(Arc::new(store));
    }

    if let Some(path) = &config.file_path {
        let file_config = FileStoreConfig {
            path: path.clone(),
            store_interval: config.store_interval,
            restore: config.restore,
        };
        let logger = logger.new(o!("store" => "file"));
        info!(logger, "using file storage";
            "path" => %path.display(),
            "interval_ms" => config.store_interval.as_millis() as u64);
        let store = FileStore::open(file_config, retry, quit, logger).await;
        return Ok(store);
    }

    info!(logger, "using in-memory storage");
    Ok(Arc::new(MemoryStore::new()))
}
