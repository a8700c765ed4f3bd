/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use slog::{Logger, debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use tmr_retry::RetryPolicy;
use tmr_types::{Metric, MetricKind, codec};

use crate::{MemoryStore, MetricStore, StoreError};

#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    pub path: PathBuf,
    /// Zero means write the file after every store.
    pub store_interval: Duration,
    pub restore: bool,
}

/// In-memory metrics with a full snapshot written to a single file.
pub struct FileStore {
    memory: MemoryStore,
    path: PathBuf,
    sync_write: bool,
    retry: RetryPolicy,
    quit: CancellationToken,
    write_lock: tokio::sync::Mutex<()>,
    logger: Logger,
}

impl FileStore {
    pub async fn open(
        config: FileStoreConfig,
        retry: RetryPolicy,
        quit: CancellationToken,
        logger: Logger,
    ) -> Arc<Self> {
        let store = Arc::new(FileStore {
            memory: MemoryStore::new(),
            path: config.path,
            sync_write: config.store_interval.is_zero(),
            retry,
            quit,
            write_lock: tokio::sync::Mutex::new(()),
            logger,
        });

        if config.restore {
            store.restore().await;
        }
        if !store.sync_write {
            spawn_flush_task(Arc::downgrade(&store), config.store_interval);
        }
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn restore(&self) {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(self.logger, "no snapshot file to restore";
                    "path" => %self.path.display());
                return;
            }
            Err(e) => {
                warn!(self.logger, "failed to read snapshot file: {e}";
                    "path" => %self.path.display());
                return;
            }
        };
        if data.iter().all(u8::is_ascii_whitespace) {
            return;
        }

        match codec::decode(&data) {
            Ok(metrics) => {
                let count = metrics.len();
                self.memory.restore(metrics);
                info!(self.logger, "restored {count} metrics";
                    "path" => %self.path.display());
            }
            Err(e) => {
                let e = StoreError::Corrupted {
                    path: self.path.clone(),
                    source: e,
                };
                warn!(self.logger, "{e}, starting empty");
            }
        }
    }

    /// Write the whole current map to the snapshot file.
    ///
    /// An empty map is never written.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.write_snapshot().await
    }

    /// Caller must hold `write_lock`.
    async fn write_snapshot(&self) -> Result<(), StoreError> {
        let snapshot = self.memory.snapshot();
        if snapshot.is_empty() {
            return Ok(());
        }
        let data = codec::encode(&snapshot)?;

        let path = self.path.as_path();
        let data = data.as_slice();
        self.retry
            .run(&self.quit, &self.logger, |_| write_atomic(path, data))
            .await
            .map_err(|e| StoreError::Persistence(Box::new(StoreError::Io(e))))?;
        debug!(self.logger, "persisted {} metrics", snapshot.len());
        Ok(())
    }
}

fn spawn_flush_task(store: Weak<FileStore>, period: Duration) {
    let Some(quit) = store.upgrade().map(|s| s.quit.clone()) else {
        return;
    };
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;

                _ = quit.cancelled() => break,
                _ = interval.tick() => {
                    let Some(store) = store.upgrade() else {
                        break;
                    };
                    if let Err(e) = store.persist().await {
                        warn!(store.logger, "periodic snapshot failed: {e}");
                    }
                }
            }
        }
    });
}

async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            tokio::fs::create_dir_all(dir).await?;
        }
    }

    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(&tmp, path).await
}

#[async_trait]
impl MetricStore for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get_gauge(&self, name: &str) -> Result<Option<Metric>, StoreError> {
        Ok(self.memory.get_metric(MetricKind::Gauge, name))
    }

    async fn get_counter(&self, name: &str) -> Result<Option<Metric>, StoreError> {
        Ok(self.memory.get_metric(MetricKind::Counter, name))
    }

    async fn store(&self, metrics: &[Metric]) -> Result<(), StoreError> {
        if !self.sync_write {
            return self.memory.apply(metrics);
        }

        // the batch only stays in memory once it is on disk
        let _guard = self.write_lock.lock().await;
        let undo = self.memory.apply_with_undo(metrics)?;
        if let Err(e) = self.write_snapshot().await {
            self.memory.undo(undo);
            return Err(e);
        }
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Metric>, StoreError> {
        Ok(self.memory.snapshot())
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.persist().await
    }
}
