/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use slog::{Logger, debug, info};
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Connection, Row};
use tokio_util::sync::CancellationToken;

use tmr_retry::RetryPolicy;
use tmr_types::{Metric, MetricKind, MetricValue, ValidationError};

use crate::{MetricStore, StoreError};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS metrics (
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    delta BIGINT NULL,
    value DOUBLE PRECISION NULL,
    CONSTRAINT metrics_name_type UNIQUE (name, type)
)
"#;

const UPSERT_GAUGE: &str = r#"
INSERT INTO metrics (name, type, value) VALUES ($1, 'gauge', $2)
ON CONFLICT (name, type) DO UPDATE SET value = excluded.value
"#;

const UPSERT_COUNTER: &str = r#"
INSERT INTO metrics (name, type, delta) VALUES ($1, 'counter', $2)
ON CONFLICT (name, type) DO UPDATE SET delta = metrics.delta + excluded.delta
"#;

const SELECT_GAUGE: &str = "SELECT value FROM metrics WHERE name = $1 AND type = 'gauge'";
const SELECT_COUNTER: &str = "SELECT delta FROM metrics WHERE name = $1 AND type = 'counter'";
const SELECT_ALL: &str = "SELECT name, type, delta, value FROM metrics";

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqlStoreConfig {
    /// `postgres://...` or `sqlite://...`
    pub dsn: String,
    pub max_connections: u32,
}

pub struct SqlStore {
    pool: AnyPool,
    retry: RetryPolicy,
    quit: CancellationToken,
    logger: Logger,
}

impl SqlStore {
    /// Connect and make sure the schema exists.
    pub async fn connect(
        config: &SqlStoreConfig,
        retry: RetryPolicy,
        quit: CancellationToken,
        logger: Logger,
    ) -> Result<Self, StoreError> {
        sqlx::any::install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(&config.dsn)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        info!(logger, "database schema ready");
        Ok(SqlStore {
            pool,
            retry,
            quit,
            logger,
        })
    }

    /// One transactional attempt.
    ///
    /// The outer error is a database failure worth retrying. The inner one
    /// is a counter overflow, after which the transaction is rolled back.
    async fn store_once(
        &self,
        metrics: &[Metric],
    ) -> Result<Result<(), ValidationError>, sqlx::Error> {
        // dropping the transaction without commit rolls it back
        let mut tx = self.pool.begin().await?;
        for m in metrics {
            match m.value {
                MetricValue::Gauge(v) => {
                    sqlx::query(UPSERT_GAUGE)
                        .bind(m.name.as_str())
                        .bind(v)
                        .execute(&mut *tx)
                        .await?;
                }
                MetricValue::Counter(d) => {
                    let row = sqlx::query(SELECT_COUNTER)
                        .bind(m.name.as_str())
                        .fetch_optional(&mut *tx)
                        .await?;
                    let current = match row {
                        Some(row) => row.try_get::<Option<i64>, _>("delta")?,
                        None => None,
                    };
                    if current.is_some_and(|sum| sum.checked_add(d).is_none()) {
                        return Ok(Err(ValidationError::CounterOverflow(m.name.clone())));
                    }

                    sqlx::query(UPSERT_COUNTER)
                        .bind(m.name.as_str())
                        .bind(d)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(Ok(()))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl MetricStore for SqlStore {
    fn backend(&self) -> &'static str {
        "sql"
    }

    async fn get_gauge(&self, name: &str) -> Result<Option<Metric>, StoreError> {
        let row = sqlx::query(SELECT_GAUGE)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let value: Option<f64> = row.try_get("value")?;
        Ok(value.map(|v| Metric::gauge(name, v)))
    }

    async fn get_counter(&self, name: &str) -> Result<Option<Metric>, StoreError> {
        let row = sqlx::query(SELECT_COUNTER)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let delta: Option<i64> = row.try_get("delta")?;
        Ok(delta.map(|d| Metric::counter(name, d)))
    }

    async fn store(&self, metrics: &[Metric]) -> Result<(), StoreError> {
        crate::validate_batch(metrics)?;
        if metrics.is_empty() {
            return Ok(());
        }
        self.retry
            .run(&self.quit, &self.logger, |_| self.store_once(metrics))
            .await
            .map_err(|e| StoreError::Persistence(Box::new(StoreError::Database(e))))??;
        debug!(self.logger, "stored {} metrics", metrics.len());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Metric>, StoreError> {
        let rows = sqlx::query(SELECT_ALL).fetch_all(&self.pool).await?;
        let mut metrics = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let kind: String = row.try_get("type")?;
            let value = match MetricKind::from_str(&kind)? {
                MetricKind::Gauge => row.try_get::<Option<f64>, _>("value")?.map(MetricValue::Gauge),
                MetricKind::Counter => row
                    .try_get::<Option<i64>, _>("delta")?
                    .map(MetricValue::Counter),
            };
            if let Some(value) = value {
                metrics.push(Metric { name, value });
            }
        }
        crate::sort_metrics(&mut metrics);
        Ok(metrics)
    }

    async fn health_check(&self) -> bool {
        match self.pool.acquire().await {
            Ok(mut conn) => conn.ping().await.is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::o;
    use std::path::Path;

    async fn connect(path: &Path) -> SqlStore {
        let config = SqlStoreConfig {
            dsn: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 4,
        };
        SqlStore::connect(
            &config,
            RetryPolicy::no_retry(),
            CancellationToken::new(),
            Logger::root(slog::Discard, o!()),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn upsert_laws() {
        let dir = tempfile::tempdir().unwrap();
        let store = connect(&dir.path().join("metrics.db")).await;

        store.store(&[Metric::gauge("A", 1.0)]).await.unwrap();
        store.store(&[Metric::gauge("A", 2.0)]).await.unwrap();
        assert_eq!(
            store.get_gauge("A").await.unwrap(),
            Some(Metric::gauge("A", 2.0))
        );

        store.store(&[Metric::counter("C", 5)]).await.unwrap();
        store.store(&[Metric::counter("C", 3)]).await.unwrap();
        assert_eq!(
            store.get_counter("C").await.unwrap(),
            Some(Metric::counter("C", 8))
        );

        store
            .store(&[
                Metric::counter("C", 1),
                Metric::counter("C", 1),
                Metric::gauge("A", 0.0),
            ])
            .await
            .unwrap();
        assert_eq!(
            store.list_all().await.unwrap(),
            vec![Metric::gauge("A", 0.0), Metric::counter("C", 10)]
        );
    }

    #[tokio::test]
    async fn unknown_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = connect(&dir.path().join("metrics.db")).await;
        store.store(&[Metric::counter("A", 1)]).await.unwrap();

        assert!(store.get_gauge("A").await.unwrap().is_none());
        assert!(store.get_counter("B").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn restart_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics.db");

        let store = connect(&path).await;
        store
            .store(&[Metric::gauge("Alloc", 12.5), Metric::counter("PollCount", 4)])
            .await
            .unwrap();
        let before = store.list_all().await.unwrap();
        store.close().await;

        let reopened = connect(&path).await;
        assert_eq!(reopened.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn invalid_batch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = connect(&dir.path().join("metrics.db")).await;

        let r = store
            .store(&[Metric::gauge("A", 1.0), Metric::counter("C", -1)])
            .await;
        assert!(matches!(r, Err(StoreError::Validation(_))));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn overflow_rolls_back_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = connect(&dir.path().join("metrics.db")).await;
        store
            .store(&[Metric::counter("C", i64::MAX - 1), Metric::gauge("A", 1.0)])
            .await
            .unwrap();
        let before = store.list_all().await.unwrap();

        // the gauge and the new counter are written before C overflows
        let r = store
            .store(&[
                Metric::gauge("A", 2.0),
                Metric::counter("D", 1),
                Metric::counter("C", 2),
            ])
            .await;
        assert!(matches!(
            r,
            Err(StoreError::Validation(ValidationError::CounterOverflow(_)))
        ));
        assert_eq!(store.list_all().await.unwrap(), before);
        assert_eq!(
            store.get_counter("C").await.unwrap(),
            Some(Metric::counter("C", i64::MAX - 1))
        );
        assert!(store.get_counter("D").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn overflow_inside_one_batch() {
        let dir = tempfile::tempdir().unwrap();
        let store = connect(&dir.path().join("metrics.db")).await;

        let r = store
            .store(&[Metric::counter("C", i64::MAX), Metric::counter("C", 1)])
            .await;
        assert!(r.unwrap_err().is_validation());
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn health() {
        let dir = tempfile::tempdir().unwrap();
        let store = connect(&dir.path().join("metrics.db")).await;
        assert!(store.health_check().await);
        store.close().await;
        assert!(!store.health_check().await);
    }
}
