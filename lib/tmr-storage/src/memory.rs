/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::sync::Mutex;

use ahash::AHashMap;
use async_trait::async_trait;

use tmr_types::{Metric, MetricKind, MetricValue, ValidationError};

use crate::{MetricStore, StoreError};

type MetricKey = (MetricKind, String);

/// Values replaced by one applied batch.
#[must_use]
pub struct Undo {
    previous: Vec<(MetricKey, Option<MetricValue>)>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<AHashMap<MetricKey, MetricValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn get_metric(&self, kind: MetricKind, name: &str) -> Option<Metric> {
        let map = self.inner.lock().unwrap();
        map.get(&(kind, name.to_string())).map(|v| Metric {
            name: name.to_string(),
            value: *v,
        })
    }

    /// Apply a batch under a single lock.
    ///
    /// Counter sums are computed on a staging map first, so an overflow
    /// anywhere in the batch leaves the store untouched.
    pub fn apply(&self, metrics: &[Metric]) -> Result<(), StoreError> {
        self.apply_with_undo(metrics).map(|_| ())
    }

    /// Like [`MemoryStore::apply`], also returning what it takes to revert
    /// the batch with [`MemoryStore::undo`].
    pub fn apply_with_undo(&self, metrics: &[Metric]) -> Result<Undo, StoreError> {
        crate::validate_batch(metrics)?;

        let mut map = self.inner.lock().unwrap();
        let mut staged: AHashMap<MetricKey, MetricValue> = AHashMap::with_capacity(metrics.len());
        for m in metrics {
            let key = (m.kind(), m.name.clone());
            let merged = match m.value {
                MetricValue::Gauge(_) => m.value,
                MetricValue::Counter(delta) => {
                    let current = staged.get(&key).or_else(|| map.get(&key)).copied();
                    match current {
                        Some(MetricValue::Counter(sum)) => {
                            let sum = sum
                                .checked_add(delta)
                                .ok_or_else(|| ValidationError::CounterOverflow(m.name.clone()))?;
                            MetricValue::Counter(sum)
                        }
                        _ => m.value,
                    }
                }
            };
            staged.insert(key, merged);
        }

        let previous = staged
            .keys()
            .map(|key| (key.clone(), map.get(key).copied()))
            .collect();
        map.extend(staged);
        Ok(Undo { previous })
    }

    /// Put back the values a batch replaced.
    ///
    /// Only valid while no other batch was applied after the one that
    /// produced `undo`.
    pub fn undo(&self, undo: Undo) {
        let mut map = self.inner.lock().unwrap();
        for (key, value) in undo.previous {
            match value {
                Some(v) => {
                    map.insert(key, v);
                }
                None => {
                    map.remove(&key);
                }
            }
        }
    }

    /// Write records as final values, without accumulation.
    pub fn restore(&self, metrics: Vec<Metric>) {
        let mut map = self.inner.lock().unwrap();
        for m in metrics {
            map.insert((m.kind(), m.name), m.value);
        }
    }

    pub fn snapshot(&self) -> Vec<Metric> {
        let mut metrics: Vec<Metric> = {
            let map = self.inner.lock().unwrap();
            map.iter()
                .map(|((_, name), value)| Metric {
                    name: name.clone(),
                    value: *value,
                })
                .collect()
        };
        crate::sort_metrics(&mut metrics);
        metrics
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MetricStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get_gauge(&self, name: &str) -> Result<Option<Metric>, StoreError> {
        Ok(self.get_metric(MetricKind::Gauge, name))
    }

    async fn get_counter(&self, name: &str) -> Result<Option<Metric>, StoreError> {
        Ok(self.get_metric(MetricKind::Counter, name))
    }

    async fn store(&self, metrics: &[Metric]) -> Result<(), StoreError> {
        self.apply(metrics)
    }

    async fn list_all(&self) -> Result<Vec<Metric>, StoreError> {
        Ok(self.snapshot())
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_last_write_wins() {
        let store = MemoryStore::new();
        store.apply(&[Metric::gauge("A", 1.0)]).unwrap();
        store.apply(&[Metric::gauge("A", 2.0)]).unwrap();
        assert_eq!(
            store.get_metric(MetricKind::Gauge, "A"),
            Some(Metric::gauge("A", 2.0))
        );

        store
            .apply(&[Metric::gauge("B", 5.0), Metric::gauge("B", 0.5)])
            .unwrap();
        assert_eq!(
            store.get_metric(MetricKind::Gauge, "B"),
            Some(Metric::gauge("B", 0.5))
        );
    }

    #[test]
    fn counter_accumulates() {
        let store = MemoryStore::new();
        store.apply(&[Metric::counter("C", 5)]).unwrap();
        store.apply(&[Metric::counter("C", 3)]).unwrap();
        assert_eq!(
            store.get_metric(MetricKind::Counter, "C"),
            Some(Metric::counter("C", 8))
        );
    }

    #[test]
    fn batching_does_not_matter() {
        let deltas = [4i64, 0, 7, 1, 12, 3];

        let one_by_one = MemoryStore::new();
        for d in deltas {
            one_by_one.apply(&[Metric::counter("C", d)]).unwrap();
        }

        let batched = MemoryStore::new();
        let first: Vec<_> = deltas[..2].iter().map(|d| Metric::counter("C", *d)).collect();
        let rest: Vec<_> = deltas[2..].iter().map(|d| Metric::counter("C", *d)).collect();
        batched.apply(&rest).unwrap();
        batched.apply(&first).unwrap();

        let expected = Some(Metric::counter("C", deltas.iter().sum()));
        assert_eq!(one_by_one.get_metric(MetricKind::Counter, "C"), expected);
        assert_eq!(batched.get_metric(MetricKind::Counter, "C"), expected);
    }

    #[test]
    fn same_name_different_kind() {
        let store = MemoryStore::new();
        store
            .apply(&[Metric::gauge("X", 1.5), Metric::counter("X", 2)])
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.get_metric(MetricKind::Gauge, "X"),
            Some(Metric::gauge("X", 1.5))
        );
        assert_eq!(
            store.get_metric(MetricKind::Counter, "X"),
            Some(Metric::counter("X", 2))
        );
    }

    #[test]
    fn unknown_is_none() {
        let store = MemoryStore::new();
        assert!(store.get_metric(MetricKind::Gauge, "missing").is_none());
    }

    #[test]
    fn batch_is_atomic() {
        let store = MemoryStore::new();
        store.apply(&[Metric::counter("C", i64::MAX - 1)]).unwrap();

        let r = store.apply(&[Metric::gauge("G", 1.0), Metric::counter("C", 2)]);
        assert!(matches!(
            r,
            Err(StoreError::Validation(ValidationError::CounterOverflow(_)))
        ));
        assert!(store.get_metric(MetricKind::Gauge, "G").is_none());
        assert_eq!(
            store.get_metric(MetricKind::Counter, "C"),
            Some(Metric::counter("C", i64::MAX - 1))
        );

        let r = store.apply(&[Metric::gauge("G", 1.0), Metric::gauge("H", -1.0)]);
        assert!(r.is_err());
        assert!(store.get_metric(MetricKind::Gauge, "G").is_none());
    }

    #[test]
    fn undo_reverts_batch() {
        let store = MemoryStore::new();
        store
            .apply(&[Metric::counter("C", 5), Metric::gauge("A", 1.0)])
            .unwrap();

        let undo = store
            .apply_with_undo(&[
                Metric::counter("C", 3),
                Metric::gauge("A", 2.0),
                Metric::gauge("New", 1.0),
            ])
            .unwrap();
        assert_eq!(
            store.get_metric(MetricKind::Counter, "C"),
            Some(Metric::counter("C", 8))
        );

        store.undo(undo);
        assert_eq!(
            store.snapshot(),
            vec![Metric::gauge("A", 1.0), Metric::counter("C", 5)]
        );
    }

    #[test]
    fn restore_does_not_accumulate() {
        let store = MemoryStore::new();
        store.apply(&[Metric::counter("C", 10)]).unwrap();
        store.restore(vec![Metric::counter("C", 10)]);
        assert_eq!(
            store.get_metric(MetricKind::Counter, "C"),
            Some(Metric::counter("C", 10))
        );
    }

    #[test]
    fn concurrent_counters() {
        let store = MemoryStore::new();
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..500 {
                        store.apply(&[Metric::counter("PollCount", 1)]).unwrap();
                    }
                });
            }
        });
        assert_eq!(
            store.get_metric(MetricKind::Counter, "PollCount"),
            Some(Metric::counter("PollCount", 4000))
        );
    }
}
