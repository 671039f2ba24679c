// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::storage::backend::MetricsBackend;
use assetrc_core::telemetry::{Metric, MetricId, MetricsError, MetricsResult};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory metrics backend using `RwLock<HashMap>`.
///
/// Reads run concurrently; every update takes the write lock for the duration
/// of a single read-modify-write, so concurrent increments are never lost.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    storage: RwLock<HashMap<MetricId, Metric>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> MetricsResult<RwLockReadGuard<'_, HashMap<MetricId, Metric>>> {
        self.storage
            .read()
            .map_err(|_| MetricsError::StorageError("Failed to acquire read lock".to_string()))
    }

    fn write(&self) -> MetricsResult<RwLockWriteGuard<'_, HashMap<MetricId, Metric>>> {
        self.storage
            .write()
            .map_err(|_| MetricsError::StorageError("Failed to acquire write lock".to_string()))
    }

    /// Returns every metric registered under `namespace`.
    pub fn get_metrics_by_namespace(&self, namespace: &str) -> Vec<Metric> {
        match self.read() {
            Ok(storage) => storage
                .values()
                .filter(|metric| metric.id.namespace == namespace)
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl MetricsBackend for InMemoryBackend {
    fn put_metric(&self, metric: Metric) -> MetricsResult<()> {
        self.write()?.insert(metric.id.clone(), metric);
        Ok(())
    }

    fn register_metric(&self, metric: Metric) -> MetricsResult<Metric> {
        let mut storage = self.write()?;
        Ok(storage.entry(metric.id.clone()).or_insert(metric).clone())
    }

    fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.read()?
            .get(id)
            .cloned()
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))
    }

    fn contains_metric(&self, id: &MetricId) -> bool {
        self.read().is_ok_and(|storage| storage.contains_key(id))
    }

    fn update_metric(
        &self,
        id: &MetricId,
        update: &mut dyn FnMut(&mut Metric) -> MetricsResult<()>,
    ) -> MetricsResult<()> {
        let mut storage = self.write()?;
        let metric = storage
            .get_mut(id)
            .ok_or_else(|| MetricsError::MetricNotFound(id.clone()))?;
        update(metric)?;
        metric.touch();
        Ok(())
    }

    fn list_all_metrics(&self) -> Vec<Metric> {
        self.read()
            .map(|storage| storage.values().cloned().collect())
            .unwrap_or_default()
    }

    fn clear_all(&self) -> MetricsResult<()> {
        self.write()?.clear();
        Ok(())
    }

    fn metric_count(&self) -> usize {
        self.read().map_or(0, |storage| storage.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetrc_core::telemetry::{MetricValue, HISTOGRAM_SAMPLE_CAPACITY};
    use std::sync::Arc;

    #[test]
    fn test_put_and_get() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "counter");
        backend
            .put_metric(Metric::new_counter(id.clone(), "Test counter", 42))
            .unwrap();

        assert!(backend.contains_metric(&id));
        assert_eq!(backend.get_metric(&id).unwrap().value.as_counter(), Some(42));
        assert_eq!(backend.metric_count(), 1);
    }

    #[test]
    fn test_missing_metric_is_reported() {
        let backend = InMemoryBackend::new();
        let err = backend
            .increment_counter(&MetricId::new("test", "missing"), 1)
            .unwrap_err();
        assert!(matches!(err, MetricsError::MetricNotFound(_)));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "gauge");
        backend
            .put_metric(Metric::new_gauge(id.clone(), "Test gauge", "items", 0.0))
            .unwrap();

        let err = backend.increment_counter(&id, 1).unwrap_err();
        assert!(matches!(err, MetricsError::TypeMismatch { .. }));
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "latency");
        backend
            .put_metric(Metric::new_histogram(id.clone(), "Latency", "ms", vec![1.0, 10.0]))
            .unwrap();

        backend.record_histogram_sample(&id, 0.5).unwrap();
        backend.record_histogram_sample(&id, 5.0).unwrap();
        backend.record_histogram_sample(&id, 50.0).unwrap();

        match backend.get_metric(&id).unwrap().value {
            MetricValue::Histogram {
                samples,
                bucket_counts,
                ..
            } => {
                assert_eq!(samples.len(), 3);
                assert_eq!(bucket_counts, vec![1, 2]);
            }
            other => panic!("Expected histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_histogram_keeps_only_recent_samples() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "latency");
        backend
            .put_metric(Metric::new_histogram(id.clone(), "Latency", "ms", vec![10.0]))
            .unwrap();

        let total = HISTOGRAM_SAMPLE_CAPACITY + 10;
        for i in 0..total {
            backend.record_histogram_sample(&id, i as f64).unwrap();
        }

        match backend.get_metric(&id).unwrap().value {
            MetricValue::Histogram {
                samples,
                sample_count,
                bucket_counts,
                ..
            } => {
                assert_eq!(samples.len(), HISTOGRAM_SAMPLE_CAPACITY);
                assert_eq!(samples[0], 10.0);
                assert_eq!(samples.last(), Some(&((total - 1) as f64)));
                assert_eq!(sample_count, total as u64);
                assert_eq!(bucket_counts, vec![11]);
            }
            other => panic!("Expected histogram, got {other:?}"),
        }
    }

    #[test]
    fn test_register_metric_keeps_existing_value() {
        let backend = InMemoryBackend::new();
        let id = MetricId::new("test", "counter");
        backend
            .register_metric(Metric::new_counter(id.clone(), "Test counter", 0))
            .unwrap();
        backend.increment_counter(&id, 3).unwrap();

        let stored = backend
            .register_metric(Metric::new_counter(id.clone(), "Test counter", 0))
            .unwrap();
        assert_eq!(stored.value.as_counter(), Some(3));
        assert_eq!(backend.metric_count(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let backend = Arc::new(InMemoryBackend::new());
        let id = MetricId::new("test", "counter");
        backend
            .put_metric(Metric::new_counter(id.clone(), "Test counter", 0))
            .unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        backend.increment_counter(&id, 1).unwrap();
                    }
                });
            }
        });

        assert_eq!(backend.get_metric(&id).unwrap().value.as_counter(), Some(800));
    }

    #[test]
    fn test_namespace_filter_and_clear() {
        let backend = InMemoryBackend::new();
        backend
            .put_metric(Metric::new_counter(MetricId::new("assets", "a"), "a", 0))
            .unwrap();
        backend
            .put_metric(Metric::new_counter(MetricId::new("other", "b"), "b", 0))
            .unwrap();

        assert_eq!(backend.get_metrics_by_namespace("assets").len(), 1);
        backend.clear_all().unwrap();
        assert_eq!(backend.metric_count(), 0);
    }
}
