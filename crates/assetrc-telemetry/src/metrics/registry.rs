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

//! Registry for managing metrics.

use crate::storage::{backend::MetricsBackend, memory_backend::InMemoryBackend};
use assetrc_core::telemetry::{Metric, MetricId, MetricType, MetricsError, MetricsResult};
use std::sync::Arc;

/// Central entry point for registering and querying metrics.
///
/// Registration returns a cheap, cloneable handle bound to the metric, so hot
/// paths never look metrics up by name.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    backend: Arc<dyn MetricsBackend>,
}

impl MetricsRegistry {
    /// Creates a registry backed by an [`InMemoryBackend`].
    pub fn new() -> Self {
        Self {
            backend: Arc::new(InMemoryBackend::new()),
        }
    }

    /// Creates a registry over a custom backend.
    pub fn with_backend(backend: Arc<dyn MetricsBackend>) -> Self {
        Self { backend }
    }

    /// Registers a counter starting at zero, or binds to the existing counter with
    /// the same ID (keeping its value).
    ///
    /// # Errors
    /// [`MetricsError::TypeMismatch`] if the ID is already registered as another type.
    pub fn register_counter(
        &self,
        id: MetricId,
        description: impl Into<String>,
    ) -> MetricsResult<CounterHandle> {
        self.register(Metric::new_counter(id.clone(), description, 0))?;
        Ok(CounterHandle::new(id, self.backend.clone()))
    }

    /// Registers a gauge starting at zero, or binds to the existing one.
    pub fn register_gauge(
        &self,
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
    ) -> MetricsResult<GaugeHandle> {
        self.register(Metric::new_gauge(id.clone(), description, unit, 0.0))?;
        Ok(GaugeHandle::new(id, self.backend.clone()))
    }

    /// Registers an empty histogram, or binds to the existing one. The buckets of
    /// an existing histogram are kept.
    pub fn register_histogram(
        &self,
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        buckets: Vec<f64>,
    ) -> MetricsResult<HistogramHandle> {
        self.register(Metric::new_histogram(id.clone(), description, unit, buckets))?;
        Ok(HistogramHandle::new(id, self.backend.clone()))
    }

    fn register(&self, metric: Metric) -> MetricsResult<()> {
        let expected = metric.value.metric_type();
        let stored = self.backend.register_metric(metric)?;
        let found = stored.value.metric_type();
        if found != expected {
            return Err(MetricsError::TypeMismatch { expected, found });
        }
        Ok(())
    }

    /// Gets a copy of a metric by ID.
    pub fn get_metric(&self, id: &MetricId) -> MetricsResult<Metric> {
        self.backend.get_metric(id)
    }

    /// Checks if a metric exists.
    pub fn contains_metric(&self, id: &MetricId) -> bool {
        self.backend.contains_metric(id)
    }

    /// Gets every metric in a namespace.
    pub fn get_namespace_metrics(&self, namespace: &str) -> Vec<Metric> {
        self.backend
            .list_all_metrics()
            .into_iter()
            .filter(|m| m.id.namespace == namespace)
            .collect()
    }

    /// Total number of registered metrics.
    pub fn metric_count(&self) -> usize {
        self.backend.metric_count()
    }

    /// Removes every metric.
    pub fn clear_all(&self) -> MetricsResult<()> {
        self.backend.clear_all()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for counter operations.
#[derive(Debug, Clone)]
pub struct CounterHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl CounterHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Increments the counter by 1.
    pub fn increment(&self) -> MetricsResult<u64> {
        self.backend.increment_counter(&self.id, 1)
    }

    /// Current counter value.
    pub fn get(&self) -> MetricsResult<u64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_counter()
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: metric.value.metric_type(),
            })
    }

    /// The metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for gauge operations.
#[derive(Debug, Clone)]
pub struct GaugeHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl GaugeHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Sets the gauge.
    pub fn set(&self, value: f64) -> MetricsResult<()> {
        self.backend.set_gauge(&self.id, value)
    }

    /// Adds `delta` (which may be negative) and returns the new value.
    pub fn add(&self, delta: f64) -> MetricsResult<f64> {
        self.backend.add_to_gauge(&self.id, delta)
    }

    /// Current gauge value.
    pub fn get(&self) -> MetricsResult<f64> {
        let metric = self.backend.get_metric(&self.id)?;
        metric
            .value
            .as_gauge()
            .ok_or_else(|| MetricsError::TypeMismatch {
                expected: MetricType::Gauge,
                found: metric.value.metric_type(),
            })
    }

    /// The metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

/// Handle for histogram operations.
#[derive(Debug, Clone)]
pub struct HistogramHandle {
    id: MetricId,
    backend: Arc<dyn MetricsBackend>,
}

impl HistogramHandle {
    fn new(id: MetricId, backend: Arc<dyn MetricsBackend>) -> Self {
        Self { id, backend }
    }

    /// Records a sample.
    pub fn observe(&self, value: f64) -> MetricsResult<()> {
        self.backend.record_histogram_sample(&self.id, value)
    }

    /// The full histogram metric.
    pub fn get_metric(&self) -> MetricsResult<Metric> {
        self.backend.get_metric(&self.id)
    }

    /// The metric ID.
    pub fn id(&self) -> &MetricId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetrc_core::telemetry::MetricValue;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert_eq!(registry.metric_count(), 0);
    }

    #[test]
    fn test_counter_registration_and_operations() {
        let registry = MetricsRegistry::new();
        let counter = registry
            .register_counter(MetricId::new("assets", "loaded_total"), "Assets loaded")
            .unwrap();

        assert_eq!(counter.increment().unwrap(), 1);
        assert_eq!(counter.increment().unwrap(), 2);
        assert_eq!(counter.get().unwrap(), 2);
        assert!(registry.contains_metric(counter.id()));
    }

    #[test]
    fn test_gauge_registration_and_operations() {
        let registry = MetricsRegistry::new();
        let gauge = registry
            .register_gauge(MetricId::new("assets", "live_entries"), "Live entries", "entries")
            .unwrap();

        gauge.set(3.0).unwrap();
        assert_eq!(gauge.add(2.0).unwrap(), 5.0);
        assert_eq!(gauge.add(-4.0).unwrap(), 1.0);
        assert_eq!(gauge.get().unwrap(), 1.0);
    }

    #[test]
    fn test_histogram_registration_and_operations() {
        let registry = MetricsRegistry::new();
        let histogram = registry
            .register_histogram(
                MetricId::new("assets", "load_time"),
                "Load time",
                "ms",
                vec![1.0, 5.0, 16.0],
            )
            .unwrap();

        histogram.observe(2.5).unwrap();
        histogram.observe(15.0).unwrap();

        if let MetricValue::Histogram { samples, .. } = histogram.get_metric().unwrap().value {
            assert_eq!(samples, vec![2.5, 15.0]);
        } else {
            panic!("Expected histogram metric");
        }
    }

    #[test]
    fn test_reregistration_keeps_existing_values() {
        let registry = MetricsRegistry::new();
        let id = MetricId::new("assets", "loaded_total");
        let first = registry.register_counter(id.clone(), "Assets loaded").unwrap();
        first.increment().unwrap();
        first.increment().unwrap();

        let second = registry.register_counter(id.clone(), "Assets loaded").unwrap();
        assert_eq!(second.get().unwrap(), 2);
        second.increment().unwrap();
        assert_eq!(first.get().unwrap(), 3);
        assert_eq!(registry.metric_count(), 1);
    }

    #[test]
    fn test_reregistration_as_other_type_fails() {
        let registry = MetricsRegistry::new();
        let id = MetricId::new("assets", "live_entries");
        registry.register_gauge(id.clone(), "Live", "entries").unwrap();

        let err = registry.register_counter(id, "Live").unwrap_err();
        assert!(matches!(
            err,
            MetricsError::TypeMismatch {
                expected: MetricType::Counter,
                found: MetricType::Gauge,
            }
        ));
    }

    #[test]
    fn test_namespace_filtering_and_clear() {
        let registry = MetricsRegistry::new();
        registry
            .register_counter(MetricId::new("assets", "a"), "a")
            .unwrap();
        registry
            .register_counter(MetricId::new("assets", "b"), "b")
            .unwrap();
        registry
            .register_gauge(MetricId::new("memory", "heap"), "Heap", "MB")
            .unwrap();

        assert_eq!(registry.get_namespace_metrics("assets").len(), 2);
        registry.clear_all().unwrap();
        assert_eq!(registry.metric_count(), 0);
    }
}
