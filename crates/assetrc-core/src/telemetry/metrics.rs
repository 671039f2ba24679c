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

//! Abstract definitions for cache metrics.

use std::fmt::{self, Display};
use std::time::Instant;
use thiserror::Error;

/// A structured identifier for a metric: a namespace, a name and sorted labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricId {
    /// The broad category of the metric (e.g., "assets").
    pub namespace: String,
    /// The specific name of the metric (e.g., "loaded_total").
    pub name: String,
    /// Key-value pairs for dimensional filtering, kept sorted by key.
    pub labels: Vec<(String, String)>,
}

impl MetricId {
    /// Creates a new `MetricId` with a namespace and a name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            labels: Vec::new(),
        }
    }

    /// Adds a dimensional label, keeping labels sorted by key.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self.labels.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.name)?;
        if !self.labels.is_empty() {
            let labels = self
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            write!(f, "[{labels}]")?;
        }
        Ok(())
    }
}

/// Raw histogram samples kept per metric; older samples are dropped first.
/// Bucket counts keep counting every observation.
pub const HISTOGRAM_SAMPLE_CAPACITY: usize = 1024;

/// The fundamental type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// A value that only ever increases.
    Counter,
    /// A value that can go up or down.
    Gauge,
    /// The distribution of a set of measurements.
    Histogram,
}

/// The current value of a metric.
#[derive(Debug, Clone)]
pub enum MetricValue {
    /// Counter value.
    Counter(u64),
    /// Gauge value.
    Gauge(f64),
    /// Histogram samples and their bucket distribution.
    Histogram {
        /// The most recent raw samples, at most [`HISTOGRAM_SAMPLE_CAPACITY`].
        samples: Vec<f64>,
        /// Every sample ever observed, including those no longer kept in `samples`.
        sample_count: u64,
        /// The upper bounds of the buckets.
        bucket_bounds: Vec<f64>,
        /// The number of samples at or below each bound.
        bucket_counts: Vec<u64>,
    },
}

impl MetricValue {
    /// Returns the [`MetricType`] corresponding to this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
            MetricValue::Histogram { .. } => MetricType::Histogram,
        }
    }

    /// Returns the value if this is a counter.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value if this is a gauge.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }
}

/// A metric value together with its descriptive metadata.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric's identifier.
    pub id: MetricId,
    /// A human-readable description.
    pub description: String,
    /// The unit of measurement (e.g., "ms", "count").
    pub unit: String,
    /// When the value last changed.
    pub last_updated: Instant,
    /// The current value.
    pub value: MetricValue,
}

impl Metric {
    fn with_value(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        value: MetricValue,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            unit: unit.into(),
            last_updated: Instant::now(),
            value,
        }
    }

    /// Creates a counter starting at `initial_value`.
    pub fn new_counter(id: MetricId, description: impl Into<String>, initial_value: u64) -> Self {
        Self::with_value(id, description, "count", MetricValue::Counter(initial_value))
    }

    /// Creates a gauge starting at `initial_value`.
    pub fn new_gauge(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        initial_value: f64,
    ) -> Self {
        Self::with_value(id, description, unit, MetricValue::Gauge(initial_value))
    }

    /// Creates an empty histogram with the given bucket upper bounds.
    pub fn new_histogram(
        id: MetricId,
        description: impl Into<String>,
        unit: impl Into<String>,
        bucket_bounds: Vec<f64>,
    ) -> Self {
        let bucket_counts = vec![0; bucket_bounds.len()];
        Self::with_value(
            id,
            description,
            unit,
            MetricValue::Histogram {
                samples: Vec::new(),
                sample_count: 0,
                bucket_bounds,
                bucket_counts,
            },
        )
    }

    /// Marks the metric as updated now.
    pub fn touch(&mut self) {
        self.last_updated = Instant::now();
    }
}

/// A specialized `Result` type for metric operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur within the metrics system.
#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    /// The requested metric was not registered.
    #[error("metric not found: {0}")]
    MetricNotFound(MetricId),
    /// An operation was attempted on a metric of the wrong type.
    #[error("type mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// The type the operation needs.
        expected: MetricType,
        /// The type actually stored.
        found: MetricType,
    },
    /// The storage backend failed.
    #[error("storage error: {0}")]
    StorageError(String),
}
