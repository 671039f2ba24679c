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

//! Metric handles a [`RefCountedCache`](crate::RefCountedCache) records into.

use assetrc_core::telemetry::{MetricId, MetricsResult};
use assetrc_core::CacheConfig;
use assetrc_telemetry::{CounterHandle, GaugeHandle, HistogramHandle, MetricsRegistry};

const NAMESPACE: &str = "assets";

/// Upper bounds, in milliseconds, of the load-time histogram buckets.
pub const LOAD_TIME_BUCKETS_MS: [f64; 6] = [1.0, 5.0, 16.0, 33.0, 100.0, 500.0];

/// The metrics of one cache, labelled with its root and provider.
///
/// Registration binds to metrics that already exist under the same labels, so a
/// cache recreated for a config keeps accumulating where its predecessor stopped,
/// and caches with equal configs on one registry report their sum.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    /// Load functions that completed successfully.
    pub loaded_total: CounterHandle,
    /// Loads satisfied by an existing entry.
    pub hits_total: CounterHandle,
    /// Entries evicted, by refcount reaching zero or by `unload_all`.
    pub released_total: CounterHandle,
    /// Entries currently present.
    pub live_entries: GaugeHandle,
    /// Time spent inside load functions.
    pub load_time: HistogramHandle,
}

impl CacheMetrics {
    /// Registers the cache metrics for `config` on `registry`.
    pub fn register(registry: &MetricsRegistry, config: &CacheConfig) -> MetricsResult<Self> {
        let id = |name: &str| {
            MetricId::new(NAMESPACE, name)
                .with_label("root", config.root())
                .with_label("provider", config.provider().as_str())
        };

        Ok(Self {
            loaded_total: registry
                .register_counter(id("loaded_total"), "Assets constructed by a load function")?,
            hits_total: registry
                .register_counter(id("hits_total"), "Loads served from an existing entry")?,
            released_total: registry
                .register_counter(id("released_total"), "Entries evicted from the cache")?,
            live_entries: registry.register_gauge(
                id("live_entries"),
                "Entries currently cached",
                "entries",
            )?,
            load_time: registry.register_histogram(
                id("load_time"),
                "Time spent in load functions",
                "ms",
                LOAD_TIME_BUCKETS_MS.to_vec(),
            )?,
        })
    }

    pub(crate) fn record_load(&self) {
        warn_on_error(self.loaded_total.increment());
        warn_on_error(self.live_entries.add(1.0));
    }

    pub(crate) fn record_hit(&self) {
        warn_on_error(self.hits_total.increment());
    }

    pub(crate) fn record_release(&self) {
        warn_on_error(self.released_total.increment());
        warn_on_error(self.live_entries.add(-1.0));
    }
}

fn warn_on_error<T>(result: MetricsResult<T>) {
    if let Err(e) = result {
        log::warn!("Failed to record cache metric: {e}");
    }
}
