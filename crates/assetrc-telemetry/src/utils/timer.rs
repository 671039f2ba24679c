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

//! RAII timers that record their lifetime into a histogram.

use crate::metrics::registry::HistogramHandle;
use assetrc_core::Stopwatch;

/// Times the enclosing scope and records the duration, in milliseconds, into a
/// histogram when dropped. Early returns and unwinding are measured too.
pub struct ScopedMetricTimer<'a> {
    stopwatch: Stopwatch,
    histogram: Option<&'a HistogramHandle>,
}

impl<'a> ScopedMetricTimer<'a> {
    /// Starts timing for `histogram`.
    pub fn new(histogram: &'a HistogramHandle) -> Self {
        Self::maybe(Some(histogram))
    }

    /// Starts timing if a histogram is present; otherwise the timer is inert.
    pub fn maybe(histogram: Option<&'a HistogramHandle>) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            histogram,
        }
    }
}

impl Drop for ScopedMetricTimer<'_> {
    fn drop(&mut self) {
        if let Some(histogram) = self.histogram {
            if let Err(e) = histogram.observe(self.stopwatch.elapsed_ms_f64()) {
                log::warn!("[ScopedMetricTimer] Failed to record metric: {e}");
            }
        }
    }
}
