// Copyright 2025 Workload Variant Autoscaler Developers
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

//! Per-tick derived state for a single variant.

use crate::variant::VariantId;
use std::time::Duration;

/// Mean saturation signal across a variant's replicas, as collected by
/// `wva-metrics`. Aggregation across replicas is the collector's job;
/// the analyzer only ever sees the mean (see spec.md §4.4.1 and the
/// Open Question resolved in DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Saturation {
    pub avg_kv_util: f64,
    pub avg_queue_len: f64,
}

/// Everything the Saturation Analyzer needs about one variant on one
/// tick, joined from the current replica count, the Metrics Collector,
/// and (for retention) the increase query.
#[derive(Debug, Clone)]
pub struct VariantRuntimeRecord {
    pub variant_id: VariantId,
    pub current_replicas: i64,
    /// `None` models spec.md §4.2's `ErrUnavailable`.
    pub saturation: Option<Saturation>,
    pub arrival_rate: f64,
    /// Request-count increase over the scaling entry's retention
    /// window; `None` when metrics were unavailable for that window
    /// too (routed to the same fallback path).
    pub recent_request_increase: Option<f64>,
    pub cost: f64,
    pub priority: i32,
    pub accelerator: String,
    pub accelerator_count: u32,
    pub min_replicas: Option<i64>,
    pub max_replicas: Option<i64>,
    pub retention_window: Duration,
}

impl VariantRuntimeRecord {
    /// Per spec.md §4.4.3: "any missing input is classified as metrics
    /// unavailable" — both the saturation signal and the retention
    /// window's increase figure are required inputs to the decision
    /// rule, so either being absent routes to the fallback rule.
    pub fn metrics_unavailable(&self) -> bool {
        self.saturation.is_none() || self.recent_request_increase.is_none()
    }
}
