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

//! Saturation Analyzer (C4): pure, CPU-only per-variant decision rule
//! from spec.md §4.4 (CAPACITY-ONLY mode, the only mode in scope).
//!
//! The analyzer is handed the Collector's *average* saturation across
//! a variant's replicas (see DESIGN.md for why "average" rather than
//! "every replica individually" was chosen to resolve the spec's Open
//! Question) and never performs I/O or retries — a missing input is
//! always routed to rule 1.

use wva_types::{Decision, ReasonCode, ScalingEntry, Saturation, VariantRuntimeRecord};

/// A replica (or the variant's averaged signal) has crossed its
/// ceiling: spec.md §4.4.1.
pub fn is_saturated(saturation: Saturation, entry: &ScalingEntry) -> bool {
    saturation.avg_kv_util >= entry.kv_cache_threshold
        || saturation.avg_queue_len >= entry.queue_length_threshold as f64
}

/// Underused enough, by the configured margin, to be worth retiring:
/// spec.md §4.4.1.
pub fn has_significant_spare(saturation: Saturation, entry: &ScalingEntry) -> bool {
    saturation.avg_kv_util < entry.kv_cache_threshold - entry.kv_spare_trigger
        && saturation.avg_queue_len < (entry.queue_length_threshold - entry.queue_spare_trigger) as f64
}

/// Produces the decision for one variant given its runtime record and
/// composed scaling entry, following spec.md §4.4.2's numbered rules
/// in order; rule 3 wins over rule 4 when both preconditions would
/// otherwise hold (mixed saturated/spare never happens simultaneously
/// under this crate's binary saturated/spare classification, but the
/// ordering below preserves the documented tie-break regardless).
pub fn decide(record: &VariantRuntimeRecord, entry: &ScalingEntry) -> Decision {
    let mut decision = base_decision(record);

    if record.metrics_unavailable() {
        decision.target = std::cmp::max(1, record.min_replicas.unwrap_or(0));
        decision.reason = ReasonCode::FallbackMetricsUnavailable;
        return decision;
    }

    let saturation = record.saturation.expect("checked by metrics_unavailable");
    let saturated = is_saturated(saturation, entry);
    let spare = has_significant_spare(saturation, entry);

    decision.pressure = pressure(saturated, spare);

    let n = record.current_replicas;
    let floor = std::cmp::max(1, record.min_replicas.unwrap_or(0));

    if saturated {
        // Rules 2 and 3 of spec.md §4.4.2 both resolve to N+1 under
        // this crate's aggregate saturation signal.
        decision.target = n + 1;
        decision.reason = ReasonCode::Optimizer;
    } else if spare && record.arrival_rate > 0.0 && n > floor {
        decision.target = n - 1;
        decision.reason = ReasonCode::Optimizer;
    } else if entry.enable_scale_to_zero && record.recent_request_increase == Some(0.0) {
        decision.target = 0;
        decision.reason = ReasonCode::ScaleToZero;
    } else {
        decision.target = n;
        decision.reason = ReasonCode::Optimizer;
    }

    decision
}

fn base_decision(record: &VariantRuntimeRecord) -> Decision {
    let mut decision = Decision::new(record.variant_id.clone(), record.current_replicas, ReasonCode::Optimizer);
    decision.accelerator = record.accelerator.clone();
    decision.accelerator_count = record.accelerator_count;
    decision.priority = record.priority;
    decision.cost = record.cost;
    decision
}

/// `pressure = 1 - min(X, 1 - S)` from spec.md §4.5, with `S`/`X`
/// collapsed to `{0.0, 1.0}` under this crate's saturated/spare
/// classification (DESIGN.md records this as the resolution of the
/// spec's open question on fractional vs. boolean saturation).
fn pressure(saturated: bool, spare: bool) -> f64 {
    let s = if saturated { 1.0 } else { 0.0 };
    let x = if spare { 1.0 } else { 0.0 };
    1.0 - f64::min(x, 1.0 - s)
}
