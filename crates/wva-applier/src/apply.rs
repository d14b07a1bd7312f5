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

//! Wires bounds enforcement, the status store and the metrics sink
//! into the full five-step sequence of spec.md §4.6.

use crate::bounds::{clamp_to_bounds, enforce_scale_to_zero};
use crate::metrics::MetricsSink;
use crate::store::{StatusStore, StoreError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use wva_types::{Decision, ReasonCode, VariantStatus};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("status publish dropped after a second version conflict for {0}")]
    DroppedAfterConflict(wva_types::VariantId),
}

/// Per-variant context the Applier needs beyond the decision itself;
/// everything here is read from the `Variant` object and its resolved
/// scaling entry.
pub struct ApplyInput {
    pub namespace: String,
    pub model_id: String,
    pub min_replicas: Option<i64>,
    pub max_replicas: Option<i64>,
    pub enable_scale_to_zero: bool,
    pub now: DateTime<Utc>,
}

pub struct Applier {
    store: Arc<dyn StatusStore>,
    metrics: Arc<dyn MetricsSink>,
    controller_instance: String,
}

impl Applier {
    pub fn new(store: Arc<dyn StatusStore>, metrics: Arc<dyn MetricsSink>, controller_instance: String) -> Self {
        Applier {
            store,
            metrics,
            controller_instance,
        }
    }

    /// Runs steps 1-5 of spec.md §4.6 for one variant's decision.
    /// Never returns an error for a normal single-retry conflict
    /// resolution; only a *second* conflict is surfaced, matching the
    /// dispatcher's "log and move on to the next tick" contract.
    pub async fn apply(&self, decision: Decision, input: ApplyInput) -> Result<VariantStatus, ApplyError> {
        let (clamped, bound_changed) = clamp_to_bounds(decision.target, input.min_replicas, input.max_replicas);
        let reason = if bound_changed {
            ReasonCode::BoundClamped
        } else {
            decision.reason
        };
        let target = enforce_scale_to_zero(clamped, reason, input.enable_scale_to_zero, input.min_replicas);

        let previous = self.store.get(&decision.variant_id).await;
        let new_status = self.build_status(&decision.variant_id, target, reason, &previous, input.now);

        let expected_version = previous.as_ref().map(|s| s.version);
        match self.store.compare_and_swap(expected_version, new_status.clone()).await {
            Ok(()) => {}
            Err(StoreError::VersionConflict(_)) => {
                let reread = self.store.get(&decision.variant_id).await;
                let retry_status =
                    self.build_status(&decision.variant_id, target, reason, &reread, input.now);
                let retry_expected = reread.as_ref().map(|s| s.version);
                if self
                    .store
                    .compare_and_swap(retry_expected, retry_status)
                    .await
                    .is_err()
                {
                    tracing::warn!(
                        variant = %decision.variant_id,
                        "dropping status publish after a second version conflict; next tick will converge"
                    );
                    return Err(ApplyError::DroppedAfterConflict(decision.variant_id));
                }
            }
        }

        self.metrics.set_desired_replicas(
            &decision.variant_id.0,
            &input.namespace,
            &input.model_id,
            &self.controller_instance,
            target as f64,
        );

        Ok(new_status)
    }

    fn build_status(
        &self,
        variant_id: &wva_types::VariantId,
        target: i64,
        reason: ReasonCode,
        previous: &Option<VariantStatus>,
        now: DateTime<Utc>,
    ) -> VariantStatus {
        match previous {
            None => VariantStatus::initial(variant_id.clone(), target, reason, now),
            Some(prev) => {
                let unchanged = prev.target == target;
                VariantStatus {
                    variant_id: variant_id.clone(),
                    current_replicas: prev.target,
                    target,
                    last_run_time: now,
                    last_change_time: if unchanged { prev.last_change_time } else { now },
                    last_change_delta: if unchanged { 0 } else { target - prev.target },
                    reason,
                    version: prev.version,
                }
            }
        }
    }
}
