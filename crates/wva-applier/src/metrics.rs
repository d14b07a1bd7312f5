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

//! Step 5 of spec.md §4.6: the numeric signal the external actuator
//! actually reads.

use parking_lot::Mutex;
use prometheus::{GaugeVec, Opts, Registry};
use std::collections::HashMap;

/// Emits `desired_replicas{variant,namespace,modelID,controllerInstance}`.
/// Append-only from the Applier's perspective: the backend scrapes
/// concurrently, per spec.md §5's shared-resource policy.
pub trait MetricsSink: Send + Sync {
    fn set_desired_replicas(
        &self,
        variant_id: &str,
        namespace: &str,
        model_id: &str,
        controller_instance: &str,
        value: f64,
    );
}

pub struct PrometheusMetricsSink {
    gauge: GaugeVec,
}

impl PrometheusMetricsSink {
    pub fn new(registry: &Registry) -> prometheus::Result<Self> {
        let gauge = GaugeVec::new(
            Opts::new("desired_replicas", "Target replica count computed by the autoscaler"),
            &["variant", "namespace", "modelID", "controllerInstance"],
        )?;
        registry.register(Box::new(gauge.clone()))?;
        Ok(PrometheusMetricsSink { gauge })
    }
}

impl MetricsSink for PrometheusMetricsSink {
    fn set_desired_replicas(
        &self,
        variant_id: &str,
        namespace: &str,
        model_id: &str,
        controller_instance: &str,
        value: f64,
    ) {
        self.gauge
            .with_label_values(&[variant_id, namespace, model_id, controller_instance])
            .set(value);
    }
}

/// Test double recording the last value set per label tuple.
#[derive(Default)]
pub struct RecordingMetricsSink {
    values: Mutex<HashMap<(String, String, String, String), f64>>,
}

impl RecordingMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, variant_id: &str, namespace: &str, model_id: &str, controller_instance: &str) -> Option<f64> {
        self.values
            .lock()
            .get(&(
                variant_id.to_string(),
                namespace.to_string(),
                model_id.to_string(),
                controller_instance.to_string(),
            ))
            .copied()
    }
}

impl MetricsSink for RecordingMetricsSink {
    fn set_desired_replicas(
        &self,
        variant_id: &str,
        namespace: &str,
        model_id: &str,
        controller_instance: &str,
        value: f64,
    ) {
        self.values.lock().insert(
            (
                variant_id.to_string(),
                namespace.to_string(),
                model_id.to_string(),
                controller_instance.to_string(),
            ),
            value,
        );
    }
}
