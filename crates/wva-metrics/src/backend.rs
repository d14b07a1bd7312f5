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

//! The metrics-backend seam (spec.md §1: the time-series query service
//! is an external collaborator, only its interface is in scope here).

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub arrival_rate: f64,
    pub avg_kv_util: f64,
    pub avg_queue_len: f64,
    pub recent_request_increase: f64,
}

/// Spec.md §4.2: reported when the backend returns no series, returns
/// series lacking the required `(modelID, namespace)` labels, or the
/// query fails after its deadline. Never fatal, never retried inside
/// the call — the analyzer routes this straight to its fallback rule.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectError {
    #[error("no series for (modelID={model_id}, namespace={namespace})")]
    NoSeries { model_id: String, namespace: String },
    #[error("series for (modelID={model_id}, namespace={namespace}) is missing required labels")]
    LabelMismatch { model_id: String, namespace: String },
    #[error("query deadline exceeded for (modelID={model_id}, namespace={namespace})")]
    DeadlineExceeded { model_id: String, namespace: String },
}

/// Query contract against the metrics backend, identified by the
/// `(modelID, namespace)` label tuple per spec.md §4.2 — mapping a
/// variant to its series by that tuple, and detecting a mismatch, is
/// this trait's whole job.
#[async_trait]
pub trait MetricsBackend: Send + Sync {
    async fn query(
        &self,
        model_id: &str,
        namespace: &str,
        retention_window: Duration,
    ) -> Result<Metrics, CollectError>;
}

/// A fixed-table backend for tests and local runs: looks up
/// `(model_id, namespace)` in a map, returning
/// [`CollectError::NoSeries`] for anything absent.
#[derive(Default)]
pub struct StaticMetricsBackend {
    table: DashMap<(String, String), Metrics>,
}

impl StaticMetricsBackend {
    pub fn new() -> Self {
        StaticMetricsBackend::default()
    }

    pub fn set(&self, model_id: &str, namespace: &str, metrics: Metrics) {
        self.table
            .insert((model_id.to_string(), namespace.to_string()), metrics);
    }

    pub fn from_table(table: HashMap<(String, String), Metrics>) -> Self {
        let backend = StaticMetricsBackend::new();
        for (key, value) in table {
            backend.table.insert(key, value);
        }
        backend
    }
}

#[async_trait]
impl MetricsBackend for StaticMetricsBackend {
    async fn query(
        &self,
        model_id: &str,
        namespace: &str,
        _retention_window: Duration,
    ) -> Result<Metrics, CollectError> {
        self.table
            .get(&(model_id.to_string(), namespace.to_string()))
            .map(|entry| *entry.value())
            .ok_or_else(|| CollectError::NoSeries {
                model_id: model_id.to_string(),
                namespace: namespace.to_string(),
            })
    }
}
