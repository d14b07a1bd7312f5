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

use crate::backend::{CollectError, Metrics, MetricsBackend};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wva_types::VariantId;

#[derive(Clone)]
struct CacheSlot {
    value: Result<Metrics, CollectError>,
    fetched_at: Instant,
}

/// Metrics Collector (C2). Caches one slot per variant keyed by
/// `(variant UID, "metrics")` — collapsed here to a per-variant slot
/// since all four signals from spec.md §4.2 are queried together — with
/// a TTL of roughly half the reconcile interval. The dispatcher only
/// ever calls [`MetricsCollector::collect_for_variant`], which reads
/// the cache; a separate task drives [`MetricsCollector::refresh_all`].
pub struct MetricsCollector {
    backend: Arc<dyn MetricsBackend>,
    cache: Arc<DashMap<VariantId, CacheSlot>>,
    ttl: Duration,
}

impl MetricsCollector {
    pub fn new(backend: Arc<dyn MetricsBackend>, ttl: Duration) -> Self {
        MetricsCollector {
            backend,
            cache: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Queries the backend for one variant and writes the result (ok
    /// or error) into its cache slot. A query failure poisons only
    /// this entry, per spec.md §4.2 — it does not touch any other
    /// variant's cached value.
    pub async fn refresh_one(
        &self,
        variant_id: &VariantId,
        model_id: &str,
        namespace: &str,
        retention_window: Duration,
    ) {
        let result = self.backend.query(model_id, namespace, retention_window).await;
        if let Err(err) = &result {
            tracing::warn!(variant = %variant_id, error = %err, "metrics query failed, caching unavailable");
        }
        self.cache.insert(
            variant_id.clone(),
            CacheSlot {
                value: result,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Refreshes every active variant concurrently. Intended to run on
    /// a background interval distinct from the reconcile tick itself,
    /// per spec.md §4.2's "background refresh task may prefetch
    /// metrics for all active variants between ticks".
    pub async fn refresh_all(&self, variants: &[(VariantId, String, String, Duration)]) {
        let mut handles = Vec::with_capacity(variants.len());
        for (variant_id, model_id, namespace, retention_window) in variants.iter().cloned() {
            let backend = Arc::clone(&self.backend);
            let cache = self.cache.clone();
            handles.push(tokio::spawn(async move {
                let result = backend.query(&model_id, &namespace, retention_window).await;
                cache.insert(
                    variant_id,
                    CacheSlot {
                        value: result,
                        fetched_at: Instant::now(),
                    },
                );
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Reads the cache only — never queries the backend directly, per
    /// spec.md §4.2's "the loop reads from cache only". A missing or
    /// TTL-expired slot is reported the same as a live `ErrUnavailable`
    /// so the analyzer's fallback rule is the only path either way.
    pub fn collect_for_variant(&self, variant_id: &VariantId) -> Result<Metrics, CollectError> {
        match self.cache.get(variant_id) {
            Some(slot) if slot.fetched_at.elapsed() <= self.ttl => slot.value.clone(),
            _ => Err(CollectError::NoSeries {
                model_id: String::new(),
                namespace: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::StaticMetricsBackend;

    fn sample_metrics() -> Metrics {
        Metrics {
            arrival_rate: 10.0,
            avg_kv_util: 0.5,
            avg_queue_len: 1.0,
            recent_request_increase: 5.0,
        }
    }

    #[tokio::test]
    async fn collect_returns_unavailable_before_any_refresh() {
        let backend = Arc::new(StaticMetricsBackend::new());
        let collector = MetricsCollector::new(backend, Duration::from_secs(30));
        let id = VariantId("llama3-a100-1".to_string());
        assert!(collector.collect_for_variant(&id).is_err());
    }

    #[tokio::test]
    async fn refresh_then_collect_returns_the_cached_value() {
        let backend = Arc::new(StaticMetricsBackend::new());
        backend.set("llama3", "default", sample_metrics());
        let collector = MetricsCollector::new(backend, Duration::from_secs(30));
        let id = VariantId("llama3-a100-1".to_string());
        collector
            .refresh_one(&id, "llama3", "default", Duration::from_secs(600))
            .await;
        assert_eq!(collector.collect_for_variant(&id), Ok(sample_metrics()));
    }

    #[tokio::test]
    async fn expired_ttl_is_reported_as_unavailable() {
        let backend = Arc::new(StaticMetricsBackend::new());
        backend.set("llama3", "default", sample_metrics());
        let collector = MetricsCollector::new(backend, Duration::from_millis(1));
        let id = VariantId("llama3-a100-1".to_string());
        collector
            .refresh_one(&id, "llama3", "default", Duration::from_secs(600))
            .await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(collector.collect_for_variant(&id).is_err());
    }

    #[tokio::test]
    async fn one_variant_failing_does_not_poison_another() {
        let backend = Arc::new(StaticMetricsBackend::new());
        backend.set("llama3", "default", sample_metrics());
        let collector = MetricsCollector::new(backend, Duration::from_secs(30));
        let ok_id = VariantId("llama3-a100-1".to_string());
        let missing_id = VariantId("mistral-a100-1".to_string());
        collector
            .refresh_all(&[
                (
                    ok_id.clone(),
                    "llama3".to_string(),
                    "default".to_string(),
                    Duration::from_secs(600),
                ),
                (
                    missing_id.clone(),
                    "mistral".to_string(),
                    "default".to_string(),
                    Duration::from_secs(600),
                ),
            ])
            .await;
        assert!(collector.collect_for_variant(&ok_id).is_ok());
        assert!(collector.collect_for_variant(&missing_id).is_err());
    }
}
