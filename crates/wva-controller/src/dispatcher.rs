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

//! The loop itself (C7, spec.md §4.7): joins C1-C6 on every tick.

use crate::coalesce::TickCoalescer;
use crate::config::metrics_ttl_for;
use crate::health::HttpState;
use crate::variant_source::VariantSource;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use wva_analyzer::decide;
use wva_applier::{ApplyInput, Applier, StatusStore};
use wva_config::ConfigCache;
use wva_inventory::{summarize, InventorySource, NodeAcceleratorReport, VariantFootprint};
use wva_limiter::{limit, LimiterInput};
use wva_metrics::MetricsCollector;
use wva_types::{Saturation, Variant, VariantRuntimeRecord};

pub struct Dispatcher {
    config_cache: Arc<ConfigCache>,
    metrics_collector: Arc<MetricsCollector>,
    inventory_source: Arc<dyn InventorySource>,
    variant_source: Arc<dyn VariantSource>,
    status_store: Arc<dyn StatusStore>,
    applier: Arc<Applier>,
    worker_pool_size: usize,
    controller_instance: String,
    tick_count: AtomicU64,
}

impl Dispatcher {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config_cache: Arc<ConfigCache>,
        metrics_collector: Arc<MetricsCollector>,
        inventory_source: Arc<dyn InventorySource>,
        variant_source: Arc<dyn VariantSource>,
        status_store: Arc<dyn StatusStore>,
        applier: Arc<Applier>,
        worker_pool_size: usize,
        controller_instance: String,
    ) -> Self {
        Dispatcher {
            config_cache,
            metrics_collector,
            inventory_source,
            variant_source,
            status_store,
            applier,
            worker_pool_size,
            controller_instance,
            tick_count: AtomicU64::new(0),
        }
    }

    /// Drives the coalesced tick loop until the coalescer is dropped or
    /// the process is asked to shut down via `shutdown`.
    pub async fn run(&self, coalescer: Arc<TickCoalescer>, http_state: Arc<HttpState>, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = coalescer.wait() => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("dispatcher stopping");
                        return;
                    }
                    continue;
                }
            }

            let interval = self.config_cache.get_interval();
            match tokio::time::timeout(interval, self.run_tick()).await {
                Ok(Ok(processed)) => {
                    http_state.mark_ready();
                    tracing::info!(processed, tick = self.tick_count.fetch_add(1, Ordering::Relaxed), "tick completed");
                }
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "tick failed to list inventory or variants, skipping");
                }
                Err(_) => {
                    tracing::warn!(deadline_secs = interval.as_secs(), "tick deadline exceeded, publishing nothing for the remainder");
                }
            }
        }
    }

    /// Runs one full tick: list, scan, decide, limit, apply. Returns
    /// the number of variants processed. Per spec.md §4.7, a failure on
    /// one variant never aborts its siblings — only a failure to list
    /// variants or inventory at all aborts the whole tick.
    pub async fn run_tick(&self) -> anyhow::Result<usize> {
        let all_variants = self.variant_source.list().await.map_err(anyhow::Error::from)?;
        let variants: Vec<Variant> = all_variants
            .into_iter()
            .filter(|v| !v.deleted)
            .filter(|v| self.belongs_to_this_instance(v))
            .collect();

        let nodes: Vec<NodeAcceleratorReport> = self.inventory_source.list_nodes().await.map_err(anyhow::Error::from)?;
        let mut current_replicas = std::collections::HashMap::with_capacity(variants.len());
        for variant in &variants {
            let replicas = match self.status_store.get(&variant.id).await {
                Some(status) => status.target,
                None => std::cmp::max(1, variant.min_replicas.unwrap_or(0)),
            };
            current_replicas.insert(variant.id.clone(), replicas);
        }

        let footprints: Vec<VariantFootprint<'_>> = variants
            .iter()
            .map(|v| VariantFootprint {
                accelerator: v.accelerator.as_str(),
                current_replicas: current_replicas[&v.id],
                accelerator_count: v.accelerator_count,
            })
            .collect();
        let inventory = summarize(&nodes, &footprints);

        let semaphore = Arc::new(Semaphore::new(self.worker_pool_size.max(1)));
        let mut handles = Vec::with_capacity(variants.len());
        for variant in variants.iter().cloned() {
            let semaphore = semaphore.clone();
            let collector = self.metrics_collector.clone();
            let config_cache = self.config_cache.clone();
            let replicas = current_replicas[&variant.id];
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                decide_one(variant, replicas, &collector, &config_cache)
            }));
        }

        let mut limiter_inputs = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok((decision, enable_limiter)) = handle.await {
                limiter_inputs.push(LimiterInput { decision, enable_limiter });
            }
        }

        let decisions = limit(limiter_inputs, &inventory);
        let by_id: std::collections::HashMap<_, _> = variants.iter().map(|v| (v.id.clone(), v)).collect();

        let processed = decisions.len();
        for decision in decisions {
            let Some(variant) = by_id.get(&decision.variant_id) else {
                continue;
            };
            let entry = self.config_cache.get_entry_for(&variant.model_id, &variant.namespace);
            let input = ApplyInput {
                namespace: variant.namespace.clone(),
                model_id: variant.model_id.clone(),
                min_replicas: variant.min_replicas,
                max_replicas: variant.max_replicas,
                enable_scale_to_zero: entry.enable_scale_to_zero,
                now: Utc::now(),
            };
            if let Err(err) = self.applier.apply(decision, input).await {
                tracing::warn!(error = %err, "apply failed for this variant, continuing with siblings");
            }
        }

        Ok(processed)
    }

    fn belongs_to_this_instance(&self, variant: &Variant) -> bool {
        match variant.controller_instance_label.as_deref() {
            Some(label) => label == self.controller_instance,
            None => true,
        }
    }

    /// Background refresh task (C2, spec.md §4.2): prefetches metrics
    /// for every active variant between ticks so `run_tick`'s
    /// `collect_for_variant` calls are always reading a warm cache
    /// instead of driving the backend query inline. Runs on its own
    /// cadence, distinct from the reconcile tick itself.
    pub async fn run_metrics_refresh(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        loop {
            let period = metrics_ttl_for(self.config_cache.get_interval());
            tokio::select! {
                _ = tokio::time::sleep(period) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        tracing::info!("metrics refresh loop stopping");
                        return;
                    }
                    continue;
                }
            }

            let variants = match self.variant_source.list().await {
                Ok(variants) => variants,
                Err(err) => {
                    tracing::warn!(error = %err, "metrics refresh failed to list variants, skipping this cycle");
                    continue;
                }
            };

            let targets: Vec<_> = variants
                .iter()
                .filter(|v| !v.deleted)
                .filter(|v| self.belongs_to_this_instance(v))
                .map(|v| {
                    let entry = self.config_cache.get_entry_for(&v.model_id, &v.namespace);
                    (v.id.clone(), v.model_id.clone(), v.namespace.clone(), entry.scale_to_zero_retention)
                })
                .collect();

            self.metrics_collector.refresh_all(&targets).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use wva_applier::{InMemoryStatusStore, RecordingMetricsSink};
    use wva_inventory::StaticInventorySource;
    use wva_metrics::{Metrics, StaticMetricsBackend};
    use wva_types::{ScaleTargetRef, VariantId};

    fn base_variant(id: &str, model_id: &str, accelerator_count: u32, min_replicas: Option<i64>) -> Variant {
        Variant {
            id: VariantId(id.to_string()),
            namespace: "default".to_string(),
            model_id: model_id.to_string(),
            accelerator: "A100".to_string(),
            accelerator_count,
            scale_target_ref: ScaleTargetRef {
                kind: "InferenceService".to_string(),
                name: model_id.to_string(),
            },
            min_replicas,
            max_replicas: None,
            variant_cost: "10".to_string(),
            slo_class_ref: None,
            priority: 0,
            deleted: false,
            controller_instance_label: None,
        }
    }

    struct Fixture {
        dispatcher: Dispatcher,
        status_store: Arc<InMemoryStatusStore>,
        metrics_sink: Arc<RecordingMetricsSink>,
    }

    async fn fixture(
        variants: Vec<Variant>,
        metrics: HashMap<(String, String), Metrics>,
        nodes: Vec<NodeAcceleratorReport>,
    ) -> Fixture {
        let config_cache = Arc::new(ConfigCache::new());
        let backend = Arc::new(StaticMetricsBackend::from_table(metrics));
        let metrics_collector = Arc::new(MetricsCollector::new(backend.clone(), Duration::from_secs(30)));
        let inventory_source = Arc::new(StaticInventorySource::new(nodes));
        let variant_source = Arc::new(crate::variant_source::StaticVariantSource::new(variants.clone()));
        let status_store = Arc::new(InMemoryStatusStore::new());
        let metrics_sink = Arc::new(RecordingMetricsSink::new());
        let applier = Arc::new(Applier::new(status_store.clone(), metrics_sink.clone(), "wva-0".to_string()));

        for variant in &variants {
            metrics_collector
                .refresh_one(&variant.id, &variant.model_id, &variant.namespace, Duration::from_secs(600))
                .await;
        }

        let dispatcher = Dispatcher::new(
            config_cache,
            metrics_collector,
            inventory_source,
            variant_source,
            status_store.clone(),
            applier,
            8,
            "wva-0".to_string(),
        );

        Fixture {
            dispatcher,
            status_store,
            metrics_sink,
        }
    }

    fn node(accelerator: &str, allocatable: u64) -> NodeAcceleratorReport {
        NodeAcceleratorReport {
            accelerator: accelerator.to_string(),
            allocatable,
        }
    }

    /// S1: one variant, N=1, kvUtil=0.95, queueLen=7, thresholds
    /// (0.8, 5) -> target 2.
    #[tokio::test]
    async fn s1_end_to_end_scale_up() {
        let variant = base_variant("llama3-a100-1", "llama3", 1, None);
        let mut metrics = HashMap::new();
        metrics.insert(
            ("llama3".to_string(), "default".to_string()),
            Metrics {
                arrival_rate: 10.0,
                avg_kv_util: 0.95,
                avg_queue_len: 7.0,
                recent_request_increase: 1.0,
            },
        );
        let fixture = fixture(vec![variant], metrics, vec![node("A100", 8)]).await;
        fixture.dispatcher.run_tick().await.unwrap();
        let status = fixture
            .status_store
            .get(&VariantId("llama3-a100-1".to_string()))
            .await
            .unwrap();
        assert_eq!(status.target, 2);
        assert_eq!(
            fixture.metrics_sink.get("llama3-a100-1", "default", "llama3", "wva-0"),
            Some(2.0)
        );
    }

    /// S3: no traffic in retention window, scale-to-zero enabled ->
    /// target 0.
    #[tokio::test]
    async fn s3_end_to_end_scale_to_zero() {
        let variant = base_variant("llama3-a100-1", "llama3", 1, Some(0));
        let mut metrics = HashMap::new();
        metrics.insert(
            ("llama3".to_string(), "default".to_string()),
            Metrics {
                arrival_rate: 0.0,
                avg_kv_util: 0.0,
                avg_queue_len: 0.0,
                recent_request_increase: 0.0,
            },
        );
        let fixture = fixture(vec![variant], metrics, vec![node("A100", 8)]).await;
        fixture.dispatcher.config_cache.update_entries(vec![wva_types::scaling::PartialScalingEntry {
            enable_scale_to_zero: Some(true),
            ..Default::default()
        }]);
        fixture.dispatcher.run_tick().await.unwrap();
        let status = fixture
            .status_store
            .get(&VariantId("llama3-a100-1".to_string()))
            .await
            .unwrap();
        assert_eq!(status.target, 0);
    }

    /// S4: two variants contend for a type whose inventory cannot
    /// satisfy both; the higher-pressure variant wins.
    #[tokio::test]
    async fn s4_end_to_end_contention() {
        let alpha = base_variant("alpha-a100-1", "alpha", 2, None);
        let beta = base_variant("beta-a100-1", "beta", 2, None);
        let mut metrics = HashMap::new();
        metrics.insert(
            ("alpha".to_string(), "default".to_string()),
            Metrics {
                arrival_rate: 10.0,
                avg_kv_util: 0.95,
                avg_queue_len: 7.0,
                recent_request_increase: 1.0,
            },
        );
        metrics.insert(
            ("beta".to_string(), "default".to_string()),
            Metrics {
                arrival_rate: 10.0,
                avg_kv_util: 0.85,
                avg_queue_len: 6.0,
                recent_request_increase: 1.0,
            },
        );
        let fixture = fixture(vec![alpha, beta], metrics, vec![node("A100", 4)]).await;
        fixture.dispatcher.config_cache.update_entries(vec![wva_types::scaling::PartialScalingEntry {
            enable_limiter: Some(true),
            ..Default::default()
        }]);
        fixture.dispatcher.run_tick().await.unwrap();
        let alpha_status = fixture
            .status_store
            .get(&VariantId("alpha-a100-1".to_string()))
            .await
            .unwrap();
        let beta_status = fixture
            .status_store
            .get(&VariantId("beta-a100-1".to_string()))
            .await
            .unwrap();
        let total_units = alpha_status.target * 2 + beta_status.target * 2;
        assert!(total_units <= 4);
    }

    /// P8: any number of coalesced requests produce exactly one tick's
    /// worth of work when drained once.
    #[tokio::test]
    async fn p8_trigger_coalescing_collapses_to_one_tick() {
        let coalescer = Arc::new(TickCoalescer::new());
        for _ in 0..50 {
            coalescer.request();
        }
        let mut ticks = 0;
        tokio::time::timeout(Duration::from_millis(50), async {
            coalescer.wait().await;
            ticks += 1;
        })
        .await
        .unwrap();
        assert_eq!(ticks, 1);
    }

    /// Multi-instance isolation: a variant tagged for another instance
    /// is skipped entirely.
    #[tokio::test]
    async fn filters_variants_to_the_owning_controller_instance() {
        let mut variant = base_variant("llama3-a100-1", "llama3", 1, None);
        variant.controller_instance_label = Some("other-instance".to_string());
        let fixture = fixture(vec![variant], HashMap::new(), vec![node("A100", 8)]).await;
        let processed = fixture.dispatcher.run_tick().await.unwrap();
        assert_eq!(processed, 0);
    }

    /// C2's background refresh loop populates the cache the control
    /// path only ever reads from — without it, `run_tick` would see
    /// every variant as unavailable on a cold cache.
    #[tokio::test(start_paused = true)]
    async fn metrics_refresh_loop_warms_the_cache_before_any_manual_refresh() {
        let variant = base_variant("llama3-a100-1", "llama3", 1, None);
        let mut metrics = HashMap::new();
        metrics.insert(
            ("llama3".to_string(), "default".to_string()),
            Metrics {
                arrival_rate: 10.0,
                avg_kv_util: 0.95,
                avg_queue_len: 7.0,
                recent_request_increase: 1.0,
            },
        );
        let config_cache = Arc::new(ConfigCache::new());
        let backend = Arc::new(StaticMetricsBackend::from_table(metrics));
        let metrics_collector = Arc::new(MetricsCollector::new(backend, Duration::from_millis(10)));
        let variant_source = Arc::new(crate::variant_source::StaticVariantSource::new(vec![variant.clone()]));
        let inventory_source = Arc::new(StaticInventorySource::new(vec![node("A100", 8)]));
        let status_store = Arc::new(InMemoryStatusStore::new());
        let metrics_sink = Arc::new(RecordingMetricsSink::new());
        let applier = Arc::new(Applier::new(status_store.clone(), metrics_sink, "wva-0".to_string()));
        let dispatcher = Arc::new(Dispatcher::new(
            config_cache,
            metrics_collector.clone(),
            inventory_source,
            variant_source,
            status_store,
            applier,
            8,
            "wva-0".to_string(),
        ));

        assert!(metrics_collector.collect_for_variant(&variant.id).is_err());

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let refresh_dispatcher = dispatcher.clone();
        let handle = tokio::spawn(async move { refresh_dispatcher.run_metrics_refresh(shutdown_rx).await });

        // Default reconcile interval is 60s, so the refresh period
        // (half of it) is 30s; advance paused time past it, then give
        // the spawned refresh task's await chain room to run.
        tokio::time::advance(Duration::from_secs(31)).await;
        let mut refreshed = false;
        for _ in 0..100 {
            if metrics_collector.collect_for_variant(&variant.id).is_ok() {
                refreshed = true;
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(refreshed, "background refresh never populated the cache");

        let _ = shutdown_tx.send(true);
        handle.await.unwrap();
    }
}

/// C2 + C4 for a single variant: collect, join, decide. Returns the
/// decision plus whether this variant's entry opted the limiter in, so
/// the caller can route it into the right arbitration pool.
fn decide_one(
    variant: Variant,
    current_replicas: i64,
    collector: &MetricsCollector,
    config_cache: &ConfigCache,
) -> (wva_types::Decision, bool) {
    let entry = config_cache.get_entry_for(&variant.model_id, &variant.namespace);
    let metrics = collector.collect_for_variant(&variant.id);

    let record = VariantRuntimeRecord {
        variant_id: variant.id.clone(),
        current_replicas,
        saturation: metrics.as_ref().ok().map(|m| Saturation {
            avg_kv_util: m.avg_kv_util,
            avg_queue_len: m.avg_queue_len,
        }),
        arrival_rate: metrics.as_ref().map(|m| m.arrival_rate).unwrap_or(0.0),
        recent_request_increase: metrics.as_ref().ok().map(|m| m.recent_request_increase),
        cost: variant.variant_cost_value(),
        priority: variant.priority,
        accelerator: variant.accelerator.clone(),
        accelerator_count: variant.accelerator_count,
        min_replicas: variant.min_replicas,
        max_replicas: variant.max_replicas,
        retention_window: entry.scale_to_zero_retention,
    };

    let mut decision = decide(&record, &entry);
    decision.accelerator = variant.accelerator.clone();
    decision.accelerator_count = variant.accelerator_count;
    (decision, entry.enable_limiter)
}

