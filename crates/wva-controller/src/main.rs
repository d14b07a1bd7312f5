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

use clap::Parser;
use std::process;
use std::sync::Arc;
use tokio::signal;
use wva_applier::{Applier, InMemoryStatusStore, PrometheusMetricsSink};
use wva_config::{ConfigCache, StaticConfigSource};
use wva_controller::{
    build_http_app_state, health, ControllerConfig, Dispatcher, StaticVariantSource, TickCoalescer,
};
use wva_inventory::StaticInventorySource;
use wva_metrics::{MetricsCollector, StaticMetricsBackend};

/// Workload variant autoscaler: watches saturation signals for a set
/// of LLM inference replica groups and publishes a desired replica
/// count for each, bounded by accelerator inventory.
#[derive(Parser, Debug)]
#[command(name = "wva-controller")]
#[command(version)]
struct Args {
    /// Overrides WVA_HTTP_BIND_ADDR for the health/metrics listener.
    #[arg(long)]
    http_bind_addr: Option<String>,

    /// Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,
}

fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(level))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let mut config = match ControllerConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            process::exit(1);
        }
    };
    if let Some(addr) = args.http_bind_addr {
        config.http_bind_addr = addr.parse()?;
    }
    if let Some(level) = args.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);
    tracing::info!(?config, "starting workload variant autoscaler");

    let config_cache = Arc::new(ConfigCache::new());
    let config_source = Arc::new(StaticConfigSource::new(Vec::new()));

    let registry = prometheus::Registry::new();
    let metrics_sink = Arc::new(PrometheusMetricsSink::new(&registry)?);
    let http_state = build_http_app_state(registry);

    // The cluster-facing collaborators named out of scope in spec.md §1
    // (the variant CRD store, the accelerator inventory API, the
    // time-series backend) have no in-tree implementation here; these
    // in-memory/static doubles are the seam a real cluster client would
    // plug into without the dispatcher itself changing. See DESIGN.md.
    let variant_source = Arc::new(StaticVariantSource::new(Vec::new()));
    let inventory_source = Arc::new(StaticInventorySource::new(Vec::new()));
    let metrics_backend = Arc::new(StaticMetricsBackend::new());
    let status_store = Arc::new(InMemoryStatusStore::new());

    let metrics_ttl = wva_controller::config::metrics_ttl_for(config_cache.get_interval());
    let metrics_collector = Arc::new(MetricsCollector::new(metrics_backend, metrics_ttl));

    let applier = Arc::new(Applier::new(
        status_store.clone(),
        metrics_sink,
        config.controller_instance.clone(),
    ));

    let dispatcher = Arc::new(Dispatcher::new(
        config_cache.clone(),
        metrics_collector,
        inventory_source,
        variant_source,
        status_store,
        applier,
        config.worker_pool_size,
        config.controller_instance.clone(),
    ));

    let coalescer = Arc::new(TickCoalescer::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let ticker_coalescer = coalescer.clone();
    let ticker_config_cache = config_cache.clone();
    let mut ticker_shutdown = shutdown_rx.clone();
    let ticker_handle = tokio::spawn(async move {
        loop {
            let interval = ticker_config_cache.get_interval();
            tokio::select! {
                _ = tokio::time::sleep(interval) => ticker_coalescer.request(),
                _ = ticker_shutdown.changed() => {
                    if *ticker_shutdown.borrow() {
                        return;
                    }
                }
            }
        }
    });

    let metrics_refresh_handle = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let metrics_shutdown = shutdown_rx.clone();
        async move {
            dispatcher.run_metrics_refresh(metrics_shutdown).await;
        }
    });

    let config_watch_handle = tokio::spawn({
        let config_cache = config_cache.clone();
        let config_shutdown = shutdown_rx.clone();
        async move {
            wva_config::drive(config_source, config_cache, config_shutdown).await;
        }
    });

    let dispatcher_handle = tokio::spawn({
        let dispatcher = dispatcher.clone();
        let coalescer = coalescer.clone();
        let http_state = http_state.clone();
        async move {
            dispatcher.run(coalescer, http_state, shutdown_rx).await;
        }
    });

    let http_server = health::serve(config.http_bind_addr, http_state)?;
    let http_handle = tokio::spawn(http_server);

    handle_shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping");
    let _ = shutdown_tx.send(true);
    coalescer.request();

    let _ = dispatcher_handle.await;
    let _ = ticker_handle.await;
    let _ = metrics_refresh_handle.await;
    let _ = config_watch_handle.await;
    http_handle.abort();

    tracing::info!("workload variant autoscaler stopped");
    Ok(())
}

async fn handle_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
