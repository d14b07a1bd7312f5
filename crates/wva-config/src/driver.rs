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

//! Wires a [`ConfigSource`] into [`ConfigCache`] (spec.md §4.1's watch
//! handler): parses each key as YAML, validates invariants, and
//! atomically replaces the cached mapping.

use crate::cache::ConfigCache;
use crate::parse::{parse_interval, parse_scaling_configmap};
use crate::source::{ConfigEvent, ConfigSource};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Runs until `shutdown` is signalled or the source's `watch` future
/// ends. Every event is parsed and folded into `cache` as it arrives;
/// a malformed interval value is logged and dropped, leaving whatever
/// interval the cache already had in effect.
pub async fn drive(source: Arc<dyn ConfigSource>, cache: Arc<ConfigCache>, mut shutdown: watch::Receiver<bool>) {
    let (tx, mut rx) = mpsc::channel(16);
    let watch_handle = tokio::spawn(async move { source.watch(tx).await });

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Some(ConfigEvent::ScalingConfigChanged(raw)) => {
                        cache.update_entries(parse_scaling_configmap(&raw));
                    }
                    Some(ConfigEvent::IntervalConfigChanged(raw)) => {
                        match parse_interval(&raw) {
                            Ok(interval) => cache.update_interval(interval),
                            Err(err) => tracing::warn!(error = %err, "dropping invalid interval configmap value"),
                        }
                    }
                    None => {
                        tracing::warn!("config source watch channel closed, config cache will no longer update");
                        return;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("config watch driver stopping");
                    watch_handle.abort();
                    return;
                }
            }
        }
    }
}
