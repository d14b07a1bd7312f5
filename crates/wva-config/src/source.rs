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

//! External-collaborator seam for "wherever the configmaps actually
//! live" (spec.md §1 names the cluster API as out of scope; only its
//! interface matters here).

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub enum ConfigEvent {
    ScalingConfigChanged(BTreeMap<String, String>),
    IntervalConfigChanged(String),
}

/// A watchable source of the two configmaps described in spec.md §6.
/// The dispatcher never talks to this directly — it only drives
/// `ConfigCache` updates from the events this emits.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn watch(&self, sender: mpsc::Sender<ConfigEvent>);
}

/// A fixed, one-shot source used in tests and local runs: emits its
/// configured events once and then idles forever.
pub struct StaticConfigSource {
    events: Vec<ConfigEvent>,
}

impl StaticConfigSource {
    pub fn new(events: Vec<ConfigEvent>) -> Self {
        StaticConfigSource { events }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn watch(&self, sender: mpsc::Sender<ConfigEvent>) {
        for event in &self.events {
            if sender.send(event.clone()).await.is_err() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_replays_its_events() {
        let mut map = BTreeMap::new();
        map.insert("default".to_string(), "kvCacheThreshold: 0.5\n".to_string());
        let source = StaticConfigSource::new(vec![ConfigEvent::ScalingConfigChanged(map)]);
        let (tx, mut rx) = mpsc::channel(4);
        tokio::spawn(async move { source.watch(tx).await });
        let event = rx.recv().await.unwrap();
        matches!(event, ConfigEvent::ScalingConfigChanged(_));
    }
}
