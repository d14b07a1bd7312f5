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

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use wva_types::scaling::PartialScalingEntry;
use wva_types::ScalingEntry;

const MIN_INTERVAL: Duration = Duration::from_secs(10);
const MAX_INTERVAL: Duration = Duration::from_secs(600);
const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Default)]
struct Snapshot {
    interval: Option<Duration>,
    default_entry: Option<PartialScalingEntry>,
    /// model_id -> every parsed entry naming that model (one generic,
    /// at most one per distinct namespace).
    per_model: HashMap<String, Vec<PartialScalingEntry>>,
}

/// Process-wide scaling configuration cache (C1 from spec.md §4.1).
///
/// Readers (`get_interval`, `get_entry_for`) never block a concurrent
/// writer (`update_interval`, `update_entries`) for longer than an
/// `Arc` clone: the snapshot is swapped atomically under the lock so a
/// reader observes either the whole pre- or whole post-update state,
/// matching `master-service`'s `tokio::sync::RwLock` single-writer
/// idiom ported here to a synchronous `std::sync::RwLock` since the
/// cache itself performs no I/O.
pub struct ConfigCache {
    snapshot: RwLock<Arc<Snapshot>>,
}

impl Default for ConfigCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigCache {
    pub fn new() -> Self {
        ConfigCache {
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
        }
    }

    /// Returns the current reconcile interval, clamped to
    /// `[10s, 10min]` as required by spec.md §6, defaulting to 60s
    /// when no value has ever been set.
    pub fn get_interval(&self) -> Duration {
        let snapshot = self.snapshot.read().unwrap();
        snapshot
            .interval
            .map(clamp_interval)
            .unwrap_or(DEFAULT_INTERVAL)
    }

    pub fn update_interval(&self, interval: Duration) {
        let clamped = clamp_interval(interval);
        let mut guard = self.snapshot.write().unwrap();
        let mut next = (**guard).clone();
        next.interval = Some(clamped);
        *guard = Arc::new(next);
    }

    /// Replaces the whole set of parsed scaling entries atomically.
    /// Invalid entries must already have been dropped by the caller
    /// (see [`crate::parse::parse_scaling_configmap`]) — remaining
    /// valid ones take effect immediately for every subsequent read.
    pub fn update_entries(&self, entries: Vec<PartialScalingEntry>) {
        let mut default_entry = None;
        let mut per_model: HashMap<String, Vec<PartialScalingEntry>> = HashMap::new();
        for entry in entries {
            match &entry.model_id {
                None => default_entry = Some(entry),
                Some(model_id) => per_model.entry(model_id.clone()).or_default().push(entry),
            }
        }
        let mut guard = self.snapshot.write().unwrap();
        let mut next = (**guard).clone();
        next.default_entry = default_entry;
        next.per_model = per_model;
        *guard = Arc::new(next);
    }

    /// Composes fallback -> default -> per-model -> per-model-namespace,
    /// per spec.md §4.1's precedence rule ("a missing field at a level
    /// inherits from the level below").
    pub fn get_entry_for(&self, model_id: &str, namespace: &str) -> ScalingEntry {
        let snapshot = self.snapshot.read().unwrap();
        let mut composed = ScalingEntry::fallback();
        if let Some(default_entry) = &snapshot.default_entry {
            composed = composed.overlay(default_entry.clone());
        }
        if let Some(candidates) = snapshot.per_model.get(model_id) {
            if let Some(generic) = candidates.iter().find(|e| e.namespace.is_none()) {
                composed = composed.overlay(generic.clone());
            }
            if let Some(scoped) = candidates
                .iter()
                .find(|e| e.namespace.as_deref() == Some(namespace))
            {
                composed = composed.overlay(scoped.clone());
            }
        }
        composed
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_INTERVAL, MAX_INTERVAL)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(model_id: Option<&str>, namespace: Option<&str>, kv: f64) -> PartialScalingEntry {
        PartialScalingEntry {
            kv_cache_threshold: Some(kv),
            model_id: model_id.map(String::from),
            namespace: namespace.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn empty_cache_returns_hardcoded_fallback() {
        let cache = ConfigCache::new();
        let resolved = cache.get_entry_for("llama3", "default");
        assert_eq!(resolved, ScalingEntry::fallback());
        assert_eq!(cache.get_interval(), DEFAULT_INTERVAL);
    }

    #[test]
    fn per_model_namespace_wins_over_generic_per_model_and_default() {
        let cache = ConfigCache::new();
        cache.update_entries(vec![
            entry(None, None, 0.5),
            entry(Some("llama3"), None, 0.6),
            entry(Some("llama3"), Some("team-a"), 0.9),
        ]);

        assert_eq!(cache.get_entry_for("llama3", "team-a").kv_cache_threshold, 0.9);
        assert_eq!(cache.get_entry_for("llama3", "team-b").kv_cache_threshold, 0.6);
        assert_eq!(cache.get_entry_for("mistral", "team-b").kv_cache_threshold, 0.5);
    }

    #[test]
    fn interval_is_clamped_to_spec_bounds() {
        let cache = ConfigCache::new();
        cache.update_interval(Duration::from_secs(1));
        assert_eq!(cache.get_interval(), MIN_INTERVAL);
        cache.update_interval(Duration::from_secs(3600));
        assert_eq!(cache.get_interval(), MAX_INTERVAL);
    }

    #[test]
    fn reader_never_sees_a_torn_update() {
        let cache = Arc::new(ConfigCache::new());
        cache.update_entries(vec![entry(Some("llama3"), None, 0.7)]);
        let before = cache.get_entry_for("llama3", "default");
        cache.update_entries(vec![entry(Some("llama3"), None, 0.2)]);
        let after = cache.get_entry_for("llama3", "default");
        assert_eq!(before.kv_cache_threshold, 0.7);
        assert_eq!(after.kv_cache_threshold, 0.2);
    }
}
