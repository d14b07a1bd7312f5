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

//! YAML parsing for the scaling configmap and the loop-interval
//! configmap (spec.md §6). Both sources feed [`crate::ConfigCache`].

use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use wva_types::scaling::PartialScalingEntry;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{spare_field} ({spare}) must be < {threshold_field} ({threshold})")]
    SpareNotBelowThreshold {
        spare_field: &'static str,
        spare: f64,
        threshold_field: &'static str,
        threshold: f64,
    },
    #[error("duration string {0:?} is not a supported format (expected e.g. \"60s\", \"5m\", \"1h\")")]
    InvalidDuration(String),
}

/// Parses every value of a scaling configmap (spec.md §6). Entries that
/// fail to parse or that violate an internal invariant (spare trigger
/// below its own threshold, when both are present in the same entry)
/// are dropped and logged once; the rest are returned for
/// [`crate::ConfigCache::update_entries`].
pub fn parse_scaling_configmap(raw: &BTreeMap<String, String>) -> Vec<PartialScalingEntry> {
    let mut valid = Vec::with_capacity(raw.len());
    for (key, value) in raw {
        match parse_one_entry(value) {
            Ok(entry) => valid.push(entry),
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "dropping invalid scaling configmap entry");
            }
        }
    }
    valid
}

fn parse_one_entry(value: &str) -> Result<PartialScalingEntry, ParseError> {
    let entry: PartialScalingEntry = serde_yaml::from_str(value)?;
    if let (Some(spare), Some(threshold)) = (entry.kv_spare_trigger, entry.kv_cache_threshold) {
        if !(spare < threshold) {
            return Err(ParseError::SpareNotBelowThreshold {
                spare_field: "kvSpareTrigger",
                spare,
                threshold_field: "kvCacheThreshold",
                threshold,
            });
        }
    }
    if let (Some(spare), Some(threshold)) =
        (entry.queue_spare_trigger, entry.queue_length_threshold)
    {
        if !(spare < threshold) {
            return Err(ParseError::SpareNotBelowThreshold {
                spare_field: "queueSpareTrigger",
                spare: spare as f64,
                threshold_field: "queueLengthThreshold",
                threshold: threshold as f64,
            });
        }
    }
    Ok(entry)
}

/// Parses the single-key loop-interval configmap value (spec.md §6):
/// a plain integer number of seconds, or a suffixed duration string
/// (`"90s"`, `"5m"`, `"1h"`). Clamping to `[10s, 10min]` happens in
/// [`crate::ConfigCache::update_interval`], not here.
pub fn parse_interval(raw: &str) -> Result<Duration, ParseError> {
    let raw = raw.trim();
    if let Ok(secs) = raw.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    let (digits, unit) = raw.split_at(raw.len().saturating_sub(1));
    let Ok(amount) = digits.parse::<u64>() else {
        return Err(ParseError::InvalidDuration(raw.to_string()));
    };
    let secs = match unit {
        "s" => amount,
        "m" => amount * 60,
        "h" => amount * 3600,
        _ => return Err(ParseError::InvalidDuration(raw.to_string())),
    };
    Ok(Duration::from_secs(secs))
}
