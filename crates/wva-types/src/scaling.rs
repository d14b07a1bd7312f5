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

//! Per-model scaling configuration, composed from a layered default.

use crate::error::{Result, WvaError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A fully-resolved scaling entry: every field present, already layered
/// through the fallback -> default -> per-model -> per-model-namespace
/// precedence chain described in spec.md §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingEntry {
    pub kv_cache_threshold: f64,
    pub queue_length_threshold: i64,
    pub kv_spare_trigger: f64,
    pub queue_spare_trigger: i64,
    pub enable_scale_to_zero: bool,
    pub scale_to_zero_retention: Duration,
    pub enable_limiter: bool,
}

impl ScalingEntry {
    /// Hard-coded fallback from spec.md §3: used when no configmap
    /// entry exists at all, and as the base every other layer overlays.
    pub const fn fallback() -> Self {
        ScalingEntry {
            kv_cache_threshold: 0.80,
            queue_length_threshold: 5,
            kv_spare_trigger: 0.10,
            queue_spare_trigger: 3,
            enable_scale_to_zero: false,
            scale_to_zero_retention: Duration::from_secs(600),
            enable_limiter: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.kv_cache_threshold > 0.0 && self.kv_cache_threshold <= 1.0) {
            return Err(WvaError::InvalidKvCacheThreshold(self.kv_cache_threshold));
        }
        if self.queue_length_threshold < 1 {
            return Err(WvaError::InvalidQueueLengthThreshold(
                self.queue_length_threshold,
            ));
        }
        if !(self.kv_spare_trigger < self.kv_cache_threshold) {
            return Err(WvaError::KvSpareNotBelowThreshold {
                spare: self.kv_spare_trigger,
                threshold: self.kv_cache_threshold,
            });
        }
        if !(self.queue_spare_trigger < self.queue_length_threshold) {
            return Err(WvaError::QueueSpareNotBelowThreshold {
                spare: self.queue_spare_trigger,
                threshold: self.queue_length_threshold,
            });
        }
        Ok(())
    }

    /// Overlays `other`'s present fields onto `self`, used to compose
    /// the fallback -> default -> per-model -> per-model-namespace
    /// chain one layer at a time. `other` wins on any field it sets.
    pub fn overlay(self, other: PartialScalingEntry) -> Self {
        ScalingEntry {
            kv_cache_threshold: other.kv_cache_threshold.unwrap_or(self.kv_cache_threshold),
            queue_length_threshold: other
                .queue_length_threshold
                .unwrap_or(self.queue_length_threshold),
            kv_spare_trigger: other.kv_spare_trigger.unwrap_or(self.kv_spare_trigger),
            queue_spare_trigger: other
                .queue_spare_trigger
                .unwrap_or(self.queue_spare_trigger),
            enable_scale_to_zero: other
                .enable_scale_to_zero
                .unwrap_or(self.enable_scale_to_zero),
            scale_to_zero_retention: other
                .scale_to_zero_retention_secs
                .map(Duration::from_secs)
                .unwrap_or(self.scale_to_zero_retention),
            enable_limiter: other.enable_limiter.unwrap_or(self.enable_limiter),
        }
    }
}

/// A scaling configmap value before layering: every field optional so a
/// missing key inherits from the level below, per spec.md §4.1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialScalingEntry {
    #[serde(default)]
    pub kv_cache_threshold: Option<f64>,
    #[serde(default)]
    pub queue_length_threshold: Option<i64>,
    #[serde(default)]
    pub kv_spare_trigger: Option<f64>,
    #[serde(default)]
    pub queue_spare_trigger: Option<i64>,
    #[serde(default)]
    pub enable_scale_to_zero: Option<bool>,
    #[serde(default, rename = "scaleToZeroRetentionPeriodSecs")]
    pub scale_to_zero_retention_secs: Option<u64>,
    #[serde(default)]
    pub enable_limiter: Option<bool>,
    /// Required on per-model keys, absent on `default`.
    #[serde(default)]
    pub model_id: Option<String>,
    /// Optional narrower scope; absent means "applies to every
    /// namespace of `model_id`".
    #[serde(default)]
    pub namespace: Option<String>,
}
