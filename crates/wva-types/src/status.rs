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

//! The per-variant published status, owned exclusively by the loop.

use crate::decision::ReasonCode;
use crate::variant::VariantId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantStatus {
    pub variant_id: VariantId,
    pub current_replicas: i64,
    pub target: i64,
    /// The instant this tick ran, updated every tick regardless of
    /// whether the target changed.
    pub last_run_time: DateTime<Utc>,
    /// The instant the target last *changed*, per spec.md §3 distinct
    /// from `last_run_time`.
    pub last_change_time: DateTime<Utc>,
    pub last_change_delta: i64,
    pub reason: ReasonCode,
    /// Optimistic-concurrency version, incremented on every successful
    /// write; used by `wva-applier`'s compare-and-swap publish.
    pub version: u64,
}

impl VariantStatus {
    pub fn initial(variant_id: VariantId, target: i64, reason: ReasonCode, now: DateTime<Utc>) -> Self {
        VariantStatus {
            variant_id,
            current_replicas: target,
            target,
            last_run_time: now,
            last_change_time: now,
            last_change_delta: target,
            reason,
            version: 0,
        }
    }
}
