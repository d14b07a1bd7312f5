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

//! Pure, side-effect-free summarization (spec.md §4.3), independently
//! testable from whatever actually lists the nodes.

use crate::source::NodeAcceleratorReport;
use std::collections::HashMap;
use wva_types::inventory::{AcceleratorInventory, InventorySnapshot};

/// One active variant's accelerator footprint, as seen by the scanner.
pub struct VariantFootprint<'a> {
    pub accelerator: &'a str,
    pub current_replicas: i64,
    pub accelerator_count: u32,
}

/// Builds the per-tick `map[acceleratorType] -> {total, available}`
/// snapshot: sum every node's allocatable count per type, then
/// subtract `currentReplicas * acceleratorCount` over every active
/// variant already using that type, clamped to zero. Read-only for the
/// rest of the tick once returned.
pub fn summarize(
    nodes: &[NodeAcceleratorReport],
    active_variants: &[VariantFootprint<'_>],
) -> InventorySnapshot {
    let mut totals: HashMap<String, u64> = HashMap::new();
    for node in nodes {
        *totals.entry(node.accelerator.clone()).or_insert(0) += node.allocatable;
    }

    let mut consumed: HashMap<String, u64> = HashMap::new();
    for footprint in active_variants {
        if footprint.current_replicas <= 0 {
            continue;
        }
        let used = footprint.current_replicas as u64 * footprint.accelerator_count as u64;
        *consumed.entry(footprint.accelerator.to_string()).or_insert(0) += used;
    }

    InventorySnapshot {
        by_type: totals
            .into_iter()
            .map(|(accelerator, total)| {
                let used = consumed.get(&accelerator).copied().unwrap_or(0);
                (
                    accelerator,
                    AcceleratorInventory {
                        total,
                        consumed_by_other_workloads: used,
                    },
                )
            })
            .collect(),
    }
}
