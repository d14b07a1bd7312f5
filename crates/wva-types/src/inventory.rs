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

//! Per-tick accelerator inventory snapshot.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcceleratorInventory {
    pub total: u64,
    /// Accelerators already consumed by workloads the autoscaler does
    /// not control (spec.md §3: `consumed_by_other_workloads`).
    pub consumed_by_other_workloads: u64,
}

impl AcceleratorInventory {
    /// `total` minus everything already consumed (active variants of
    /// this type, summed by the inventory scanner), clamped at zero
    /// per spec.md §4.3.
    pub fn available(&self) -> u64 {
        self.total.saturating_sub(self.consumed_by_other_workloads)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    pub by_type: HashMap<String, AcceleratorInventory>,
}

impl InventorySnapshot {
    pub fn get(&self, accelerator: &str) -> Option<AcceleratorInventory> {
        self.by_type.get(accelerator).copied()
    }
}
