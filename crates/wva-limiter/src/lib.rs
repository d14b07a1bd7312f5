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

//! Allocation Limiter (C5): greedy-by-pressure cross-variant arbitration
//! over shared accelerator inventory, from spec.md §4.5. Pure and
//! CPU-only — the limiter never blocks and never touches the network.

use std::cmp::Ordering;
use std::collections::HashMap;
use wva_types::{Decision, InventorySnapshot, ReasonCode};

/// One variant's decision plus the single per-entry flag the limiter
/// needs: whether its scaling entry opted into arbitration at all.
/// Variants with `enable_limiter = false` pass through untouched and
/// are excluded from the accelerator-type contention they would
/// otherwise participate in — they are assumed to be accounted for by
/// the inventory scanner's `consumed_by_other_workloads` instead.
pub struct LimiterInput {
    pub decision: Decision,
    pub enable_limiter: bool,
}

/// Arbitrates every variant's decision against the per-tick inventory
/// snapshot, grouped by accelerator type. Never raises a target above
/// what the analyzer produced, and never moves units between types.
pub fn limit(inputs: Vec<LimiterInput>, inventory: &InventorySnapshot) -> Vec<Decision> {
    let mut by_type: HashMap<String, Vec<Decision>> = HashMap::new();
    let mut passthrough = Vec::new();

    for input in inputs {
        if input.enable_limiter {
            by_type
                .entry(input.decision.accelerator.clone())
                .or_default()
                .push(input.decision);
        } else {
            passthrough.push(input.decision);
        }
    }

    let mut out = passthrough;
    for (accelerator, mut decisions) in by_type {
        let available = inventory
            .get(&accelerator)
            .map(|inv| inv.available())
            .unwrap_or(0);
        out.extend(arbitrate_one_type(&mut decisions, available));
    }
    out
}

/// Sorts by pressure descending, then priority descending, then cost
/// ascending, then variant id ascending (spec.md §4.5 step 2), and
/// walks the order granting each variant `min(wanted, remaining)`
/// accelerator units.
fn arbitrate_one_type(decisions: &mut [Decision], available: u64) -> Vec<Decision> {
    let mut order: Vec<usize> = (0..decisions.len()).collect();
    order.sort_by(|&a, &b| compare_contention(&decisions[a], &decisions[b]));

    let mut remaining = available;
    for idx in order {
        let decision = &mut decisions[idx];
        if decision.target <= 0 || decision.accelerator_count == 0 {
            continue;
        }
        let wanted = decision.target as u64 * decision.accelerator_count as u64;
        let granted_units = std::cmp::min(wanted, remaining);
        remaining -= granted_units;
        let capped_target = (granted_units / decision.accelerator_count as u64) as i64;

        if capped_target < decision.target {
            tracing::debug!(
                variant = %decision.variant_id,
                accelerator = %decision.accelerator,
                original = decision.target,
                capped = capped_target,
                "limited by accelerator capacity"
            );
            decision.target = capped_target;
            decision.reason = ReasonCode::LimitedByCapacity;
            decision.limited = true;
        }
    }

    decisions.to_vec()
}

fn compare_contention(a: &Decision, b: &Decision) -> Ordering {
    b.pressure
        .partial_cmp(&a.pressure)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.cost.partial_cmp(&b.cost).unwrap_or(Ordering::Equal))
        .then_with(|| a.variant_id.cmp(&b.variant_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wva_types::{AcceleratorInventory, VariantId};

    fn decision(id: &str, target: i64, accelerator_count: u32, pressure: f64, priority: i32, cost: f64) -> Decision {
        let mut d = Decision::new(VariantId(id.to_string()), target, ReasonCode::Optimizer);
        d.accelerator = "A100".to_string();
        d.accelerator_count = accelerator_count;
        d.pressure = pressure;
        d.priority = priority;
        d.cost = cost;
        d
    }

    fn snapshot(total: u64, consumed: u64) -> InventorySnapshot {
        let mut by_type = HashMap::new();
        by_type.insert(
            "A100".to_string(),
            AcceleratorInventory {
                total,
                consumed_by_other_workloads: consumed,
            },
        );
        InventorySnapshot { by_type }
    }

    fn find<'a>(out: &'a [Decision], id: &str) -> &'a Decision {
        out.iter().find(|d| d.variant_id.0 == id).unwrap()
    }

    /// S4: two variants share A100, total=4, acceleratorCount=2 each,
    /// both ask target=3; alpha has higher pressure and wins all of the
    /// 2 replicas the inventory can support, beta gets 0.
    #[test]
    fn s4_higher_pressure_wins_contention() {
        let inputs = vec![
            LimiterInput {
                decision: decision("alpha-a100-1", 3, 2, 0.9, 0, 10.0),
                enable_limiter: true,
            },
            LimiterInput {
                decision: decision("beta-a100-1", 3, 2, 0.4, 0, 10.0),
                enable_limiter: true,
            },
        ];
        let out = limit(inputs, &snapshot(4, 0));
        assert_eq!(find(&out, "alpha-a100-1").target, 2);
        assert!(find(&out, "alpha-a100-1").limited);
        assert_eq!(find(&out, "beta-a100-1").target, 0);
        assert!(find(&out, "beta-a100-1").limited);
    }

    /// P9 refinement: leftover capacity after satisfying the top
    /// variant's own (smaller) ask flows to the next in line.
    #[test]
    fn leftover_capacity_flows_to_next_variant() {
        let inputs = vec![
            LimiterInput {
                decision: decision("alpha-a100-1", 1, 2, 0.9, 0, 10.0),
                enable_limiter: true,
            },
            LimiterInput {
                decision: decision("beta-a100-1", 3, 2, 0.4, 0, 10.0),
                enable_limiter: true,
            },
        ];
        let out = limit(inputs, &snapshot(4, 0));
        assert_eq!(find(&out, "alpha-a100-1").target, 1);
        assert!(!find(&out, "alpha-a100-1").limited);
        assert_eq!(find(&out, "beta-a100-1").target, 1);
    }

    /// P6: total granted units never exceed available inventory.
    #[test]
    fn p6_never_overcommits_the_type() {
        let inputs = vec![
            LimiterInput {
                decision: decision("a-a100-1", 5, 1, 0.8, 0, 10.0),
                enable_limiter: true,
            },
            LimiterInput {
                decision: decision("b-a100-1", 5, 1, 0.7, 0, 10.0),
                enable_limiter: true,
            },
            LimiterInput {
                decision: decision("c-a100-1", 5, 1, 0.6, 0, 10.0),
                enable_limiter: true,
            },
        ];
        let out = limit(inputs, &snapshot(7, 2));
        let total_units: i64 = out.iter().map(|d| d.target * d.accelerator_count as i64).sum();
        assert!(total_units <= 5);
    }

    /// P7: under contention, a strictly higher-pressure, not-lower
    /// priority variant never receives less than a lower one.
    #[test]
    fn p7_priority_monotonicity() {
        let inputs = vec![
            LimiterInput {
                decision: decision("low-a100-1", 2, 1, 0.2, 0, 10.0),
                enable_limiter: true,
            },
            LimiterInput {
                decision: decision("high-a100-1", 2, 1, 0.9, 0, 10.0),
                enable_limiter: true,
            },
        ];
        let out = limit(inputs, &snapshot(2, 0));
        assert!(find(&out, "high-a100-1").target >= find(&out, "low-a100-1").target);
    }

    #[test]
    fn disabled_limiter_passes_decisions_through_unchanged() {
        let inputs = vec![LimiterInput {
            decision: decision("solo-a100-1", 9, 4, 0.1, 0, 10.0),
            enable_limiter: false,
        }];
        let out = limit(inputs, &snapshot(1, 0));
        assert_eq!(out[0].target, 9);
        assert!(!out[0].limited);
    }

    #[test]
    fn unknown_accelerator_type_grants_nothing() {
        let inputs = vec![LimiterInput {
            decision: decision("solo-a100-1", 2, 1, 0.5, 0, 10.0),
            enable_limiter: true,
        }];
        let out = limit(inputs, &InventorySnapshot::default());
        assert_eq!(out[0].target, 0);
        assert!(out[0].limited);
    }
}
