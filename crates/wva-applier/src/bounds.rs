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

//! Pure steps 1-2 of spec.md §4.6, independently testable from the
//! publish machinery in [`crate::apply`].

use wva_types::ReasonCode;

/// Step 1: `target = max(minReplicas, min(maxReplicas_or_inf, target))`.
/// Returns the clamped value and whether clamping actually changed it.
pub fn clamp_to_bounds(target: i64, min_replicas: Option<i64>, max_replicas: Option<i64>) -> (i64, bool) {
    let mut clamped = target;
    if let Some(max) = max_replicas {
        clamped = std::cmp::min(clamped, max);
    }
    if let Some(min) = min_replicas {
        clamped = std::cmp::max(clamped, min);
    }
    (clamped, clamped != target)
}

/// Step 2: a zero target is only honored when the analyzer itself
/// classified the tick as `SCALE_TO_ZERO` under an entry that enables
/// it — any other route to zero (a bound clamp, a capacity limit) is a
/// safety violation and gets raised back to the floor.
pub fn enforce_scale_to_zero(
    target: i64,
    reason: ReasonCode,
    enable_scale_to_zero: bool,
    min_replicas: Option<i64>,
) -> i64 {
    if target != 0 {
        return target;
    }
    let zero_is_intentional = enable_scale_to_zero && reason == ReasonCode::ScaleToZero;
    if zero_is_intentional {
        0
    } else {
        std::cmp::max(1, min_replicas.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_above_max() {
        let (target, changed) = clamp_to_bounds(10, None, Some(5));
        assert_eq!(target, 5);
        assert!(changed);
    }

    #[test]
    fn clamps_below_min() {
        let (target, changed) = clamp_to_bounds(0, Some(2), None);
        assert_eq!(target, 2);
        assert!(changed);
    }

    #[test]
    fn unbounded_target_passes_through() {
        let (target, changed) = clamp_to_bounds(3, None, None);
        assert_eq!(target, 3);
        assert!(!changed);
    }

    #[test]
    fn intentional_scale_to_zero_is_honored() {
        let target = enforce_scale_to_zero(0, ReasonCode::ScaleToZero, true, Some(0));
        assert_eq!(target, 0);
    }

    #[test]
    fn capacity_limited_zero_is_raised_to_the_floor() {
        let target = enforce_scale_to_zero(0, ReasonCode::LimitedByCapacity, true, Some(2));
        assert_eq!(target, 2);
    }

    #[test]
    fn zero_without_scale_to_zero_enabled_is_raised_to_one() {
        let target = enforce_scale_to_zero(0, ReasonCode::ScaleToZero, false, None);
        assert_eq!(target, 1);
    }
}
