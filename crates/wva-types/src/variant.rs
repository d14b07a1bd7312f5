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

//! The declarative `Variant` object and its admission rules.

use crate::error::{Result, WvaError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A (model, accelerator type, accelerator-count-per-replica) identity.
///
/// Spec.md's design notes are explicit that the variant object's own
/// name is the sole lookup key — the target workload name is a
/// different field and must never be substituted for it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantId(pub String);

impl fmt::Display for VariantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to the replica group this variant controls. Never read for
/// identity purposes — only `VariantId` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScaleTargetRef {
    pub kind: String,
    pub name: String,
}

/// Optional pointer to an SLO class record, narrowing which scaling
/// entry a variant's model resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SloClassRef {
    pub name: String,
    pub key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: VariantId,
    pub namespace: String,
    pub model_id: String,
    pub accelerator: String,
    pub accelerator_count: u32,
    pub scale_target_ref: ScaleTargetRef,
    pub min_replicas: Option<i64>,
    pub max_replicas: Option<i64>,
    /// Decimal string per spec.md §6, defaulted to "10" at admission.
    pub variant_cost: String,
    pub slo_class_ref: Option<SloClassRef>,
    /// Scheduling priority class of the controlled workload; higher
    /// wins contention ties in the allocation limiter.
    pub priority: i32,
    /// True once a deletion timestamp has been observed on the variant
    /// object; such variants are excluded from the active set but kept
    /// long enough for the dispatcher to notice and drop their status.
    pub deleted: bool,
    /// Label used by spec.md §6's multi-instance isolation: when the
    /// process has a `CONTROLLER_INSTANCE` set, only variants tagged
    /// with a matching value are reconciled by this process.
    pub controller_instance_label: Option<String>,
}

const VARIANT_ID_SUFFIX_KINDS: &str = "name-<accelerator>-<replica-index>";

/// The only `scaleTargetRef.kind` this controller is entitled to scale.
/// spec.md §6 leaves the workload kind implicit ("kind must be the
/// controlled workload kind"); every fixture and status object in this
/// crate treats that controlled kind as an `InferenceService`, so
/// admission enforces the same value rather than accepting an arbitrary
/// string a variant object could otherwise carry.
pub const CONTROLLED_WORKLOAD_KIND: &str = "InferenceService";

impl Variant {
    /// Validates the admission invariants from spec.md §6:
    /// bounds ordering, field-length limits, variant id pattern, target
    /// kind, and a parseable non-negative `variantCost`. Mirrors the
    /// style of validating inputs at the edge rather than trusting
    /// callers, matching the corpus's `validator`-derive convention
    /// without pulling in the `validator` crate for a handful of checks.
    pub fn validate(&self) -> Result<()> {
        if self.model_id.is_empty() || self.model_id.len() > 128 {
            return Err(WvaError::InvalidModelId(self.model_id.len()));
        }
        if !is_valid_variant_id(&self.id.0) {
            return Err(WvaError::InvalidVariantId(self.id.0.clone()));
        }
        if self.accelerator.is_empty() || self.accelerator.len() > 64 {
            return Err(WvaError::InvalidAccelerator(self.accelerator.len()));
        }
        if self.accelerator_count < 1 {
            return Err(WvaError::InvalidAcceleratorCount(
                self.accelerator_count as i64,
            ));
        }
        if self.scale_target_ref.kind != CONTROLLED_WORKLOAD_KIND {
            return Err(WvaError::UnsupportedTargetKind(
                self.scale_target_ref.kind.clone(),
            ));
        }
        if let (Some(min), Some(max)) = (self.min_replicas, self.max_replicas) {
            if min > max {
                return Err(WvaError::BoundsViolated { min, max });
            }
        }
        parse_decimal(&self.variant_cost)
            .ok_or_else(|| WvaError::InvalidVariantCost(self.variant_cost.clone()))?;
        Ok(())
    }

    pub fn variant_cost_value(&self) -> f64 {
        parse_decimal(&self.variant_cost).unwrap_or(10.0)
    }
}

/// `^.+-[A-Za-z0-9_-]+-[1-9][0-9]*$` from spec.md §6: a non-empty base
/// name, an accelerator-ish segment, and a positive numeric suffix, all
/// hyphen separated. `VARIANT_ID_SUFFIX_KINDS` documents the intent for
/// error messages/tests rather than being parsed.
fn is_valid_variant_id(id: &str) -> bool {
    let _ = VARIANT_ID_SUFFIX_KINDS;
    let Some(last_dash) = id.rfind('-') else {
        return false;
    };
    let (rest, suffix) = id.split_at(last_dash);
    let suffix = &suffix[1..];
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    if suffix.starts_with('0') {
        return false;
    }
    let Some(mid_dash) = rest.rfind('-') else {
        return false;
    };
    let (base, accel) = rest.split_at(mid_dash);
    let accel = &accel[1..];
    !base.is_empty()
        && !accel.is_empty()
        && accel
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn parse_decimal(s: &str) -> Option<f64> {
    if s.is_empty() {
        return None;
    }
    let mut seen_dot = false;
    for c in s.chars() {
        if c == '.' {
            if seen_dot {
                return None;
            }
            seen_dot = true;
        } else if !c.is_ascii_digit() {
            return None;
        }
    }
    s.parse::<f64>().ok().filter(|v| *v >= 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_variant() -> Variant {
        Variant {
            id: VariantId("llama3-a100-1".to_string()),
            namespace: "default".to_string(),
            model_id: "llama3".to_string(),
            accelerator: "A100".to_string(),
            accelerator_count: 1,
            scale_target_ref: ScaleTargetRef {
                kind: "InferenceService".to_string(),
                name: "llama3-a100".to_string(),
            },
            min_replicas: None,
            max_replicas: None,
            variant_cost: "10".to_string(),
            slo_class_ref: None,
            priority: 0,
            deleted: false,
            controller_instance_label: None,
        }
    }

    #[test]
    fn accepts_a_well_formed_variant() {
        assert!(base_variant().validate().is_ok());
    }

    #[test]
    fn rejects_min_greater_than_max() {
        let mut v = base_variant();
        v.min_replicas = Some(5);
        v.max_replicas = Some(2);
        assert_eq!(
            v.validate(),
            Err(WvaError::BoundsViolated { min: 5, max: 2 })
        );
    }

    #[test]
    fn rejects_leading_zero_suffix() {
        let mut v = base_variant();
        v.id = VariantId("llama3-a100-01".to_string());
        assert!(v.validate().is_err());
    }

    #[test]
    fn rejects_zero_accelerator_count() {
        let mut v = base_variant();
        v.accelerator_count = 0;
        assert!(v.validate().is_err());
    }

    #[test]
    fn variant_cost_defaults_are_parsed() {
        let v = base_variant();
        assert_eq!(v.variant_cost_value(), 10.0);
    }

    #[test]
    fn rejects_negative_variant_cost() {
        let mut v = base_variant();
        v.variant_cost = "-1".to_string();
        assert!(v.validate().is_err());
    }

    #[test]
    fn rejects_an_uncontrolled_target_kind() {
        let mut v = base_variant();
        v.scale_target_ref.kind = "Deployment".to_string();
        assert_eq!(
            v.validate(),
            Err(WvaError::UnsupportedTargetKind("Deployment".to_string()))
        );
    }
}
