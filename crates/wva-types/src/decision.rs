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

//! The decision a variant flows through Analyzer -> Limiter -> Applier.

use crate::variant::VariantId;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    Optimizer,
    FallbackMetricsUnavailable,
    ScaleToZero,
    BoundClamped,
    LimitedByCapacity,
}

impl ReasonCode {
    /// The spec.md §3/§6 human-readable reason string published on
    /// `VariantStatus.reason` — the sole producer of those codes, so
    /// both `Display` and `(de)serialization` below are defined in
    /// terms of it rather than letting serde derive its own casing.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Optimizer => "OPTIMIZER",
            ReasonCode::FallbackMetricsUnavailable => "FALLBACK_METRICS_UNAVAILABLE",
            ReasonCode::ScaleToZero => "SCALE_TO_ZERO",
            ReasonCode::BoundClamped => "BOUND_CLAMPED",
            ReasonCode::LimitedByCapacity => "LIMITED_BY_CAPACITY",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "OPTIMIZER" => Some(ReasonCode::Optimizer),
            "FALLBACK_METRICS_UNAVAILABLE" => Some(ReasonCode::FallbackMetricsUnavailable),
            "SCALE_TO_ZERO" => Some(ReasonCode::ScaleToZero),
            "BOUND_CLAMPED" => Some(ReasonCode::BoundClamped),
            "LIMITED_BY_CAPACITY" => Some(ReasonCode::LimitedByCapacity),
            _ => None,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ReasonCode {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

struct ReasonCodeVisitor;

impl<'de> Visitor<'de> for ReasonCodeVisitor {
    type Value = ReasonCode;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("one of the spec's reason code strings (e.g. \"OPTIMIZER\")")
    }

    fn visit_str<E>(self, v: &str) -> std::result::Result<ReasonCode, E>
    where
        E: de::Error,
    {
        ReasonCode::from_str(v).ok_or_else(|| de::Error::unknown_variant(v, &[
            "OPTIMIZER",
            "FALLBACK_METRICS_UNAVAILABLE",
            "SCALE_TO_ZERO",
            "BOUND_CLAMPED",
            "LIMITED_BY_CAPACITY",
        ]))
    }
}

impl<'de> Deserialize<'de> for ReasonCode {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(ReasonCodeVisitor)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub variant_id: VariantId,
    pub target: i64,
    pub reason: ReasonCode,
    pub limited: bool,
    pub accelerator: String,
    pub accelerator_count: u32,
    pub priority: i32,
    pub cost: f64,
    /// `1 - min(spare_fraction, 1 - saturated_fraction)`, used by the
    /// limiter's greedy-by-pressure ordering; carried on the decision
    /// so the limiter doesn't need the runtime record again.
    pub pressure: f64,
}

impl Decision {
    pub fn new(variant_id: VariantId, target: i64, reason: ReasonCode) -> Self {
        Decision {
            variant_id,
            target,
            reason,
            limited: false,
            accelerator: String::new(),
            accelerator_count: 1,
            priority: 0,
            cost: 10.0,
            pressure: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_the_spec_reason_string() {
        let yaml = serde_yaml::to_string(&ReasonCode::ScaleToZero).unwrap();
        assert_eq!(yaml.trim(), "SCALE_TO_ZERO");
    }

    #[test]
    fn round_trips_every_variant() {
        for reason in [
            ReasonCode::Optimizer,
            ReasonCode::FallbackMetricsUnavailable,
            ReasonCode::ScaleToZero,
            ReasonCode::BoundClamped,
            ReasonCode::LimitedByCapacity,
        ] {
            let yaml = serde_yaml::to_string(&reason).unwrap();
            let back: ReasonCode = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(back, reason);
        }
    }

    #[test]
    fn rejects_an_unknown_reason_string() {
        let result: std::result::Result<ReasonCode, _> = serde_yaml::from_str("\"NOT_A_REASON\"");
        assert!(result.is_err());
    }
}
