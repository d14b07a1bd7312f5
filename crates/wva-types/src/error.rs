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

//! Admission-time and validation errors shared across the workspace.

use thiserror::Error;

/// Errors raised while validating a [`crate::Variant`] or
/// [`crate::ScalingEntry`] before it is accepted into the system.
///
/// These map to spec.md §7's "Admission error" and "Configuration
/// validation error" kinds: both are rejected/dropped before the loop
/// ever sees them, never surfaced as a per-tick failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WvaError {
    #[error("modelID must be 1-128 characters, got {0}")]
    InvalidModelId(usize),

    #[error("variantID {0:?} does not match the required pattern")]
    InvalidVariantId(String),

    #[error("accelerator type must be 1-64 characters, got {0}")]
    InvalidAccelerator(usize),

    #[error("acceleratorCount must be >= 1, got {0}")]
    InvalidAcceleratorCount(i64),

    #[error("minReplicas ({min}) must be <= maxReplicas ({max})")]
    BoundsViolated { min: i64, max: i64 },

    #[error("variantCost {0:?} is not a valid non-negative decimal")]
    InvalidVariantCost(String),

    #[error("scaleTargetRef.kind {0:?} is not a supported workload kind")]
    UnsupportedTargetKind(String),

    #[error("kvCacheThreshold must be in (0,1], got {0}")]
    InvalidKvCacheThreshold(f64),

    #[error("queueLengthThreshold must be >= 1, got {0}")]
    InvalidQueueLengthThreshold(i64),

    #[error("kvSpareTrigger ({spare}) must be < kvCacheThreshold ({threshold})")]
    KvSpareNotBelowThreshold { spare: f64, threshold: f64 },

    #[error("queueSpareTrigger ({spare}) must be < queueLengthThreshold ({threshold})")]
    QueueSpareNotBelowThreshold { spare: i64, threshold: i64 },
}

pub type Result<T> = std::result::Result<T, WvaError>;
