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

//! Shared data model for the workload variant autoscaler core.
//!
//! None of the types here perform I/O; they are the vocabulary the
//! other crates in the workspace (`wva-config`, `wva-metrics`,
//! `wva-inventory`, `wva-analyzer`, `wva-limiter`, `wva-applier`,
//! `wva-controller`) pass between each other on every reconcile tick.

pub mod decision;
pub mod error;
pub mod inventory;
pub mod runtime;
pub mod scaling;
pub mod status;
pub mod variant;

pub use decision::{Decision, ReasonCode};
pub use error::WvaError;
pub use inventory::{AcceleratorInventory, InventorySnapshot};
pub use runtime::{Saturation, VariantRuntimeRecord};
pub use scaling::ScalingEntry;
pub use status::VariantStatus;
pub use variant::{ScaleTargetRef, Variant, VariantId};
