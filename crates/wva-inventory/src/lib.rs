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

//! Inventory Scanner (C3): summarizes fleet-wide accelerator capacity
//! once per tick, independent of any single variant's decision.

mod scanner;
mod source;

pub use scanner::{summarize, VariantFootprint};
pub use source::{InventoryError, InventorySource, NodeAcceleratorReport, StaticInventorySource};
