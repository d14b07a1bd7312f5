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

//! Reconciler Dispatcher (C7): composes C1-C6 on every tick, per
//! spec.md §4.7.

pub mod coalesce;
pub mod config;
pub mod dispatcher;
pub mod health;
pub mod variant_source;

pub use coalesce::TickCoalescer;
pub use config::ControllerConfig;
pub use dispatcher::Dispatcher;
pub use health::{build_http_app_state, HttpState};
pub use variant_source::{StaticVariantSource, VariantSource, VariantSourceError};
