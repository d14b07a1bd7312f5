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

//! Metrics Collector (C2): per-variant pull of arrival rate, KV-cache
//! utilization, queue length, and a retention-window increase, backed
//! by a TTL cache the dispatcher only ever reads from.

mod backend;
mod collector;

pub use backend::{CollectError, Metrics, MetricsBackend, StaticMetricsBackend};
pub use collector::MetricsCollector;
