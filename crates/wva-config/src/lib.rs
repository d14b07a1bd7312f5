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

//! Config Cache (C1): a single-writer, many-reader cache of scaling
//! entries and the reconcile interval, read lock-free-ish by the
//! dispatcher on every tick.

mod cache;
mod driver;
mod parse;
mod source;

pub use cache::ConfigCache;
pub use driver::drive;
pub use parse::{parse_interval, parse_scaling_configmap, ParseError};
pub use source::{ConfigEvent, ConfigSource, StaticConfigSource};
