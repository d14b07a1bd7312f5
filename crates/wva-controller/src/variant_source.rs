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

//! External-collaborator seam for wherever `Variant` objects actually
//! live (spec.md §1's cluster API, out of scope beyond this interface).

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use wva_types::Variant;

#[derive(Debug, Error)]
pub enum VariantSourceError {
    #[error("variant listing timed out")]
    Timeout,
    #[error("variant listing failed: {0}")]
    Backend(String),
}

/// Lists every declared variant; the Dispatcher filters out deletion
/// markers itself (spec.md §4.7) rather than asking the source to.
#[async_trait]
pub trait VariantSource: Send + Sync {
    async fn list(&self) -> Result<Vec<Variant>, VariantSourceError>;
}

/// A fixed variant list for tests and local runs, mutable so tests can
/// simulate a variant-object create/update trigger between ticks.
pub struct StaticVariantSource {
    variants: Mutex<Vec<Variant>>,
}

impl StaticVariantSource {
    pub fn new(variants: Vec<Variant>) -> Self {
        StaticVariantSource {
            variants: Mutex::new(variants),
        }
    }

    pub fn set(&self, variants: Vec<Variant>) {
        *self.variants.lock() = variants;
    }
}

#[async_trait]
impl VariantSource for StaticVariantSource {
    async fn list(&self) -> Result<Vec<Variant>, VariantSourceError> {
        Ok(self.variants.lock().clone())
    }
}
