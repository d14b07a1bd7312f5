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

//! External-collaborator seam for the watched inventory source
//! (spec.md §1: a cluster API listing accelerator nodes, out of scope
//! beyond this interface).

use async_trait::async_trait;
use thiserror::Error;

/// One node's allocatable count of a single accelerator type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeAcceleratorReport {
    pub accelerator: String,
    pub allocatable: u64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("node listing timed out")]
    Timeout,
    #[error("node listing failed: {0}")]
    Backend(String),
}

#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Lists every node's accelerator reports, one entry per
    /// (node, accelerator-type) pair it carries.
    async fn list_nodes(&self) -> Result<Vec<NodeAcceleratorReport>, InventoryError>;
}

/// A fixed node list for tests and local runs.
pub struct StaticInventorySource {
    reports: Vec<NodeAcceleratorReport>,
}

impl StaticInventorySource {
    pub fn new(reports: Vec<NodeAcceleratorReport>) -> Self {
        StaticInventorySource { reports }
    }
}

#[async_trait]
impl InventorySource for StaticInventorySource {
    async fn list_nodes(&self) -> Result<Vec<NodeAcceleratorReport>, InventoryError> {
        Ok(self.reports.clone())
    }
}
