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

//! Published status storage, single-writer per variant, from spec.md
//! §5's shared-resource policy.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;
use wva_types::{VariantId, VariantStatus};

const NUM_SHARDS: usize = 16;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("status version conflict for {0}")]
    VersionConflict(VariantId),
}

/// The Applier's only out-of-process-shaped dependency: real
/// deployments back this with the variant object's own status
/// subresource (out of scope here per spec.md §1), keyed by optimistic
/// concurrency on [`VariantStatus::version`].
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn get(&self, variant_id: &VariantId) -> Option<VariantStatus>;

    /// Writes `new_status` iff the stored version still matches
    /// `expected_version` (`None` means "must not exist yet"). Bumps
    /// `new_status.version` to `expected_version + 1` on success.
    async fn compare_and_swap(
        &self,
        expected_version: Option<u64>,
        new_status: VariantStatus,
    ) -> Result<(), StoreError>;
}

struct Shard {
    statuses: Mutex<HashMap<VariantId, VariantStatus>>,
}

/// Sharded in-memory status store, mirroring the corpus's sharded
/// `parking_lot::Mutex` map pattern. Suitable as the production
/// in-process store when status does not need to survive a restart,
/// and as the test double otherwise.
pub struct InMemoryStatusStore {
    shards: Vec<Shard>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        InMemoryStatusStore {
            shards: (0..NUM_SHARDS)
                .map(|_| Shard {
                    statuses: Mutex::new(HashMap::new()),
                })
                .collect(),
        }
    }

    fn shard_for(&self, variant_id: &VariantId) -> &Shard {
        let mut hasher = DefaultHasher::new();
        variant_id.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }
}

impl Default for InMemoryStatusStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn get(&self, variant_id: &VariantId) -> Option<VariantStatus> {
        self.shard_for(variant_id)
            .statuses
            .lock()
            .get(variant_id)
            .cloned()
    }

    async fn compare_and_swap(
        &self,
        expected_version: Option<u64>,
        mut new_status: VariantStatus,
    ) -> Result<(), StoreError> {
        let shard = self.shard_for(&new_status.variant_id);
        let mut statuses = shard.statuses.lock();
        let current_version = statuses.get(&new_status.variant_id).map(|s| s.version);
        if current_version != expected_version {
            return Err(StoreError::VersionConflict(new_status.variant_id.clone()));
        }
        new_status.version = expected_version.map(|v| v + 1).unwrap_or(0);
        statuses.insert(new_status.variant_id.clone(), new_status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wva_types::ReasonCode;
    use chrono::Utc;

    fn status(variant_id: &str, target: i64) -> VariantStatus {
        VariantStatus::initial(VariantId(variant_id.to_string()), target, ReasonCode::Optimizer, Utc::now())
    }

    #[tokio::test]
    async fn first_write_requires_no_prior_version() {
        let store = InMemoryStatusStore::new();
        store.compare_and_swap(None, status("a-a100-1", 1)).await.unwrap();
        let got = store.get(&VariantId("a-a100-1".to_string())).await.unwrap();
        assert_eq!(got.version, 0);
    }

    #[tokio::test]
    async fn stale_expected_version_is_rejected() {
        let store = InMemoryStatusStore::new();
        store.compare_and_swap(None, status("a-a100-1", 1)).await.unwrap();
        let err = store
            .compare_and_swap(None, status("a-a100-1", 2))
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::VersionConflict(VariantId("a-a100-1".to_string())));
    }

    #[tokio::test]
    async fn correct_expected_version_advances_the_version() {
        let store = InMemoryStatusStore::new();
        store.compare_and_swap(None, status("a-a100-1", 1)).await.unwrap();
        store
            .compare_and_swap(Some(0), status("a-a100-1", 2))
            .await
            .unwrap();
        let got = store.get(&VariantId("a-a100-1".to_string())).await.unwrap();
        assert_eq!(got.version, 1);
        assert_eq!(got.target, 2);
    }
}
