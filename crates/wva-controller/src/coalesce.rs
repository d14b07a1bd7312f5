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

//! Collapses the periodic ticker, variant events and configmap events
//! into a single pending tick token, per spec.md §4.7 and §5's "tick
//! deduplication" invariant.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

pub struct TickCoalescer {
    pending: AtomicBool,
    notify: Notify,
}

impl Default for TickCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCoalescer {
    pub fn new() -> Self {
        TickCoalescer {
            pending: AtomicBool::new(false),
            notify: Notify::new(),
        }
    }

    /// Any trigger source calls this. If a tick is already pending,
    /// this is a no-op — "a tick in progress absorbs new triggers
    /// without extra work".
    pub fn request(&self) {
        if !self.pending.swap(true, Ordering::AcqRel) {
            self.notify.notify_one();
        }
    }

    /// Blocks until a tick has been requested, clearing the pending
    /// flag atomically so a request arriving during the tick itself is
    /// not lost.
    pub async fn wait(&self) {
        loop {
            if self.pending.swap(false, Ordering::AcqRel) {
                return;
            }
            self.notify.notified().await;
        }
    }
}
