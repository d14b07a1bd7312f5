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

//! Process-wide runtime configuration, loaded from the environment and
//! overridable from the CLI. Mirrors the corpus's `Config::from_env`
//! convention; none of this is part of the reconcile algorithm itself.

use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub http_bind_addr: SocketAddr,
    pub log_level: String,
    /// Identifies this process in the `controllerInstance` metric
    /// label and in its own status writes, per spec.md §6. Defaults to
    /// the pod hostname when unset.
    pub controller_instance: String,
    /// Bound on the per-stage worker pool, default 8 per spec.md §5.
    pub worker_pool_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            http_bind_addr: "0.0.0.0:8080".parse().expect("valid default bind address"),
            log_level: "info".to_string(),
            controller_instance: default_controller_instance(),
            worker_pool_size: 8,
        }
    }
}

impl ControllerConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let mut config = ControllerConfig::default();

        if let Ok(addr) = std::env::var("WVA_HTTP_BIND_ADDR") {
            config.http_bind_addr = addr.parse()?;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = level;
        }
        if let Ok(instance) = std::env::var("CONTROLLER_INSTANCE") {
            config.controller_instance = instance;
        }
        if let Ok(size) = std::env::var("WVA_WORKER_POOL_SIZE") {
            config.worker_pool_size = size.parse()?;
        }

        Ok(config)
    }
}

fn default_controller_instance() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "wva-controller".to_string())
}

/// spec.md §4.2: arrival-rate queries use a short window; retention
/// checks look back over the scaling entry's own window. The metrics
/// TTL is fixed relative to the reconcile interval, not configured
/// independently.
pub fn metrics_ttl_for(interval: Duration) -> Duration {
    interval / 2
}
