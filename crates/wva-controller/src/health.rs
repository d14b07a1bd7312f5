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

//! The HTTP surface named in spec.md §6's ambient stack: liveness,
//! readiness, and the Prometheus scrape endpoint the external actuator
//! reads `desired_replicas` from.

use actix_web::{web, App, HttpResponse, HttpServer};
use prometheus::{Encoder, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub struct HttpState {
    pub registry: Registry,
    ready: AtomicBool,
}

impl HttpState {
    pub fn new(registry: Registry) -> Self {
        HttpState {
            registry,
            ready: AtomicBool::new(false),
        }
    }

    /// Flipped once after the first successful tick; the dispatcher
    /// never blocks on readiness, it only reports it.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

pub fn build_http_app_state(registry: Registry) -> Arc<HttpState> {
    Arc::new(HttpState::new(registry))
}

async fn healthz() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn readyz(state: web::Data<Arc<HttpState>>) -> HttpResponse {
    if state.is_ready() {
        HttpResponse::Ok().body("ready")
    } else {
        HttpResponse::ServiceUnavailable().body("not ready")
    }
}

async fn metrics(state: web::Data<Arc<HttpState>>) -> HttpResponse {
    let encoder = TextEncoder::new();
    let families = state.registry.gather();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&families, &mut buffer) {
        tracing::error!(error = %err, "failed to encode metrics");
        return HttpResponse::InternalServerError().finish();
    }
    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(buffer)
}

pub fn serve(bind_addr: SocketAddr, state: Arc<HttpState>) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .route("/healthz", web::get().to(healthz))
            .route("/readyz", web::get().to(readyz))
            .route("/metrics", web::get().to(metrics))
    })
    .bind(bind_addr)?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unready_and_becomes_ready() {
        let state = HttpState::new(Registry::new());
        assert!(!state.is_ready());
        state.mark_ready();
        assert!(state.is_ready());
    }
}
