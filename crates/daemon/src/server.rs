// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control-plane HTTP server (spec.md §4.5): start/kill/wait/
//! healthcheck/port-lookup for individual services plus a live log-tail
//! endpoint, served over `axum` on a `127.0.0.1` port reserved ahead of
//! any service port (spec.md §9's first Open Question).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream;
use serde::Deserialize;
use svcinit_adapters::ProcessSignal;
use svcinit_core::{Label, ServiceType, ShutdownSignal};
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tower_http::trace::TraceLayer;

use crate::runner::Runner;

const LOG_TAIL_POLL: Duration = Duration::from_millis(100);
const LOG_CHUNK: usize = 64 * 1024;

/// Build the axum router. `runner` is shared read-only by every request
/// handler per spec.md §4.5's "shared-resource policy" — callers are
/// expected to serialize control-plane requests against coordinator
/// mutation cycles themselves.
pub fn router(runner: Arc<Runner>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/v0/log", get(log_tail))
        .route("/v0/healthcheck", get(healthcheck))
        .route("/v0/start", get(start_one))
        .route("/v0/kill", get(kill_one))
        .route("/v0/wait", get(wait_one))
        .route("/v0/port", get(port_lookup))
        .layer(TraceLayer::new_for_http())
        .with_state(runner)
}

async fn index(State(runner): State<Arc<Runner>>) -> Html<String> {
    let mut rows = String::new();
    for label in runner.labels() {
        if let Some(instance) = runner.instance(&label) {
            rows.push_str(&format!(
                "<tr><td>{label}</td><td>{:?}</td></tr>\n",
                instance.state()
            ));
        }
    }
    Html(format!(
        "<!doctype html><html><head><title>svcinit</title></head><body>\
         <h1>services</h1><table><tr><th>label</th><th>state</th></tr>{rows}</table>\
         <script>\
         // client-side log tailing against /v0/log?service=...&offset=... lives here;\
         // left minimal since UI polish is an out-of-scope external concern.\
         </script></body></html>"
    ))
}

#[derive(Deserialize)]
struct ServiceQuery {
    service: String,
}

fn resolve_service(runner: &Runner, label: &str) -> Result<Arc<svcinit_engine::ServiceInstance>, Response> {
    let label = Label::from(label);
    match runner.instance(&label) {
        Some(instance) => Ok(instance),
        None => Err((StatusCode::BAD_REQUEST, format!("unknown service {label:?}")).into_response()),
    }
}

fn require_service_type(instance: &svcinit_engine::ServiceInstance) -> Result<(), Response> {
    if instance.spec().spec.ty == ServiceType::Service {
        Ok(())
    } else {
        Err((StatusCode::BAD_REQUEST, "not a service instance").into_response())
    }
}

#[derive(Deserialize)]
struct LogQuery {
    service: String,
    #[serde(default)]
    offset: u64,
}

async fn log_tail(State(runner): State<Arc<Runner>>, Query(query): Query<LogQuery>) -> Response {
    let instance = match resolve_service(&runner, &query.service) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    let Some(path) = instance.log_path() else {
        return (StatusCode::BAD_REQUEST, "service has no log file yet").into_response();
    };

    let body_stream = stream::unfold((path, query.offset), move |(path, offset)| async move {
        loop {
            let Ok(mut file) = tokio::fs::File::open(&path).await else {
                return None;
            };
            if file.seek(SeekFrom::Start(offset)).await.is_err() {
                return None;
            }
            let mut buf = vec![0u8; LOG_CHUNK];
            match file.read(&mut buf).await {
                Ok(0) => {
                    tokio::time::sleep(LOG_TAIL_POLL).await;
                    continue;
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Some((Ok::<_, std::io::Error>(buf), (path, offset + n as u64)));
                }
                Err(e) => {
                    tracing::warn!(error = %e, "log tail read failed");
                    return None;
                }
            }
        }
    });

    axum::body::Body::from_stream(body_stream).into_response()
}

async fn healthcheck(State(runner): State<Arc<Runner>>, Query(query): Query<ServiceQuery>) -> Response {
    let instance = match resolve_service(&runner, &query.service) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_service_type(&instance) {
        return resp;
    }
    if instance.healthcheck().await {
        StatusCode::OK.into_response()
    } else {
        StatusCode::SERVICE_UNAVAILABLE.into_response()
    }
}

async fn start_one(State(runner): State<Arc<Runner>>, Query(query): Query<ServiceQuery>) -> Response {
    let label = Label::from(query.service.as_str());
    let instance = match resolve_service(&runner, &query.service) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_service_type(&instance) {
        return resp;
    }

    if instance.spec().spec.deferred {
        if let Err(e) = runner.wait_for_dependencies_healthy(&label).await {
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    }

    let runner = runner.clone();
    tokio::spawn(async move {
        if let Err(e) = runner.start_one(&label).await {
            tracing::warn!(label = %label, error = %e, "deferred start failed");
        }
    });

    StatusCode::OK.into_response()
}

#[derive(Deserialize)]
struct KillQuery {
    service: String,
    #[serde(default)]
    signal: Option<String>,
}

fn parse_signal(raw: &str) -> Option<ProcessSignal> {
    match raw {
        "SIGTERM" => Some(ShutdownSignal::Sigterm.into()),
        "SIGKILL" => Some(ShutdownSignal::Sigkill.into()),
        _ => None,
    }
}

async fn kill_one(State(runner): State<Arc<Runner>>, Query(query): Query<KillQuery>) -> Response {
    let instance = match resolve_service(&runner, &query.service) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_service_type(&instance) {
        return resp;
    }

    let signal = match query.signal.as_deref() {
        Some(raw) => match parse_signal(raw) {
            Some(s) => Some(s),
            None => return (StatusCode::BAD_REQUEST, format!("unknown signal {raw:?}")).into_response(),
        },
        None => None,
    };

    match instance.stop(signal).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Deserialize)]
struct WaitQuery {
    service: String,
    #[serde(default)]
    timeout: Option<u64>,
}

async fn wait_one(State(runner): State<Arc<Runner>>, Query(query): Query<WaitQuery>) -> Response {
    let instance = match resolve_service(&runner, &query.service) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_service_type(&instance) {
        return resp;
    }

    let timeout = query.timeout.map(Duration::from_secs);
    match instance.wait_for_exit(timeout).await {
        Some(code) => code.to_string().into_response(),
        None => (StatusCode::REQUEST_TIMEOUT, "timed out waiting for exit").into_response(),
    }
}

async fn port_lookup(State(runner): State<Arc<Runner>>, Query(query): Query<ServiceQuery>) -> Response {
    match runner.port(&query.service) {
        Some(port) => port.to_string().into_response(),
        None => (StatusCode::BAD_REQUEST, format!("no allocated port named {:?}", query.service))
            .into_response(),
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;

