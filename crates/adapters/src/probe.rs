// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Readiness probing (spec.md §4.3): HTTP GET or command-exit-code checks.

use std::time::Duration;

use async_trait::async_trait;
use svcinit_core::Probe;

/// Hard per-attempt timeout for HTTP probes, short enough that a socket
/// which accepts (SO_REUSEPORT) but never replies doesn't stall readiness
/// polling.
const HTTP_PROBE_TIMEOUT: Duration = Duration::from_millis(50);

/// Runs one readiness probe and reports success/failure. Never returns an
/// `Err` — a probe that can't complete (connection refused, non-zero exit,
/// timeout) is simply "not ready yet", not an error condition.
#[async_trait]
pub trait ProbeClient: Send + Sync + 'static {
    async fn check(&self, probe: &Probe) -> bool;
}

/// Real probe client: `reqwest` for HTTP, a bare child process for Command.
#[derive(Clone)]
pub struct RealProbeClient {
    http: reqwest::Client,
}

impl RealProbeClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(HTTP_PROBE_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http }
    }
}

impl Default for RealProbeClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProbeClient for RealProbeClient {
    async fn check(&self, probe: &Probe) -> bool {
        match probe {
            Probe::None => true,
            Probe::Http { address } => check_http(&self.http, address).await,
            Probe::Command { exe, args } => check_command(exe, args).await,
        }
    }
}

async fn check_http(client: &reqwest::Client, address: &str) -> bool {
    let url = if address.starts_with("http://") || address.starts_with("https://") {
        address.to_string()
    } else {
        format!("http://{address}")
    };
    match client.get(&url).send().await {
        Ok(response) => {
            let status = response.status();
            status.as_u16() == 200 || status.as_u16() == 204
        }
        Err(source) => {
            tracing::debug!(address, error = %source, "probe request failed");
            false
        }
    }
}

async fn check_command(exe: &str, args: &[String]) -> bool {
    match tokio::process::Command::new(exe).args(args).status().await {
        Ok(status) => status.success(),
        Err(source) => {
            tracing::debug!(exe, error = %source, "probe command failed to spawn");
            false
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake probe client whose answer is fully scripted by the test.
    #[derive(Clone, Default)]
    pub struct FakeProbeClient {
        next_results: Arc<Mutex<std::collections::VecDeque<bool>>>,
        default_result: Arc<Mutex<bool>>,
    }

    impl FakeProbeClient {
        /// A client that always returns `result`.
        pub fn always(result: bool) -> Self {
            let client = Self::default();
            *client.default_result.lock() = result;
            client
        }

        /// Queue a sequence of results; once exhausted, falls back to the
        /// default (initially `false`).
        pub fn push_result(&self, result: bool) {
            self.next_results.lock().push_back(result);
        }
    }

    #[async_trait]
    impl ProbeClient for FakeProbeClient {
        async fn check(&self, _probe: &Probe) -> bool {
            if let Some(next) = self.next_results.lock().pop_front() {
                return next;
            }
            *self.default_result.lock()
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeProbeClient;

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;
