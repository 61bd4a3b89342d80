// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access (spec.md §6).
//!
//! Booleans here parse the literal string the build system actually
//! writes (`"True"`, or `"y"` for `IBAZEL_NOTIFY_CHANGES`), not Rust's
//! `bool::FromStr` — scattering `std::env::var(...) == "True"` checks
//! across the crate is exactly what this module exists to avoid.

use std::path::PathBuf;

fn is_true(var: &str) -> bool {
    std::env::var(var).map(|v| v == "True").unwrap_or(false)
}

/// `SVCINIT_TERSE_OUTPUT` — drop the default log level from `info` to `warn`.
pub fn terse_output() -> bool {
    is_true("SVCINIT_TERSE_OUTPUT")
}

/// `SVCINIT_ENABLE_PER_SERVICE_RELOAD` — expose per-service reload via the
/// control plane rather than only the blanket stdin hot-reload protocol.
pub fn enable_per_service_reload() -> bool {
    is_true("SVCINIT_ENABLE_PER_SERVICE_RELOAD")
}

/// `SVCINIT_KEEP_SERVICES_UP` — stay resident after the test binary exits
/// instead of tearing down immediately (one-shot mode is the default).
pub fn keep_services_up() -> bool {
    is_true("SVCINIT_KEEP_SERVICES_UP")
}

/// `SVCINIT_ALLOW_CONFIGURING_TMPDIR` — respect a caller-supplied `TMPDIR`
/// instead of always forcing the hermetic one.
pub fn allow_configuring_tmpdir() -> bool {
    is_true("SVCINIT_ALLOW_CONFIGURING_TMPDIR")
}

/// `IBAZEL_NOTIFY_CHANGES` — literal `"y"`, not `"True"`.
pub fn ibazel_notify_changes() -> bool {
    std::env::var("IBAZEL_NOTIFY_CHANGES").map(|v| v == "y").unwrap_or(false)
}

pub fn test_target() -> Option<String> {
    std::env::var("TEST_TARGET").ok()
}

pub fn bazel_test() -> bool {
    is_true("BAZEL_TEST")
}

/// Path to the service-spec JSON file.
pub fn service_specs_path() -> Option<String> {
    std::env::var("SVCINIT_SERVICE_SPECS_RLOCATION_PATH").ok()
}

/// Hermetic temp directory used for `TEST_TMPDIR`/`TMPDIR` unless the
/// caller opted in to supplying its own via `allow_configuring_tmpdir`.
pub fn tmpdir(hermetic_default: &PathBuf) -> PathBuf {
    if allow_configuring_tmpdir() {
        if let Ok(caller) = std::env::var("TMPDIR") {
            if !caller.is_empty() {
                return PathBuf::from(caller);
            }
        }
    }
    hermetic_default.clone()
}

/// Short-path directory for Unix domain sockets, kept distinct from
/// `TMPDIR` because the latter can be long enough to overflow
/// `sockaddr_un`'s path limit.
pub fn socket_dir(hermetic_default: &PathBuf) -> PathBuf {
    hermetic_default.clone()
}
