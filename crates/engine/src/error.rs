// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the topological runner and service instance lifecycle.

use std::time::Duration;

use svcinit_adapters::ProcessError;
use svcinit_core::Label;
use thiserror::Error;

/// Errors raised by the [`crate::topo::TopoRunner`] itself, as opposed to
/// by individual tasks.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("dependency cycle detected among: {0:?}")]
    Cycle(Vec<Label>),
}

/// Errors from one service instance's spawn/readiness/shutdown lifecycle.
#[derive(Debug, Error)]
pub enum InstanceError {
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error("failed to open log file: {0}")]
    Log(#[source] std::io::Error),
    #[error("task exited with status {0:?}")]
    TaskFailed(Option<i32>),
    #[error("process exited during readiness probing (status {0:?})")]
    ProcessExited(Option<i32>),
    #[error("readiness probe timed out")]
    ReadinessTimeout,
    #[error("{label} did not exit within {timeout:?} and enforce_forceful_shutdown is set")]
    ForcedShutdown { label: Label, timeout: Duration },
}
