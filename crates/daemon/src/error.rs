// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors surfaced by spec augmentation, the coordinator, and the
//! control-plane server.

use std::path::PathBuf;

use svcinit_adapters::ProcessError;
use svcinit_core::Label;
use svcinit_engine::{EngineError, InstanceError};
use svcinit_wire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    Port(#[from] svcinit_adapters::PortAllocationError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Instance(#[from] InstanceError),
    #[error("failed to read version file {path}: {source}")]
    VersionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown service {0:?}")]
    UnknownService(Label),
    #[error("{0:?} is not a service; group/task instances don't take start/kill/health/port requests")]
    NotAService(Label),
    #[error("dependency {0:?} of deferred service {1:?} did not become healthy in time")]
    DependencyNotReady(Label, Label),
    #[error("one or more services failed to start")]
    StartFailed,
}
