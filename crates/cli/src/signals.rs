// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SIGINT/SIGTERM handling (spec.md §5 "Cancellation"): the first
//! interrupt begins an orderly `StopAll`; a second forces immediate exit.

use tokio::signal::unix::{signal, SignalKind};

/// Waits for the next SIGINT or SIGTERM.
pub async fn wait_for_interrupt() -> std::io::Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
    Ok(())
}

/// Spawns a task that force-exits with code 1 the moment a second
/// interrupt arrives, bypassing any in-progress orderly shutdown.
pub fn spawn_force_exit_on_second_interrupt() {
    tokio::spawn(async move {
        match wait_for_interrupt().await {
            Ok(()) => {
                tracing::warn!("second interrupt received; forcing immediate exit");
                std::process::exit(1);
            }
            Err(error) => {
                tracing::error!(%error, "failed to install second-interrupt signal handler");
            }
        }
    });
}
