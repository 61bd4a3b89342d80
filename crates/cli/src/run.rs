// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level orchestration (spec.md §2 "Control flow"): load the spec
//! file, allocate ports, start every instance, run the wrapped test
//! binary (or stay resident), and tear down.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use svcinit_adapters::{RealProbeClient, RealProcessAdapter};
use svcinit_core::Label;
use svcinit_daemon::{augment_specs, env, server, Environment, Runner, ServiceCrash};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::args::Flags;
use crate::report;
use crate::signals;

pub async fn run(flags: Flags, test_args: Vec<String>) -> Result<i32> {
    let spec_path = flags
        .definitions_path
        .or_else(env::service_specs_path)
        .ok_or_else(|| {
            anyhow!(
                "no service spec path given (pass --svc.definitions-path or set \
                 SVCINIT_SERVICE_SPECS_RLOCATION_PATH)"
            )
        })?;

    let raw_specs = svcinit_wire::read_spec_file(&spec_path)
        .with_context(|| format!("loading service spec file {spec_path}"))?;

    let hermetic_default =
        std::env::var("TEST_TMPDIR").map(PathBuf::from).unwrap_or_else(|_| std::env::temp_dir());
    let tmpdir = env::tmpdir(&hermetic_default);
    let socket_dir = env::socket_dir(&hermetic_default);
    std::fs::create_dir_all(&tmpdir).with_context(|| format!("creating TMPDIR {}", tmpdir.display()))?;
    std::fs::create_dir_all(&socket_dir)
        .with_context(|| format!("creating SOCKET_DIR {}", socket_dir.display()))?;

    // Reserve the control-plane port before any service port, per the
    // Open Question resolution in spec.md §9 / SPEC_FULL.md §11.
    let svcctl_std_listener =
        std::net::TcpListener::bind("127.0.0.1:0").context("reserving the control-plane port")?;
    svcctl_std_listener.set_nonblocking(true)?;
    let svcctl_port = svcctl_std_listener.local_addr()?.port();
    let svcctl_listener = tokio::net::TcpListener::from_std(svcctl_std_listener)
        .context("handing the reserved control-plane socket to the async runtime")?;

    let environment = Environment {
        socket_dir,
        tmpdir: tmpdir.clone(),
        test_tmpdir: hermetic_default,
        svcctl_port,
        get_assigned_port_bin: std::env::var("GET_ASSIGNED_PORT_BIN").ok().map(PathBuf::from),
    };

    let augmented = augment_specs(raw_specs, &environment).context("augmenting service specs")?;
    let log_dir = tmpdir.join("logs");
    std::fs::create_dir_all(&log_dir).with_context(|| format!("creating log dir {}", log_dir.display()))?;

    let cancel = CancellationToken::new();
    let (crash_tx, mut crash_rx) = mpsc::channel::<ServiceCrash>(64);

    let caller_env = Arc::new(environment.child_env(&augmented.ports));
    let runner = Arc::new(Runner::new(
        Arc::new(RealProcessAdapter),
        Arc::new(RealProbeClient::new()),
        log_dir,
        env::bazel_test(),
        caller_env.clone(),
        crash_tx.clone(),
        cancel.clone(),
    ));
    runner.set_ports(augmented.ports);
    runner.load(augmented.specs);
    // Listeners for `so_reuseport_aware` services stay open until the
    // children that bind with SO_REUSEPORT have started; drop only once
    // the run is over.
    let _retained_listeners = augmented.retained_listeners;

    tracing::info!(svcctl_port, "svcctl control-plane server listening");
    let app = server::router(runner.clone());
    tokio::spawn(async move {
        if let Err(error) = axum::serve(svcctl_listener, app).await {
            tracing::error!(%error, "control-plane server exited");
        }
    });

    let critical_path = match runner.start_all().await {
        Ok(path) => path,
        Err(error) => {
            tracing::error!(%error, "StartAll failed; stopping the partially-started set");
            cancel.cancel();
            let _ = runner.stop_all().await;
            return Err(error.into());
        }
    };

    let one_shot = !test_args.is_empty() && !env::keep_services_up() && !env::ibazel_notify_changes();
    let hot_reload = env::ibazel_notify_changes();

    if hot_reload {
        spawn_hot_reload_loop(spec_path.clone(), environment.clone(), runner.clone());
    }

    let (exit_code, test_binary_report) = if one_shot {
        let (code, elapsed) = drive_one_shot(&test_args, &caller_env, &mut crash_rx, &cancel).await?;
        (code, Some((test_args[0].as_str(), elapsed)))
    } else {
        (drive_interactive(&mut crash_rx, &cancel).await?, None)
    };

    cancel.cancel();
    let _ = runner.stop_all().await;

    let startup_times: Vec<(Label, Option<Duration>)> = runner
        .labels()
        .into_iter()
        .filter_map(|label| runner.instance(&label).map(|instance| (label, instance.start_duration())))
        .collect();
    report::print_report(&critical_path, &startup_times, test_binary_report);

    Ok(exit_code)
}

async fn drive_one_shot(
    test_args: &[String],
    caller_env: &HashMap<String, String>,
    crash_rx: &mut mpsc::Receiver<ServiceCrash>,
    cancel: &CancellationToken,
) -> Result<(i32, Duration)> {
    let mut cmd = tokio::process::Command::new(&test_args[0]);
    cmd.args(&test_args[1..]);
    for (key, value) in caller_env {
        cmd.env(key, value);
    }

    let start = Instant::now();
    let mut child =
        cmd.spawn().with_context(|| format!("spawning wrapped test binary {}", test_args[0]))?;

    tokio::select! {
        status = child.wait() => {
            let status = status.context("waiting for the wrapped test binary")?;
            let elapsed = start.elapsed();
            tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "test binary finished");
            Ok((status.code().unwrap_or(1), elapsed))
        }
        Some(crash) = crash_rx.recv() => {
            tracing::error!(label = %crash.label, exit_code = ?crash.exit_code, "uncaught service crash during one-shot run");
            let _ = child.kill().await;
            cancel.cancel();
            Ok((1, start.elapsed()))
        }
        result = signals::wait_for_interrupt() => {
            log_interrupt_outcome(result);
            signals::spawn_force_exit_on_second_interrupt();
            let _ = child.kill().await;
            cancel.cancel();
            Ok((1, start.elapsed()))
        }
    }
}

async fn drive_interactive(crash_rx: &mut mpsc::Receiver<ServiceCrash>, cancel: &CancellationToken) -> Result<i32> {
    loop {
        tokio::select! {
            Some(crash) = crash_rx.recv() => {
                tracing::warn!(label = %crash.label, exit_code = ?crash.exit_code, "service crash (interactive mode; not fatal)");
            }
            result = signals::wait_for_interrupt() => {
                log_interrupt_outcome(result);
                signals::spawn_force_exit_on_second_interrupt();
                cancel.cancel();
                return Ok(0);
            }
        }
    }
}

fn log_interrupt_outcome(result: std::io::Result<()>) {
    match result {
        Ok(()) => tracing::warn!("interrupt received; stopping"),
        Err(error) => tracing::error!(%error, "failed to install interrupt signal handler; stopping anyway"),
    }
}

fn spawn_hot_reload_loop(spec_path: String, environment: Environment, runner: Arc<Runner>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    // `lines()` strips the trailing newline; reloadable
                    // services expect the notification byte-for-byte,
                    // newline included.
                    let mut payload = line.into_bytes();
                    payload.push(b'\n');
                    if let Err(error) = reload_once(&spec_path, &environment, &runner, &payload).await {
                        tracing::error!(%error, "hot reload failed");
                    }
                }
                Ok(None) => break,
                Err(error) => {
                    tracing::error!(%error, "reading hot-reload notification from stdin");
                    break;
                }
            }
        }
    });
}

async fn reload_once(
    spec_path: &str,
    environment: &Environment,
    runner: &Arc<Runner>,
    payload: &[u8],
) -> Result<()> {
    let raw = svcinit_wire::read_spec_file(spec_path)?;
    let augmented = augment_specs(raw, environment)?;
    runner.set_ports(augmented.ports);
    runner.update_specs_and_restart(augmented.specs, payload).await?;
    Ok(())
}
