// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The process adapter seam: spawning, signaling, and reaping child
//! processes (spec.md §4.3).
//!
//! Real processes go through `tokio::process::Command` with process-group
//! containment via `nix::sys::signal::killpg`; tests swap in
//! [`FakeProcessAdapter`], the same seam the daemon's agent/session layer
//! uses to keep lifecycle logic decoupled from the OS.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use nix::sys::signal::{self, Signal as NixSignal};
use nix::unistd::Pid;
use svcinit_core::ShutdownSignal;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};

/// Signal used to initiate or escalate shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSignal {
    Sigterm,
    Sigkill,
}

impl From<ProcessSignal> for NixSignal {
    fn from(s: ProcessSignal) -> Self {
        match s {
            ProcessSignal::Sigterm => NixSignal::SIGTERM,
            ProcessSignal::Sigkill => NixSignal::SIGKILL,
        }
    }
}

impl From<ShutdownSignal> for ProcessSignal {
    fn from(s: ShutdownSignal) -> Self {
        match s {
            ShutdownSignal::Sigterm => ProcessSignal::Sigterm,
            ShutdownSignal::Sigkill => ProcessSignal::Sigkill,
        }
    }
}

/// Captured stdout/stderr readers for a process spawned with
/// `capture_output`, handed off once to whoever tees them into a log.
pub struct ChildOutput {
    pub stdout: Box<dyn AsyncRead + Send + Unpin>,
    pub stderr: Box<dyn AsyncRead + Send + Unpin>,
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {exe}: {source}")]
    Spawn {
        exe: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to wait on pid {pid}: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::Error,
    },
    #[error("stdin write failed for pid {pid}: {source}")]
    StdinWrite {
        pid: i32,
        #[source]
        source: std::io::Error,
    },
}

/// Parameters for spawning one child process.
pub struct SpawnSpec {
    pub exe: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    /// Redirect stdout/stderr into pipes the caller tees into a log writer,
    /// rather than inheriting the supervisor's own stdio.
    pub capture_output: bool,
    /// Attach a pipe to stdin for later hot-reload payload injection.
    pub pipe_stdin: bool,
    /// Spawn into a new process group so the whole tree can be signaled
    /// together. Best-effort: unsupported platforms silently fall back to
    /// signaling the single pid.
    pub new_process_group: bool,
}

/// One running (or exited) child process.
#[async_trait]
pub trait SpawnedProcess: Send + Sync {
    fn pid(&self) -> i32;

    /// Downcast support for tests that need to drive a
    /// [`fake::FakeSpawnedProcess`] directly (e.g. to call `finish`).
    fn as_any(&self) -> &dyn std::any::Any;

    /// Take the captured stdout/stderr readers, if `capture_output` was
    /// requested at spawn time. `None` on the second call.
    fn take_output(&mut self) -> Option<ChildOutput>;

    /// Send `signal` to the process (or its whole group, if one was
    /// requested at spawn time). ESRCH ("no such process") is treated as
    /// success — the process is already gone.
    fn signal(&self, signal: ProcessSignal) -> Result<(), ProcessError>;

    /// Write `payload` followed by a newline to the child's stdin, if one
    /// was requested at spawn time. A no-op if there is no stdin pipe.
    async fn write_stdin(&mut self, payload: &[u8]) -> Result<(), ProcessError>;

    /// Await process exit and return its exit code (`None` if terminated
    /// by a signal). May only be called once.
    async fn wait(&mut self) -> Result<Option<i32>, ProcessError>;

    /// Non-blocking liveness check.
    fn try_wait(&mut self) -> Result<Option<i32>, ProcessError>;
}

/// Spawns and signals real OS processes.
#[async_trait]
pub trait ProcessAdapter: Send + Sync + 'static {
    async fn spawn(&self, spec: SpawnSpec) -> Result<Box<dyn SpawnedProcess>, ProcessError>;
}

/// Real process adapter, backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealProcessAdapter;

#[async_trait]
impl ProcessAdapter for RealProcessAdapter {
    async fn spawn(&self, spec: SpawnSpec) -> Result<Box<dyn SpawnedProcess>, ProcessError> {
        let mut cmd = tokio::process::Command::new(&spec.exe);
        cmd.args(&spec.args);
        for (k, v) in &spec.env {
            cmd.env(k, v);
        }
        if spec.capture_output {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
        if spec.pipe_stdin {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(Stdio::null());
        }
        if spec.new_process_group {
            cmd.process_group(0);
        }

        let child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            exe: spec.exe.display().to_string(),
            source,
        })?;

        let pid = child
            .id()
            .map(|id| id as i32)
            .ok_or_else(|| ProcessError::Wait {
                pid: -1,
                source: std::io::Error::other("child exited before its pid could be read"),
            })?;

        Ok(Box::new(RealSpawnedProcess {
            child,
            pid,
            group: spec.new_process_group,
        }))
    }
}

struct RealSpawnedProcess {
    child: Child,
    pid: i32,
    group: bool,
}

#[async_trait]
impl SpawnedProcess for RealSpawnedProcess {
    fn pid(&self) -> i32 {
        self.pid
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn take_output(&mut self) -> Option<ChildOutput> {
        let stdout = self.child.stdout.take()?;
        let stderr = self.child.stderr.take()?;
        Some(ChildOutput {
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
        })
    }

    fn signal(&self, signal: ProcessSignal) -> Result<(), ProcessError> {
        let target = if self.group { -self.pid } else { self.pid };
        match signal::kill(Pid::from_raw(target), NixSignal::from(signal)) {
            Ok(()) | Err(nix::Error::ESRCH) => Ok(()),
            Err(source) => Err(ProcessError::Signal { pid: self.pid, source }),
        }
    }

    async fn write_stdin(&mut self, payload: &[u8]) -> Result<(), ProcessError> {
        let Some(stdin) = self.child.stdin.as_mut() else {
            return Ok(());
        };
        write_line(stdin, payload)
            .await
            .map_err(|source| ProcessError::StdinWrite { pid: self.pid, source })
    }

    async fn wait(&mut self) -> Result<Option<i32>, ProcessError> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|source| ProcessError::Wait { pid: self.pid, source })?;
        Ok(status.code())
    }

    fn try_wait(&mut self) -> Result<Option<i32>, ProcessError> {
        let status = self
            .child
            .try_wait()
            .map_err(|source| ProcessError::Wait { pid: self.pid, source })?;
        Ok(status.and_then(|s| s.code()))
    }
}

async fn write_line(stdin: &mut ChildStdin, payload: &[u8]) -> std::io::Result<()> {
    stdin.write_all(payload).await?;
    stdin.write_all(b"\n").await?;
    stdin.flush().await
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    static NEXT_PID: AtomicI32 = AtomicI32::new(1000);

    /// Recorded spawn call, for test assertions.
    #[derive(Debug, Clone)]
    pub struct SpawnCall {
        pub exe: PathBuf,
        pub args: Vec<String>,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum FakeState {
        Running,
        Exited(Option<i32>),
    }

    struct FakeInner {
        state: FakeState,
        stdin: Vec<Vec<u8>>,
        signals_received: Vec<ProcessSignal>,
    }

    /// Fake process adapter: every spawned process starts "running" and
    /// stays that way until the test calls [`FakeSpawnedProcess::finish`]
    /// or the adapter is told to fail the next spawn.
    #[derive(Clone, Default)]
    pub struct FakeProcessAdapter {
        calls: Arc<Mutex<Vec<SpawnCall>>>,
        fail_next_spawn: Arc<Mutex<Option<String>>>,
    }

    impl FakeProcessAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<SpawnCall> {
            self.calls.lock().clone()
        }

        pub fn fail_next_spawn(&self, message: impl Into<String>) {
            *self.fail_next_spawn.lock() = Some(message.into());
        }
    }

    #[async_trait]
    impl ProcessAdapter for FakeProcessAdapter {
        async fn spawn(&self, spec: SpawnSpec) -> Result<Box<dyn SpawnedProcess>, ProcessError> {
            if let Some(message) = self.fail_next_spawn.lock().take() {
                return Err(ProcessError::Spawn {
                    exe: spec.exe.display().to_string(),
                    source: std::io::Error::other(message),
                });
            }
            self.calls.lock().push(SpawnCall {
                exe: spec.exe.clone(),
                args: spec.args.clone(),
            });
            let pid = NEXT_PID.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSpawnedProcess {
                pid,
                inner: Arc::new(Mutex::new(FakeInner {
                    state: FakeState::Running,
                    stdin: Vec::new(),
                    signals_received: Vec::new(),
                })),
            }))
        }
    }

    /// A fake spawned process. Tests that need to drive exit/signal
    /// behavior downcast the `Box<dyn SpawnedProcess>` returned from
    /// `spawn` via [`SpawnedProcess::as_any`] and call [`Self::handle`].
    pub struct FakeSpawnedProcess {
        pid: i32,
        inner: Arc<Mutex<FakeInner>>,
    }

    impl FakeSpawnedProcess {
        pub fn handle(&self) -> FakeProcessHandle {
            FakeProcessHandle { inner: self.inner.clone() }
        }
    }

    /// A cloneable handle tests can use to drive a fake process's exit
    /// and inspect signals/stdin it received.
    #[derive(Clone)]
    pub struct FakeProcessHandle {
        inner: Arc<Mutex<FakeInner>>,
    }

    impl FakeProcessHandle {
        pub fn finish(&self, exit_code: Option<i32>) {
            self.inner.lock().state = FakeState::Exited(exit_code);
        }

        pub fn signals_received(&self) -> Vec<ProcessSignal> {
            self.inner.lock().signals_received.clone()
        }

        pub fn stdin_lines(&self) -> Vec<Vec<u8>> {
            self.inner.lock().stdin.clone()
        }
    }

    #[async_trait]
    impl SpawnedProcess for FakeSpawnedProcess {
        fn pid(&self) -> i32 {
            self.pid
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn take_output(&mut self) -> Option<ChildOutput> {
            None
        }

        fn signal(&self, signal: ProcessSignal) -> Result<(), ProcessError> {
            let mut inner = self.inner.lock();
            inner.signals_received.push(signal);
            if signal == ProcessSignal::Sigkill && inner.state == FakeState::Running {
                inner.state = FakeState::Exited(None);
            }
            Ok(())
        }

        async fn write_stdin(&mut self, payload: &[u8]) -> Result<(), ProcessError> {
            self.inner.lock().stdin.push(payload.to_vec());
            Ok(())
        }

        async fn wait(&mut self) -> Result<Option<i32>, ProcessError> {
            loop {
                if let FakeState::Exited(code) = self.inner.lock().state {
                    return Ok(code);
                }
                tokio::time::sleep(std::time::Duration::from_millis(1)).await;
            }
        }

        fn try_wait(&mut self) -> Result<Option<i32>, ProcessError> {
            match self.inner.lock().state {
                FakeState::Exited(code) => Ok(Some(code.unwrap_or(0))),
                FakeState::Running => Ok(None),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcessAdapter, FakeProcessHandle, FakeSpawnedProcess, SpawnCall};

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
