// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service instance lifecycle: spawn, readiness, shutdown, restart
//! (spec.md §4.3, invariants I1-I4 in §3).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use svcinit_adapters::{LogWriter, ProbeClient, ProcessAdapter, ProcessSignal, SpawnSpec, SpawnedProcess};
use svcinit_core::{parse_duration, DurationField, Label, ServiceType, VersionedServiceSpec};
use tokio_util::sync::CancellationToken;

use crate::error::InstanceError;
use crate::once::SingleShot;
use crate::topo::Task;

/// Coarse lifecycle state, per I1 in spec.md §3. `killed`/`done`/
/// `healthcheck_attempted` are finer-grained flags tracked alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Unstarted,
    Starting,
    Running,
    Done,
    Killed,
}

struct Inner {
    state: State,
    child: Option<Box<dyn SpawnedProcess>>,
    log_writer: Option<LogWriter>,
    done: bool,
    killed: bool,
    healthcheck_attempted: bool,
    run_err: Option<Arc<str>>,
    start_time: Option<Instant>,
    start_duration: Option<Duration>,
    start_duration_locked: bool,
    exit_code: Option<i32>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            state: State::Unstarted,
            child: None,
            log_writer: None,
            done: false,
            killed: false,
            healthcheck_attempted: false,
            run_err: None,
            start_time: None,
            start_duration: None,
            start_duration_locked: false,
            exit_code: None,
        }
    }
}

/// Owns one child process (or, for a `group`, nothing at all).
pub struct ServiceInstance {
    spec: VersionedServiceSpec,
    process_adapter: Arc<dyn ProcessAdapter>,
    probe_client: Arc<dyn ProbeClient>,
    log_dir: PathBuf,
    under_test_harness: bool,
    start_guard: SingleShot,
    wait_guard: SingleShot,
    inner: Mutex<Inner>,
}

impl ServiceInstance {
    pub fn new(
        spec: VersionedServiceSpec,
        process_adapter: Arc<dyn ProcessAdapter>,
        probe_client: Arc<dyn ProbeClient>,
        log_dir: PathBuf,
        under_test_harness: bool,
    ) -> Self {
        Self {
            spec,
            process_adapter,
            probe_client,
            log_dir,
            under_test_harness,
            start_guard: SingleShot::new(),
            wait_guard: SingleShot::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn label(&self) -> &Label {
        self.spec.label()
    }

    pub fn spec(&self) -> &VersionedServiceSpec {
        &self.spec
    }

    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    pub fn killed(&self) -> bool {
        self.inner.lock().killed
    }

    pub fn done(&self) -> bool {
        self.inner.lock().done
    }

    pub fn healthcheck_attempted(&self) -> bool {
        self.inner.lock().healthcheck_attempted
    }

    /// Actively run this instance's readiness probe once and report
    /// whether it passed, rather than reporting the cached lifecycle
    /// `state` — a crashed-but-not-yet-reaped instance must not read back
    /// as healthy, and a service whose probe would now pass must not wait
    /// on the next scheduled poll to be reported so.
    pub async fn healthcheck(&self) -> bool {
        self.probe_client.check(&self.spec.spec.probe()).await
    }

    pub fn run_err(&self) -> Option<Arc<str>> {
        self.inner.lock().run_err.clone()
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.inner.lock().log_writer.as_ref().map(|w| w.path().to_path_buf())
    }

    pub fn start_time(&self) -> Option<Instant> {
        self.inner.lock().start_time
    }

    pub fn start_duration(&self) -> Option<Duration> {
        self.inner.lock().start_duration
    }

    /// Spawn (if not a `group`) and wait until readiness is decided. A
    /// second call after the first is a no-op — see `start_guard`.
    pub async fn start(&self, caller_env: &HashMap<String, String>) -> Result<(), InstanceError> {
        if self.spec.spec.ty == ServiceType::Group {
            self.inner.lock().state = State::Running;
            return Ok(());
        }
        if !self.start_guard.try_take() {
            return Ok(());
        }

        let start_time = Instant::now();
        {
            let mut inner = self.inner.lock();
            inner.state = State::Starting;
            inner.start_time = Some(start_time);
        }

        let result = self.spawn_and_wait_healthy(caller_env, start_time).await;
        if let Err(err) = &result {
            self.inner.lock().run_err = Some(Arc::from(err.to_string()));
        }
        result
    }

    async fn spawn_and_wait_healthy(
        &self,
        caller_env: &HashMap<String, String>,
        start_time: Instant,
    ) -> Result<(), InstanceError> {
        self.spawn_child(caller_env).await?;
        self.wait_until_healthy(start_time).await
    }

    async fn spawn_child(&self, caller_env: &HashMap<String, String>) -> Result<(), InstanceError> {
        let mut env = caller_env.clone();
        for (k, v) in &self.spec.spec.env {
            env.insert(k.clone(), v.clone());
        }

        let spawn_spec = SpawnSpec {
            exe: self.spec.resolved_exe.clone(),
            args: self.spec.spec.args.clone(),
            env,
            capture_output: true,
            pipe_stdin: self.spec.spec.hot_reloadable,
            new_process_group: !self.under_test_harness,
        };

        let mut process = self.process_adapter.spawn(spawn_spec).await?;

        let log_path = self.log_dir.join(format!("{}.log", self.label()));
        let writer = LogWriter::create(&log_path, self.label().as_str(), self.spec.color)
            .await
            .map_err(InstanceError::Log)?;

        if let Some(output) = process.take_output() {
            let stdout_writer = writer.clone();
            tokio::spawn(async move {
                let _ = stdout_writer.pump(output.stdout, tokio::io::stdout()).await;
            });
            let stderr_writer = writer.clone();
            tokio::spawn(async move {
                let _ = stderr_writer.pump(output.stderr, tokio::io::stderr()).await;
            });
        }

        let mut inner = self.inner.lock();
        inner.child = Some(process);
        inner.log_writer = Some(writer);
        Ok(())
    }

    async fn wait_until_healthy(&self, start_time: Instant) -> Result<(), InstanceError> {
        if self.spec.spec.ty == ServiceType::Task {
            let code = self.poll_until_exit().await;
            self.finish_readiness(start_time.elapsed());
            if code == Some(0) {
                Ok(())
            } else {
                Err(InstanceError::TaskFailed(code))
            }
        } else {
            self.poll_probe(start_time).await
        }
    }

    async fn poll_probe(&self, start_time: Instant) -> Result<(), InstanceError> {
        let label = self.label().as_str();
        let probe = self.spec.spec.probe();
        let interval = parse_duration(
            self.spec.spec.health_check_interval.as_deref(),
            DurationField::HealthCheckInterval,
            label,
        );
        let timeout = parse_duration(
            self.spec.spec.health_check_timeout.as_deref(),
            DurationField::HealthCheckTimeout,
            label,
        );
        let expected_start_duration = parse_duration(
            self.spec.spec.expected_start_duration.as_deref(),
            DurationField::ExpectedStartDuration,
            label,
        );
        let deadline = start_time + timeout;
        let mut attempt = 0u32;

        loop {
            self.inner.lock().healthcheck_attempted = true;
            if self.probe_client.check(&probe).await {
                self.finish_readiness(start_time.elapsed());
                self.inner.lock().state = State::Running;
                return Ok(());
            }

            attempt += 1;
            let elapsed = start_time.elapsed();
            if attempt > 1 {
                if elapsed < expected_start_duration {
                    tracing::debug!(label, attempt, "readiness probe not ready yet");
                } else {
                    tracing::warn!(
                        label,
                        attempt,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "readiness probe still not ready"
                    );
                }
            }

            if let Some(exit_code) = self.child_exit_code() {
                self.finish_readiness(start_time.elapsed());
                return Err(InstanceError::ProcessExited(exit_code));
            }
            if Instant::now() >= deadline {
                self.finish_readiness(start_time.elapsed());
                return Err(InstanceError::ReadinessTimeout);
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Records `start_duration` exactly once per lifecycle (I4). Does not
    /// touch `state`: a task's readiness conclusion is itself its exit, so
    /// `poll_until_exit` has already set the terminal state by the time
    /// this runs for a task; a service only becomes `Running` when its
    /// probe actually succeeds, handled by the caller.
    fn finish_readiness(&self, duration: Duration) {
        let mut inner = self.inner.lock();
        if !inner.start_duration_locked {
            inner.start_duration = Some(duration);
            inner.start_duration_locked = true;
        }
    }

    fn child_exit_code(&self) -> Option<Option<i32>> {
        let mut inner = self.inner.lock();
        if inner.done {
            return Some(None);
        }
        if let Some(child) = inner.child.as_mut() {
            if let Ok(Some(code)) = child.try_wait() {
                inner.done = true;
                return Some(Some(code));
            }
        }
        None
    }

    async fn poll_until_exit(&self) -> Option<i32> {
        loop {
            let code = {
                let mut inner = self.inner.lock();
                match inner.child.as_mut() {
                    Some(child) => match child.try_wait() {
                        Ok(code) => code,
                        Err(_) => None,
                    },
                    None => return None,
                }
            };
            if let Some(code) = code {
                let mut inner = self.inner.lock();
                inner.done = true;
                inner.state = State::Done;
                inner.child = None;
                inner.exit_code = Some(code);
                return Some(code);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// The reaper's single allowed wait on this instance's exit, used for
    /// crash detection after a service-typed instance is already healthy.
    /// `None` on every call after the first.
    pub async fn reap(&self) -> Option<i32> {
        if !self.wait_guard.try_take() {
            return None;
        }
        self.poll_until_exit().await
    }

    /// Observe this instance's exit without consuming the single `reap`
    /// invocation — polls the cached `done`/`exit_code` state set by
    /// whichever call actually performed the wait (readiness, `stop`, or
    /// `reap`). Returns `None` on timeout or if the instance never exits.
    pub async fn wait_for_exit(&self, timeout: Option<Duration>) -> Option<i32> {
        let deadline = timeout.map(|d| Instant::now() + d);
        loop {
            {
                let inner = self.inner.lock();
                if inner.done {
                    return inner.exit_code;
                }
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return None;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Write a hot-reload payload to the child's stdin, if one was
    /// attached at spawn time.
    pub async fn write_reload_payload(&self, payload: &[u8]) -> Result<(), InstanceError> {
        let mut child = { self.inner.lock().child.take() };
        let result = match child.as_mut() {
            Some(child) => child.write_stdin(payload).await.map_err(InstanceError::from),
            None => Ok(()),
        };
        self.inner.lock().child = child;
        result
    }

    fn send_signal(&self, signal: ProcessSignal) -> Result<(), InstanceError> {
        let inner = self.inner.lock();
        match inner.child.as_ref() {
            Some(child) => child.signal(signal).map_err(InstanceError::from),
            None => Ok(()),
        }
    }

    fn close_log_writer(&self) {
        self.inner.lock().log_writer = None;
    }

    /// Shutdown escalation per spec.md §4.3: `signal` defaults to the
    /// spec's configured `shutdown_signal`.
    pub async fn stop(&self, signal: Option<ProcessSignal>) -> Result<(), InstanceError> {
        if self.spec.spec.ty == ServiceType::Group {
            return Ok(());
        }
        if self.inner.lock().child.is_none() {
            return Ok(());
        }

        let signal = signal.unwrap_or_else(|| self.spec.spec.shutdown_signal.into());
        self.send_signal(signal)?;
        self.inner.lock().killed = true;

        match signal {
            ProcessSignal::Sigkill => {
                self.poll_until_exit().await;
            }
            ProcessSignal::Sigterm => {
                let timeout = parse_duration(
                    self.spec.spec.shutdown_timeout.as_deref(),
                    DurationField::ShutdownTimeout,
                    self.label().as_str(),
                );
                if tokio::time::timeout(timeout, self.poll_until_exit()).await.is_err() {
                    self.send_signal(ProcessSignal::Sigkill)?;
                    self.poll_until_exit().await;
                    if self.spec.spec.enforce_forceful_shutdown {
                        self.close_log_writer();
                        return Err(InstanceError::ForcedShutdown {
                            label: self.label().clone(),
                            timeout,
                        });
                    }
                }
            }
        }

        self.inner.lock().state = State::Killed;
        self.close_log_writer();
        Ok(())
    }

    /// Discard the old child handle and re-run spawn + readiness,
    /// preserving `start_duration` until the new lifecycle overwrites it.
    pub async fn restart(&self, caller_env: &HashMap<String, String>) -> Result<(), InstanceError> {
        {
            let mut inner = self.inner.lock();
            inner.child = None;
            inner.done = false;
            inner.killed = false;
            inner.healthcheck_attempted = false;
            inner.run_err = None;
            inner.start_duration_locked = false;
            inner.exit_code = None;
            inner.state = State::Unstarted;
        }
        self.start_guard.rearm();
        self.wait_guard.rearm();
        self.start(caller_env).await
    }

    #[cfg(any(test, feature = "test-support"))]
    pub fn fake_process_handle(&self) -> Option<svcinit_adapters::FakeProcessHandle> {
        let inner = self.inner.lock();
        inner
            .child
            .as_ref()
            .and_then(|c| c.as_any().downcast_ref::<svcinit_adapters::FakeSpawnedProcess>())
            .map(|f| f.handle())
    }
}

/// Wraps a [`ServiceInstance`] as a [`Task`] for the forward (startup)
/// topological run.
pub struct StartTask {
    instance: Arc<ServiceInstance>,
    caller_env: Arc<HashMap<String, String>>,
}

impl StartTask {
    pub fn new(instance: Arc<ServiceInstance>, caller_env: Arc<HashMap<String, String>>) -> Self {
        Self { instance, caller_env }
    }
}

#[async_trait]
impl Task for StartTask {
    type Error = InstanceError;

    fn key(&self) -> Label {
        self.instance.label().clone()
    }

    fn dependencies(&self) -> Vec<Label> {
        self.instance.spec().spec.deps.clone()
    }

    async fn run(&self, _cancel: CancellationToken) -> Result<(), InstanceError> {
        tracing::info!(label = %self.instance.label(), "starting");
        self.instance.start(&self.caller_env).await
    }

    fn start_time(&self) -> Option<Instant> {
        self.instance.start_time()
    }

    fn duration(&self) -> Option<Duration> {
        self.instance.start_duration()
    }
}

/// Wraps a [`ServiceInstance`] as a [`Task`] for the reversed (teardown)
/// topological run.
pub struct StopTask {
    instance: Arc<ServiceInstance>,
    signal: ProcessSignal,
}

impl StopTask {
    pub fn new(instance: Arc<ServiceInstance>, signal: ProcessSignal) -> Self {
        Self { instance, signal }
    }
}

#[async_trait]
impl Task for StopTask {
    type Error = InstanceError;

    fn key(&self) -> Label {
        self.instance.label().clone()
    }

    fn dependencies(&self) -> Vec<Label> {
        self.instance.spec().spec.deps.clone()
    }

    async fn run(&self, _cancel: CancellationToken) -> Result<(), InstanceError> {
        tracing::info!(label = %self.instance.label(), "stopping");
        self.instance.stop(Some(self.signal)).await
    }

    fn start_time(&self) -> Option<Instant> {
        self.instance.start_time()
    }

    fn duration(&self) -> Option<Duration> {
        self.instance.start_duration()
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
