// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The coordinator: owns every [`ServiceInstance`], drives forward/reversed
//! topological runs, and applies reconciliation diffs (spec.md §4.2, §4.4).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::RwLock;
use svcinit_adapters::{ProbeClient, ProcessAdapter, ProcessSignal};
use svcinit_core::{reconcile, Label, PortTable, ServiceType, VersionedServiceSpec};
use svcinit_engine::{ServiceInstance, StartTask, State, StopTask, Task, TopoRunner};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::DaemonError;

/// A service-typed instance's run ended without `stop` having been called
/// on it, forwarded to whatever renders the final report or triggers a
/// one-shot-mode force exit (spec.md §4.4, invariant I2).
#[derive(Debug, Clone)]
pub struct ServiceCrash {
    pub label: Label,
    pub exit_code: Option<i32>,
    pub run_err: Option<Arc<str>>,
}

/// Coordinates the full set of service instances for one applied spec
/// snapshot, and the transition to the next one.
pub struct Runner {
    instances: RwLock<IndexMap<Label, Arc<ServiceInstance>>>,
    applied_specs: RwLock<IndexMap<Label, VersionedServiceSpec>>,
    ports: RwLock<PortTable>,
    process_adapter: Arc<dyn ProcessAdapter>,
    probe_client: Arc<dyn ProbeClient>,
    log_dir: PathBuf,
    under_test_harness: bool,
    caller_env: Arc<HashMap<String, String>>,
    crash_tx: mpsc::Sender<ServiceCrash>,
    cancel: CancellationToken,
}

impl Runner {
    pub fn new(
        process_adapter: Arc<dyn ProcessAdapter>,
        probe_client: Arc<dyn ProbeClient>,
        log_dir: PathBuf,
        under_test_harness: bool,
        caller_env: Arc<HashMap<String, String>>,
        crash_tx: mpsc::Sender<ServiceCrash>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            instances: RwLock::new(IndexMap::new()),
            applied_specs: RwLock::new(IndexMap::new()),
            ports: RwLock::new(PortTable::new()),
            process_adapter,
            probe_client,
            log_dir,
            under_test_harness,
            caller_env,
            crash_tx,
            cancel,
        }
    }

    pub fn instance(&self, label: &Label) -> Option<Arc<ServiceInstance>> {
        self.instances.read().get(label).cloned()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.instances.read().keys().cloned().collect()
    }

    pub fn set_ports(&self, ports: PortTable) {
        *self.ports.write() = ports;
    }

    /// Look up a qualified port name (`GET /v0/port`) in the read-only
    /// port table (spec.md §4.5, §6 "Supplemented Features").
    pub fn port(&self, qualified_name: &str) -> Option<u16> {
        self.ports.read().get(qualified_name)
    }

    fn build_instance(&self, spec: VersionedServiceSpec) -> Arc<ServiceInstance> {
        Arc::new(ServiceInstance::new(
            spec,
            self.process_adapter.clone(),
            self.probe_client.clone(),
            self.log_dir.clone(),
            self.under_test_harness,
        ))
    }

    /// Replace the current instance set with a freshly built one for
    /// `specs` (no reconciliation — used for the very first load).
    pub fn load(&self, specs: IndexMap<Label, VersionedServiceSpec>) {
        let mut instances = self.instances.write();
        instances.clear();
        for (label, spec) in &specs {
            instances.insert(label.clone(), self.build_instance(spec.clone()));
        }
        *self.applied_specs.write() = specs;
    }

    /// Start every instance in dependency order, spawning a reaper per
    /// service-typed instance that forwards unexpected exits to the crash
    /// channel (spec.md §4.2 "forward run", §4.4).
    pub async fn start_all(&self) -> Result<Vec<(Label, Duration)>, DaemonError> {
        let instances: Vec<Arc<ServiceInstance>> = self.instances.read().values().cloned().collect();
        let tasks: Vec<Arc<dyn Task<Error = svcinit_engine::InstanceError>>> = instances
            .iter()
            .map(|i| Arc::new(StartTask::new(i.clone(), self.caller_env.clone())) as Arc<dyn Task<Error = _>>)
            .collect();

        let report = TopoRunner::run(tasks, false, self.cancel.clone()).await?;

        let mut failed = false;
        for outcome in report.outcomes.values() {
            if !outcome.is_ok() {
                failed = true;
            }
        }

        for instance in &instances {
            if instance.spec().spec.ty == ServiceType::Service && instance.state() == State::Running {
                self.spawn_reaper(instance.clone());
            }
        }

        if failed {
            return Err(DaemonError::StartFailed);
        }
        Ok(report.critical_path)
    }

    /// Start a single already-built instance (control plane `GET
    /// /v0/start`, deferred services) and, if it's a service, spawn its
    /// reaper exactly as [`start_all`](Self::start_all) does.
    pub async fn start_one(&self, label: &Label) -> Result<(), DaemonError> {
        let instance = self.instance(label).ok_or_else(|| DaemonError::UnknownService(label.clone()))?;
        instance.start(&self.caller_env).await?;
        if instance.spec().spec.ty == ServiceType::Service && instance.state() == State::Running {
            self.spawn_reaper(instance);
        }
        Ok(())
    }

    fn spawn_reaper(&self, instance: Arc<ServiceInstance>) {
        let crash_tx = self.crash_tx.clone();
        tokio::spawn(async move {
            let exit_code = instance.reap().await;
            if instance.killed() {
                return;
            }
            let crash = ServiceCrash {
                label: instance.label().clone(),
                exit_code,
                run_err: instance.run_err(),
            };
            let _ = crash_tx.send(crash).await;
        });
    }

    /// Stop every instance in reverse dependency order (spec.md §4.2
    /// "reversed run").
    pub async fn stop_all(&self) -> Result<IndexMap<Label, State>, DaemonError> {
        let instances: Vec<Arc<ServiceInstance>> = self.instances.read().values().cloned().collect();
        self.stop_instances(instances).await
    }

    async fn stop_instances(
        &self,
        instances: Vec<Arc<ServiceInstance>>,
    ) -> Result<IndexMap<Label, State>, DaemonError> {
        let tasks: Vec<Arc<dyn Task<Error = svcinit_engine::InstanceError>>> = instances
            .iter()
            .map(|i| {
                let signal: ProcessSignal = i.spec().spec.shutdown_signal.into();
                Arc::new(StopTask::new(i.clone(), signal)) as Arc<dyn Task<Error = _>>
            })
            .collect();

        TopoRunner::run(tasks, true, self.cancel.clone()).await?;

        Ok(instances.iter().map(|i| (i.label().clone(), i.state())).collect())
    }

    /// Stop a single instance by label (control plane `GET /v0/kill`).
    pub async fn stop_one(&self, label: &Label, signal: Option<ProcessSignal>) -> Result<(), DaemonError> {
        let instance = self.instance(label).ok_or_else(|| DaemonError::UnknownService(label.clone()))?;
        instance.stop(signal).await?;
        Ok(())
    }

    /// Apply a reconciliation diff against a freshly augmented spec set:
    /// stop removed/changed labels, build fresh instances for `start`
    /// labels, and write the reload payload to every `reload` label
    /// (spec.md §3, §4.4).
    pub async fn update_specs(
        &self,
        next: IndexMap<Label, VersionedServiceSpec>,
        reload_payload: &[u8],
    ) -> Result<(), DaemonError> {
        let current = self.applied_specs.read().clone();
        let diff = reconcile(&current, &next);

        let to_stop: Vec<Arc<ServiceInstance>> =
            diff.stop.iter().filter_map(|label| self.instance(label)).collect();
        self.stop_instances(to_stop).await?;

        {
            let mut instances = self.instances.write();
            for label in &diff.stop {
                instances.shift_remove(label);
            }
            for label in &diff.start {
                if let Some(spec) = next.get(label) {
                    instances.insert(label.clone(), self.build_instance(spec.clone()));
                }
            }
        }

        for label in &diff.reload {
            if let Some(instance) = self.instance(label) {
                instance.write_reload_payload(reload_payload).await?;
            }
        }

        *self.applied_specs.write() = next;
        Ok(())
    }

    /// [`update_specs`](Self::update_specs) followed by starting every
    /// newly added instance, per the hot-reload protocol's "restart" step
    /// for non-hot-reloadable services (spec.md §6).
    pub async fn update_specs_and_restart(
        &self,
        next: IndexMap<Label, VersionedServiceSpec>,
        reload_payload: &[u8],
    ) -> Result<Vec<(Label, Duration)>, DaemonError> {
        self.update_specs(next, reload_payload).await?;
        self.start_all().await
    }

    /// Poll a deferred service's non-deferred dependencies until every one
    /// is `Running`, or time out (spec.md §4.5 `GET /v0/start`).
    pub async fn wait_for_dependencies_healthy(&self, label: &Label) -> Result<(), DaemonError> {
        const POLL_INTERVAL: Duration = Duration::from_millis(50);
        const MAX_WAIT: Duration = Duration::from_secs(30);

        let instance = self.instance(label).ok_or_else(|| DaemonError::UnknownService(label.clone()))?;
        let deps = instance.spec().spec.deps.clone();

        let deadline = tokio::time::Instant::now() + MAX_WAIT;
        for dep in deps {
            let Some(dep_instance) = self.instance(&dep) else { continue };
            loop {
                if dep_instance.state() == State::Running {
                    break;
                }
                if tokio::time::Instant::now() >= deadline {
                    return Err(DaemonError::DependencyNotReady(dep, label.clone()));
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
