// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::collections::HashMap;
use std::sync::Arc;

use svcinit_adapters::{FakeProbeClient, FakeProcessAdapter, ProcessSignal};
use svcinit_core::test_support::{bare_service, versioned};
use svcinit_core::{ServiceSpec, ServiceType};

use super::*;

fn make_instance(
    edit: impl FnOnce(&mut ServiceSpec),
    process_adapter: Arc<FakeProcessAdapter>,
    probe_client: Arc<FakeProbeClient>,
    log_dir: &std::path::Path,
) -> Arc<ServiceInstance> {
    let mut spec = bare_service("web");
    edit(&mut spec);
    Arc::new(ServiceInstance::new(
        versioned(spec),
        process_adapter,
        probe_client,
        log_dir.to_path_buf(),
        true,
    ))
}

#[tokio::test]
async fn group_instance_starts_trivially() {
    let dir = tempfile::tempdir().unwrap();
    let instance = make_instance(
        |s| s.ty = ServiceType::Group,
        Arc::new(FakeProcessAdapter::new()),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );

    instance.start(&HashMap::new()).await.unwrap();

    assert_eq!(instance.state(), State::Running);
}

#[tokio::test]
async fn task_instance_waits_for_successful_exit() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let instance = make_instance(
        |s| s.ty = ServiceType::Task,
        adapter.clone(),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );

    let running = instance.clone();
    let start_handle = tokio::spawn(async move { running.start(&HashMap::new()).await });

    let handle = loop {
        if let Some(handle) = instance.fake_process_handle() {
            break handle;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    };
    handle.finish(Some(0));

    start_handle.await.unwrap().unwrap();
    assert_eq!(instance.state(), State::Done);
}

#[tokio::test]
async fn task_instance_surfaces_nonzero_exit_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let instance = make_instance(
        |s| s.ty = ServiceType::Task,
        adapter.clone(),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );

    let running = instance.clone();
    let start_handle = tokio::spawn(async move { running.start(&HashMap::new()).await });

    let handle = loop {
        if let Some(handle) = instance.fake_process_handle() {
            break handle;
        }
        tokio::time::sleep(std::time::Duration::from_millis(1)).await;
    };
    handle.finish(Some(1));

    let result = start_handle.await.unwrap();
    assert!(matches!(result, Err(InstanceError::TaskFailed(Some(1)))));
    assert!(instance.run_err().is_some());
}

#[tokio::test]
async fn service_instance_becomes_ready_once_probe_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(false));
    probe.push_result(false);
    probe.push_result(true);
    let instance = make_instance(
        |s| {
            s.ty = ServiceType::Service;
            s.http_health_check_address = Some("127.0.0.1:1".to_string());
        },
        adapter.clone(),
        probe,
        dir.path(),
    );

    instance.start(&HashMap::new()).await.unwrap();

    assert_eq!(instance.state(), State::Running);
    assert!(instance.healthcheck_attempted());
    assert!(instance.start_duration().is_some());
}

#[tokio::test]
async fn start_is_idempotent_after_first_call() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let instance = make_instance(
        |s| s.ty = ServiceType::Service,
        adapter.clone(),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );

    instance.start(&HashMap::new()).await.unwrap();
    instance.start(&HashMap::new()).await.unwrap();

    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn stop_sends_configured_signal_and_marks_killed() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let instance = make_instance(
        |s| s.ty = ServiceType::Service,
        adapter.clone(),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );
    instance.start(&HashMap::new()).await.unwrap();
    let handle = instance.fake_process_handle().unwrap();

    instance.stop(Some(ProcessSignal::Sigkill)).await.unwrap();

    assert!(instance.killed());
    assert_eq!(handle.signals_received(), vec![ProcessSignal::Sigkill]);
    assert_eq!(instance.state(), State::Killed);
}

#[tokio::test]
async fn stop_without_a_child_is_a_no_op() {
    let dir = tempfile::tempdir().unwrap();
    let instance = make_instance(
        |s| s.ty = ServiceType::Service,
        Arc::new(FakeProcessAdapter::new()),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );

    instance.stop(Some(ProcessSignal::Sigkill)).await.unwrap();

    assert!(!instance.killed());
}

#[tokio::test]
async fn restart_respawns_with_a_fresh_process() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let instance = make_instance(
        |s| s.ty = ServiceType::Service,
        adapter.clone(),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );

    instance.start(&HashMap::new()).await.unwrap();
    instance.stop(Some(ProcessSignal::Sigkill)).await.unwrap();
    instance.restart(&HashMap::new()).await.unwrap();

    assert_eq!(adapter.calls().len(), 2);
    assert_eq!(instance.state(), State::Running);
}

#[tokio::test]
async fn wait_for_exit_observes_a_reap_performed_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let instance = make_instance(
        |s| s.ty = ServiceType::Service,
        adapter.clone(),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );
    instance.start(&HashMap::new()).await.unwrap();
    let handle = instance.fake_process_handle().unwrap();
    handle.finish(Some(7));
    instance.reap().await;

    let code = instance.wait_for_exit(Some(std::time::Duration::from_millis(200))).await;

    assert_eq!(code, Some(7));
}

#[tokio::test]
async fn reap_returns_none_after_the_first_call() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let instance = make_instance(
        |s| s.ty = ServiceType::Service,
        adapter.clone(),
        Arc::new(FakeProbeClient::always(true)),
        dir.path(),
    );
    instance.start(&HashMap::new()).await.unwrap();
    let handle = instance.fake_process_handle().unwrap();
    handle.finish(Some(0));

    let first = instance.reap().await;
    let second = instance.reap().await;

    assert_eq!(first, Some(0));
    assert_eq!(second, None);
}
