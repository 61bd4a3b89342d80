use std::sync::Arc;

use indexmap::IndexMap;
use svcinit_adapters::{FakeProbeClient, FakeProcessAdapter};
use svcinit_core::test_support::{bare_service, service_with_deps, versioned};
use svcinit_core::{Label, ServiceSpecBuilder};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::*;

fn make_runner(
    adapter: Arc<FakeProcessAdapter>,
    probe: Arc<FakeProbeClient>,
    log_dir: &std::path::Path,
) -> (Runner, mpsc::Receiver<ServiceCrash>) {
    let (tx, rx) = mpsc::channel(16);
    let runner = Runner::new(
        adapter,
        probe,
        log_dir.to_path_buf(),
        true,
        Arc::new(std::collections::HashMap::new()),
        tx,
        CancellationToken::new(),
    );
    (runner, rx)
}

#[tokio::test]
async fn start_all_brings_every_service_up_in_dependency_order() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(true));
    let (runner, _rx) = make_runner(adapter, probe, dir.path());

    let upstream = bare_service("upstream");
    let downstream = service_with_deps("downstream", &["upstream"]);

    let mut specs = IndexMap::new();
    specs.insert(Label::from("upstream"), versioned(upstream));
    specs.insert(Label::from("downstream"), versioned(downstream));
    runner.load(specs);

    let critical_path = runner.start_all().await.unwrap();
    assert!(!critical_path.is_empty());

    assert_eq!(runner.instance(&Label::from("upstream")).unwrap().state(), svcinit_engine::State::Running);
    assert_eq!(runner.instance(&Label::from("downstream")).unwrap().state(), svcinit_engine::State::Running);
}

#[tokio::test]
async fn stop_all_kills_every_running_instance() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(true));
    let (runner, _rx) = make_runner(adapter, probe, dir.path());

    let mut specs = IndexMap::new();
    specs.insert(Label::from("svc"), versioned(bare_service("svc")));
    runner.load(specs);
    runner.start_all().await.unwrap();

    let states = runner.stop_all().await.unwrap();
    assert_eq!(states.get(&Label::from("svc")), Some(&svcinit_engine::State::Killed));
}

#[tokio::test]
async fn reaper_reports_a_crash_for_an_unkilled_exit() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(true));
    let (runner, mut rx) = make_runner(adapter.clone(), probe, dir.path());

    let mut specs = IndexMap::new();
    specs.insert(Label::from("svc"), versioned(bare_service("svc")));
    runner.load(specs);
    runner.start_all().await.unwrap();

    let instance = runner.instance(&Label::from("svc")).unwrap();
    let handle = instance.fake_process_handle().unwrap();
    handle.finish(Some(137));

    let crash = rx.recv().await.unwrap();
    assert_eq!(crash.label, Label::from("svc"));
    assert_eq!(crash.exit_code, Some(137));
}

#[tokio::test]
async fn update_specs_stops_removed_and_starts_added_labels() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(true));
    let (runner, _rx) = make_runner(adapter, probe, dir.path());

    let mut current = IndexMap::new();
    current.insert(Label::from("old"), versioned(bare_service("old")));
    runner.load(current);
    runner.start_all().await.unwrap();

    let mut next = IndexMap::new();
    next.insert(Label::from("new"), versioned(bare_service("new")));
    runner.update_specs(next, b"").await.unwrap();

    assert!(runner.instance(&Label::from("old")).is_none());
    assert!(runner.instance(&Label::from("new")).is_some());
}

#[tokio::test]
async fn update_specs_writes_reload_payload_for_hot_reloadable_version_bump() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(true));
    let (runner, _rx) = make_runner(adapter, probe, dir.path());

    let spec = ServiceSpecBuilder::default().label("svc").hot_reloadable(true).build();
    let mut current = IndexMap::new();
    current.insert(
        Label::from("svc"),
        svcinit_core::VersionedServiceSpec {
            spec: spec.clone(),
            resolved_exe: spec.exe.clone(),
            resolved_health_check: None,
            version: Some(vec![1]),
            color: 1,
        },
    );
    runner.load(current);
    runner.start_all().await.unwrap();

    let mut next = IndexMap::new();
    next.insert(
        Label::from("svc"),
        svcinit_core::VersionedServiceSpec {
            resolved_exe: spec.exe.clone(),
            resolved_health_check: None,
            version: Some(vec![2]),
            color: 1,
            spec,
        },
    );
    runner.update_specs(next, b"reload").await.unwrap();

    let instance = runner.instance(&Label::from("svc")).unwrap();
    let handle = instance.fake_process_handle().unwrap();
    assert_eq!(handle.stdin_lines(), vec![b"reload".to_vec()]);
    assert_eq!(instance.state(), svcinit_engine::State::Running);
}

#[tokio::test]
async fn wait_for_dependencies_healthy_returns_once_the_dependency_is_running() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(true));
    let (runner, _rx) = make_runner(adapter, probe, dir.path());

    let upstream = bare_service("upstream");
    let deferred = ServiceSpecBuilder::default()
        .label("deferred")
        .deps(vec![Label::from("upstream")])
        .deferred(true)
        .build();

    let mut specs = IndexMap::new();
    specs.insert(Label::from("upstream"), versioned(upstream));
    specs.insert(Label::from("deferred"), versioned(deferred));
    runner.load(specs);

    runner
        .instance(&Label::from("upstream"))
        .unwrap()
        .start(&std::collections::HashMap::new())
        .await
        .unwrap();

    runner.wait_for_dependencies_healthy(&Label::from("deferred")).await.unwrap();
}

#[test]
fn port_lookup_resolves_an_allocated_qualified_name() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = Arc::new(FakeProcessAdapter::new());
    let probe = Arc::new(FakeProbeClient::always(true));
    let (runner, _rx) = make_runner(adapter, probe, dir.path());

    let mut table = svcinit_core::PortTable::new();
    table.insert("svc".to_string(), 4242);
    runner.set_ports(table);

    assert_eq!(runner.port("svc"), Some(4242));
    assert_eq!(runner.port("missing"), None);
}
