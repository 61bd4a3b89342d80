use std::path::PathBuf;

use indexmap::IndexMap;
use svcinit_core::{Label, ServiceSpecBuilder};

use super::*;

fn test_env(dir: &std::path::Path) -> Environment {
    Environment {
        socket_dir: dir.join("sock"),
        tmpdir: dir.join("tmp"),
        test_tmpdir: dir.join("test-tmp"),
        svcctl_port: 9999,
        get_assigned_port_bin: None,
    }
}

#[test]
fn autoassign_port_is_allocated_and_substituted_into_args() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ServiceSpecBuilder::default()
        .label("web")
        .autoassign_port(true)
        .args(vec!["--port".to_string(), "$${PORT}".to_string()])
        .build();

    let mut raw = IndexMap::new();
    raw.insert(Label::from("web"), spec);

    let augmented = augment_specs(raw, &test_env(dir.path())).unwrap();

    let port = augmented.ports.get_for(&Label::from("web"), None).unwrap();
    let versioned = &augmented.specs[&Label::from("web")];
    assert_eq!(versioned.spec.args, vec!["--port".to_string(), port.to_string()]);
}

#[test]
fn named_port_is_addressable_via_its_qualified_name() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ServiceSpecBuilder::default()
        .label("web")
        .named_ports(vec!["admin".to_string()])
        .env(IndexMap::from([("ADMIN_ADDR".to_string(), "127.0.0.1:$${web:admin}".to_string())]))
        .build();

    let mut raw = IndexMap::new();
    raw.insert(Label::from("web"), spec);

    let augmented = augment_specs(raw, &test_env(dir.path())).unwrap();

    let port = augmented.ports.get_for(&Label::from("web"), Some("admin")).unwrap();
    let versioned = &augmented.specs[&Label::from("web")];
    assert_eq!(versioned.spec.env.get("ADMIN_ADDR"), Some(&format!("127.0.0.1:{port}")));
}

#[test]
fn port_alias_resolves_to_the_source_services_default_port() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = ServiceSpecBuilder::default().label("upstream").autoassign_port(true).build();
    let proxy = ServiceSpecBuilder::default()
        .label("proxy")
        .port_aliases(IndexMap::from([("backend".to_string(), Label::from("upstream"))]))
        .build();

    let mut raw = IndexMap::new();
    raw.insert(Label::from("upstream"), upstream);
    raw.insert(Label::from("proxy"), proxy);

    let augmented = augment_specs(raw, &test_env(dir.path())).unwrap();

    let upstream_port = augmented.ports.get_for(&Label::from("upstream"), None).unwrap();
    assert_eq!(augmented.ports.get("proxy:backend"), Some(upstream_port));
}

#[test]
fn version_file_contents_are_read_into_the_versioned_spec() {
    let dir = tempfile::tempdir().unwrap();
    let version_path = dir.path().join("VERSION");
    std::fs::write(&version_path, b"abc123").unwrap();

    let spec = ServiceSpecBuilder::default().label("web").version_file(version_path).build();
    let mut raw = IndexMap::new();
    raw.insert(Label::from("web"), spec);

    let augmented = augment_specs(raw, &test_env(dir.path())).unwrap();

    assert_eq!(augmented.specs[&Label::from("web")].version, Some(b"abc123".to_vec()));
}

#[test]
fn missing_version_file_surfaces_as_a_daemon_error() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ServiceSpecBuilder::default()
        .label("web")
        .version_file(dir.path().join("does-not-exist"))
        .build();
    let mut raw = IndexMap::new();
    raw.insert(Label::from("web"), spec);

    let result = augment_specs(raw, &test_env(dir.path()));

    assert!(matches!(result, Err(DaemonError::VersionFile { .. })));
}

#[test]
fn tmpdir_and_socket_dir_placeholders_are_substituted() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ServiceSpecBuilder::default()
        .label("web")
        .args(vec!["--tmp=$${TMPDIR}".to_string(), "--sock=$${SOCKET_DIR}".to_string()])
        .build();

    let mut raw = IndexMap::new();
    raw.insert(Label::from("web"), spec.clone());
    let env = test_env(dir.path());
    let augmented = augment_specs(raw, &env).unwrap();

    let versioned = &augmented.specs[&Label::from("web")];
    assert_eq!(
        versioned.spec.args,
        vec![format!("--tmp={}", env.tmpdir.display()), format!("--sock={}", env.socket_dir.display())]
    );
}

#[tokio::test]
async fn spawn_runtime_event_forwarder_relays_crashes_to_the_sink() {
    use crate::runner::ServiceCrash;

    let (tx, rx) = tokio::sync::mpsc::channel(4);
    let (sink_tx, mut sink_rx) = tokio::sync::mpsc::channel(4);
    spawn_runtime_event_forwarder(rx, sink_tx);

    tx.send(ServiceCrash { label: Label::from("web"), exit_code: Some(1), run_err: None }).await.unwrap();
    drop(tx);

    let forwarded = sink_rx.recv().await.unwrap();
    assert_eq!(forwarded.label, Label::from("web"));
    assert_eq!(forwarded.exit_code, Some(1));
}
