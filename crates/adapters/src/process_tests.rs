// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::fake::{FakeProcessAdapter, FakeSpawnedProcess};
use super::*;

fn spec(exe: &str) -> SpawnSpec {
    SpawnSpec {
        exe: PathBuf::from(exe),
        args: vec![],
        env: HashMap::new(),
        capture_output: true,
        pipe_stdin: false,
        new_process_group: true,
    }
}

#[tokio::test]
async fn fake_adapter_records_spawn_calls() {
    let adapter = FakeProcessAdapter::new();
    adapter.spawn(spec("/bin/web")).await.unwrap();
    adapter.spawn(spec("/bin/db")).await.unwrap();

    let calls = adapter.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].exe, PathBuf::from("/bin/web"));
    assert_eq!(calls[1].exe, PathBuf::from("/bin/db"));
}

#[tokio::test]
async fn fake_adapter_can_fail_next_spawn() {
    let adapter = FakeProcessAdapter::new();
    adapter.fail_next_spawn("boom");
    let err = adapter.spawn(spec("/bin/web")).await.unwrap_err();
    assert!(matches!(err, ProcessError::Spawn { .. }));

    // Subsequent spawns succeed again.
    adapter.spawn(spec("/bin/web")).await.unwrap();
    assert_eq!(adapter.calls().len(), 1);
}

#[tokio::test]
async fn wait_blocks_until_finish_is_called() {
    let adapter = FakeProcessAdapter::new();
    let mut process = adapter.spawn(spec("/bin/web")).await.unwrap();
    assert_eq!(process.try_wait().unwrap(), None);

    let fake = process
        .as_any()
        .downcast_ref::<FakeSpawnedProcess>()
        .unwrap();
    fake.handle().finish(Some(0));

    let code = process.wait().await.unwrap();
    assert_eq!(code, Some(0));
}

#[tokio::test]
async fn sigkill_marks_fake_process_exited() {
    let adapter = FakeProcessAdapter::new();
    let mut process = adapter.spawn(spec("/bin/web")).await.unwrap();
    process.signal(ProcessSignal::Sigkill).unwrap();
    let code = process.wait().await.unwrap();
    assert_eq!(code, None);
}

#[tokio::test]
async fn write_stdin_is_recorded() {
    let adapter = FakeProcessAdapter::new();
    let mut process = adapter.spawn(spec("/bin/web")).await.unwrap();
    process.write_stdin(b"reload").await.unwrap();

    let fake = process
        .as_any()
        .downcast_ref::<FakeSpawnedProcess>()
        .unwrap();
    assert_eq!(fake.handle().stdin_lines(), vec![b"reload".to_vec()]);
}
