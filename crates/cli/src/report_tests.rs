use std::time::Duration;

use svcinit_core::Label;

use super::*;

#[test]
fn critical_path_table_renders_one_row_per_entry() {
    let entries = vec![(Label::from("db"), Duration::from_millis(50)), (Label::from("web"), Duration::from_millis(120))];
    let rendered = critical_path_table(&entries).to_string();
    assert!(rendered.contains("db"));
    assert!(rendered.contains("web"));
    assert!(rendered.contains("0.050s"));
    assert!(rendered.contains("0.120s"));
}

#[test]
fn startup_time_table_renders_a_dash_for_instances_that_never_started() {
    let entries = vec![(Label::from("group"), None), (Label::from("web"), Some(Duration::from_millis(10)))];
    let rendered = startup_time_table(&entries, None).to_string();
    assert!(rendered.contains("group"));
    assert!(rendered.contains('-'));
    assert!(rendered.contains("0.010s"));
}

#[test]
fn startup_time_table_appends_a_test_binary_row_when_present() {
    let rendered = startup_time_table(&[], Some(("run_tests", Duration::from_secs(2)))).to_string();
    assert!(rendered.contains("run_tests"));
    assert!(rendered.contains("2.000s"));
}
