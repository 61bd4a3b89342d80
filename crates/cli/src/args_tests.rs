use super::*;

fn strs(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn bare_double_dash_hands_everything_after_it_to_the_test_binary() {
    let argv = strs(&["--svc.definitions-path=specs.json", "--", "--verbose", "suite"]);
    let (svcinit_args, test_args) = split_argv(&argv);
    assert_eq!(svcinit_args, strs(&["--svc.definitions-path=specs.json"]));
    assert_eq!(test_args, strs(&["--verbose", "suite"]));
}

#[test]
fn unrecognized_flags_before_the_separator_fall_through_to_the_test_binary() {
    let argv = strs(&["--svc.definitions-path=specs.json", "--test-filter=Foo"]);
    let (svcinit_args, test_args) = split_argv(&argv);
    assert_eq!(svcinit_args, strs(&["--svc.definitions-path=specs.json"]));
    assert_eq!(test_args, strs(&["--test-filter=Foo"]));
}

#[test]
fn bare_positional_args_are_treated_as_test_args() {
    let argv = strs(&["suite_binary", "arg1"]);
    let (svcinit_args, test_args) = split_argv(&argv);
    assert!(svcinit_args.is_empty());
    assert_eq!(test_args, strs(&["suite_binary", "arg1"]));
}

#[yare::parameterized(
    long_form_equals   = { "--svc.definitions-path=x.json" },
    bare_long_form      = { "--help" },
    short_form          = { "-h" },
)]
fn recognized_svcinit_flags_never_leak_into_test_args(flag: &str) {
    let argv = strs(&[flag]);
    let (svcinit_args, test_args) = split_argv(&argv);
    assert_eq!(svcinit_args, strs(&[flag]));
    assert!(test_args.is_empty());
}

#[yare::parameterized(
    unknown_long_flag  = { "--test-filter=Foo" },
    unknown_short_flag = { "-v" },
    bare_word           = { "suite" },
)]
fn everything_else_is_a_test_arg(arg: &str) {
    let argv = strs(&[arg]);
    let (svcinit_args, test_args) = split_argv(&argv);
    assert!(svcinit_args.is_empty());
    assert_eq!(test_args, strs(&[arg]));
}

#[test]
fn parse_flags_extracts_the_definitions_path() {
    let argv = strs(&["--svc.definitions-path=/tmp/specs.json", "--", "./run_tests"]);
    let (flags, test_args) = parse_flags(&argv).unwrap();
    assert_eq!(flags.definitions_path.as_deref(), Some("/tmp/specs.json"));
    assert_eq!(test_args, strs(&["./run_tests"]));
}

#[test]
fn parse_flags_with_no_svcinit_flags_at_all() {
    let argv = strs(&["./run_tests", "-v"]);
    let (flags, test_args) = parse_flags(&argv).unwrap();
    assert!(flags.definitions_path.is_none());
    assert_eq!(test_args, strs(&["./run_tests", "-v"]));
}
