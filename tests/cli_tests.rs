//! Harness and command-line configuration, end to end

use clap::Parser;
use rigor::cli::{Cli, ExitCode, Harness};
use rigor::{Fixture, Registry, RunConfig, TestDefinition, check, check_eq};

fn passes() -> TestDefinition {
    TestDefinition::builder("suite::passes").run(|| check!(true))
}

fn fails() -> TestDefinition {
    TestDefinition::builder("suite::fails").run(|| check_eq!(1, 2))
}

fn skipped() -> TestDefinition {
    TestDefinition::builder("other::skipped").skip().run(|| {})
}

fn needs_fixture() -> TestDefinition {
    TestDefinition::builder("fixtures::needs").fixtures(["answer"]).run(|answer: i32| check_eq!(answer, 42))
}

fn answer() -> Fixture {
    Fixture::new("answer", || 42)
}

fn config(args: &[&str]) -> RunConfig {
    let mut argv = vec!["tests", "--nocapture"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap().config()
}

fn execute(registry: Registry, args: &[&str]) -> (ExitCode, String) {
    let mut out = Vec::new();
    let code = Harness::new(registry).execute_with(&config(args), &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

fn json(out: &str) -> serde_json::Value {
    serde_json::from_str(out).unwrap()
}

#[test]
fn test_empty_registry_succeeds() {
    let (code, out) = execute(Registry::new(), &["-r", "json"]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(json(&out)["summary"]["total"], 0);
}

#[test]
fn test_failure_sets_exit_code() {
    let registry = Registry::new().with_test(passes).with_test(fails).with_test(skipped);
    let (code, out) = execute(registry, &["-r", "json"]);
    assert_eq!(code, ExitCode::FAILURE);
    let doc = json(&out);
    assert_eq!(doc["summary"]["passed"], 1);
    assert_eq!(doc["summary"]["failed"], 1);
    assert_eq!(doc["summary"]["skipped"], 1);
}

#[test]
fn test_filter_selects_tests() {
    let registry = Registry::new().with_test(passes).with_test(fails).with_test(skipped);
    let (code, out) = execute(registry, &["suite::passes,other", "-r", "json"]);
    assert_eq!(code, ExitCode::SUCCESS);
    let doc = json(&out);
    let tests: Vec<&str> = doc["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|result| result["test"].as_str().unwrap())
        .collect();
    assert_eq!(tests, vec!["suite::passes", "other::skipped"]);
}

#[test]
fn test_section_narrows_filter() {
    let registry = Registry::new().with_test(passes).with_test(fails);
    let (code, out) = execute(registry, &["suite", "-c", "passes", "-r", "json"]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert_eq!(json(&out)["summary"]["total"], 1);
}

#[test]
fn test_wildcard_selects_everything() {
    let registry = Registry::new().with_test(passes).with_test(skipped);
    let (_, out) = execute(registry, &["*", "-r", "json"]);
    assert_eq!(json(&out)["summary"]["total"], 2);
}

#[test]
fn test_list_tests_runs_nothing() {
    let registry = Registry::new().with_fixture(answer).with_test(fails).with_test(needs_fixture);
    let (code, out) = execute(registry, &["--list-tests"]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(out.contains("suite::\n  fails (tests/cli_tests.rs:"));
    assert!(out.contains("\n    - fails()\n"));
    assert!(out.contains("fixtures::\n  needs (tests/cli_tests.rs:"));
    assert!(out.contains("\n    - needs(42)\n"));
}

#[test]
fn test_list_tests_catch2() {
    let registry = Registry::new().with_test(passes);
    let (_, out) = execute(registry, &["--list-tests", "-r", "xml"]);
    assert!(out.contains("<MatchingTests>"));
    assert!(out.contains("<Name>suite</Name>"));
}

#[test]
fn test_fixtures_from_registry() {
    let registry = Registry::new().with_fixture(answer).with_test(needs_fixture);
    let (code, out) = execute(registry, &["-r", "junit"]);
    assert_eq!(code, ExitCode::SUCCESS);
    assert!(out.contains("<testcase name=\"needs(42)\" classname=\"fixtures\""));
}

#[test]
fn test_missing_fixture_is_a_setup_error() {
    let registry = Registry::new().with_test(needs_fixture);
    let mut out = Vec::new();
    let err = Harness::new(registry)
        .execute_with(&config(&["-r", "json"]), &mut out)
        .unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert!(err.message.contains("no fixture named `answer`"));
    assert!(out.is_empty());
}

#[test]
fn test_unknown_reporter() {
    let mut out = Vec::new();
    let err = Harness::new(Registry::new())
        .execute_with(&config(&["-r", "tap"]), &mut out)
        .unwrap_err();
    assert!(err.message.contains("unknown reporter `tap`"));
}

#[test]
fn test_report_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.xml");
    let registry = Registry::new().with_test(passes);
    let config = config(&["-r", "junit", "-o", path.to_str().unwrap()]);

    let code = Harness::new(registry).execute(&config).unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    let report = std::fs::read_to_string(&path).unwrap();
    assert!(report.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(report.contains("<testcase name=\"passes()\" classname=\"suite\""));
}

#[test]
fn test_console_reporter_rejects_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.txt");
    std::fs::write(&path, "previous report").unwrap();
    let registry = Registry::new().with_test(passes);
    let config = config(&["-o", path.to_str().unwrap()]);

    let err = Harness::new(registry).execute(&config).unwrap_err();
    assert_eq!(err.exit_code, ExitCode::FAILURE);
    assert!(err.message.contains("reporter `plain` writes to the terminal"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous report");
}

#[test]
fn test_console_listing_written_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tests.txt");
    let registry = Registry::new().with_test(passes);
    let config = config(&["--list-tests", "-o", path.to_str().unwrap()]);

    let code = Harness::new(registry).execute(&config).unwrap();
    assert_eq!(code, ExitCode::SUCCESS);
    let listing = std::fs::read_to_string(&path).unwrap();
    assert!(listing.starts_with("suite::\n  passes (tests/cli_tests.rs:"));
    assert!(listing.ends_with("    - passes()\n"));
}

#[test]
fn test_unwritable_report_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("report.xml");
    let config = config(&["-r", "junit", "-o", path.to_str().unwrap()]);
    let err = Harness::new(Registry::new()).execute(&config).unwrap_err();
    assert!(err.message.contains("cannot open report file"));
}
