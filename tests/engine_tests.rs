//! Execution engine: outcome classification, skipping, coverage and the
//! reporter protocol.
//!
//! Output capture is switched off here; it swaps the process-wide stdout and
//! stderr descriptors and is exercised by the `capture` test target instead.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rigor::coverage::{CoverageCollector, CoverageSample, SourceLine};
use rigor::reporter::Reporter;
use rigor::result::UNEXPECTED_PASS;
use rigor::{
    Failure, Fixture, Fixtures, Invocation, Outcome, ProbeCollector, RunSummary, Runner, SetupError, TestDefinition,
    TestNamespace, TestPlan, TestResult, check, check_eq, params, probe,
};

fn plan(tests: Vec<TestDefinition>) -> TestPlan {
    plan_with(tests, &Fixtures::new())
}

fn plan_with(tests: Vec<TestDefinition>, fixtures: &Fixtures) -> TestPlan {
    let tree = TestNamespace::from_tests(tests.into_iter().map(Arc::new));
    TestPlan::build(&tree, fixtures).unwrap()
}

fn runner() -> Runner {
    Runner::new().with_capture(false)
}

/// Reporter that only collects results.
#[derive(Default)]
struct Collect {
    results: Vec<TestResult>,
}

impl Reporter for Collect {
    fn after_test(&mut self, result: &TestResult) {
        self.results.push(result.clone());
    }
}

fn run(tests: Vec<TestDefinition>) -> Vec<TestResult> {
    let mut reporter = Collect::default();
    let results = runner().run(&plan(tests), &mut reporter);
    assert_eq!(results.len(), reporter.results.len());
    results
}

fn run_one(test: TestDefinition) -> TestResult {
    let mut results = run(vec![test]);
    assert_eq!(results.len(), 1);
    results.remove(0)
}

// =============================================================================
// Outcomes
// =============================================================================

fn test(foo: char, bar: i32) {
    check!(bar > 5 && foo != 'x');
}

#[test]
fn test_params_example_passes() {
    let results = run(vec![
        TestDefinition::builder("demo::params::test")
            .params(params![('a', 10), ('c', 12)])
            .run(test),
    ]);
    let names: Vec<&str> = results.iter().map(|result| result.name.as_str()).collect();
    assert_eq!(names, vec!["test(a, 10)", "test(c, 12)"]);
    assert!(results.iter().all(TestResult::passed));
    assert!(results.iter().all(|result| result.failure.is_none()));
}

#[test]
fn test_assertion_failure_is_classified() {
    let result = run_one(TestDefinition::builder("fails").run(|| check_eq!(1 + 1, 3)));
    assert_eq!(result.outcome, Outcome::Fail);
    match result.failure.as_ref().unwrap() {
        Failure::Assertion(failure) => {
            assert!(failure.message.starts_with("check_eq failed at"));
            assert!(failure.message.contains("where: 2 == 3"));
            assert!(failure.location.file.ends_with("engine_tests.rs"));
        }
        other => panic!("expected an assertion failure, got {other:?}"),
    }
    assert_eq!(result.assertions.len(), 1);
    assert!(!result.assertions[0].success);
}

fn raises() {
    panic!("boom");
}

#[test]
fn test_panic_is_an_exception() {
    let result = run_one(TestDefinition::builder("raises").run(raises));
    assert_eq!(result.outcome, Outcome::Fail);
    assert_eq!(result.failure, Some(Failure::Exception("boom".into())));
    assert!(result.panic_location.as_deref().unwrap().contains("engine_tests.rs"));
}

#[test]
fn test_returned_error_is_an_exception() {
    let result = run_one(
        TestDefinition::builder("parses").run(|| -> Result<(), std::num::ParseIntError> {
            "x".parse::<i32>()?;
            Ok(())
        }),
    );
    assert_eq!(result.outcome, Outcome::Fail);
    assert_eq!(result.failure, Some(Failure::Exception("invalid digit found in string".into())));
}

fn opaque() {
    std::panic::panic_any(7_u8)
}

#[test]
fn test_opaque_panic_is_unknown() {
    let result = run_one(TestDefinition::builder("opaque").run(opaque));
    assert_eq!(result.outcome, Outcome::Fail);
    assert_eq!(result.failure, Some(Failure::Unknown));
    assert_eq!(result.message(), Some("unknown exception thrown"));
}

#[test]
fn test_expect_failure_inverts_outcome() {
    let results = run(vec![
        TestDefinition::builder("fails_as_expected")
            .expect_failure()
            .run(|| check!(false, "oh no")),
        TestDefinition::builder("passes_unexpectedly")
            .expect_failure()
            .run(|| {}),
    ]);

    assert_eq!(results[0].outcome, Outcome::Pass);
    assert!(results[0].is_expected_failure());
    assert!(matches!(results[0].failure, Some(Failure::Assertion(_))));

    assert_eq!(results[1].outcome, Outcome::Fail);
    assert!(results[1].failure.is_none());
    assert_eq!(results[1].message(), Some(UNEXPECTED_PASS));
}

#[test]
fn test_passing_checks_are_recorded() {
    let result = run_one(TestDefinition::builder("checks").run(|| {
        check!(true);
        check_eq!(2, 2);
    }));
    assert!(result.passed());
    assert_eq!(result.assertions.len(), 2);
    assert!(result.assertions.iter().all(|assertion| assertion.success));
    assert_eq!(result.assertions[1].expanded, "2 == 2");
}

// =============================================================================
// Skipping
// =============================================================================

#[test]
fn test_skipped_body_never_runs() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let results = run(vec![
        TestDefinition::builder("skipped")
            .skip()
            .params(params![(1,), (2,)])
            .run(|_: i32| {
                CALLS.fetch_add(1, Ordering::SeqCst);
            }),
    ]);
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Skip);
    assert_eq!(results[0].name, "skipped(...)");
    assert!(results[0].stdout.is_empty());
}

#[test]
fn test_skip_predicate_is_evaluated_at_run_time() {
    static CHECKED: AtomicUsize = AtomicUsize::new(0);
    let plan = plan(vec![
        TestDefinition::builder("maybe")
            .skip_if(|| CHECKED.fetch_add(1, Ordering::SeqCst) > 0)
            .run(|| {}),
    ]);
    assert_eq!(CHECKED.load(Ordering::SeqCst), 0);

    let first = runner().run(&plan, &mut Collect::default());
    let second = runner().run(&plan, &mut Collect::default());
    assert_eq!(first[0].outcome, Outcome::Pass);
    assert_eq!(second[0].outcome, Outcome::Skip);
}

#[test]
fn test_panicking_skip_predicate_fails_the_group() {
    let result = run_one(
        TestDefinition::builder("bad_predicate")
            .skip_if(|| panic!("cannot decide"))
            .run(|| {}),
    );
    assert_eq!(result.outcome, Outcome::Fail);
    assert_eq!(result.failure, Some(Failure::Exception("cannot decide".into())));
}

#[test]
fn test_summary_ignores_skips() {
    let results = run(vec![
        TestDefinition::builder("ok").run(|| {}),
        TestDefinition::builder("later").skip().run(|| {}),
    ]);
    let summary = RunSummary::new(&results);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.executed(), 1);
    assert_eq!(summary.total(), 2);
    assert!(summary.success());
}

// =============================================================================
// Fixtures and setup errors
// =============================================================================

#[test]
fn test_fixture_chain() {
    let mut fixtures = Fixtures::new();
    fixtures.insert(Fixture::new("meta_fixture", || 21)).unwrap();
    fixtures
        .insert(Fixture::new("fixture", |meta: i32| meta * 2).depends_on(["meta_fixture"]))
        .unwrap();
    let plan = plan_with(
        vec![
            TestDefinition::builder("uses_fixture")
                .fixtures(["fixture"])
                .run(|value: i32| check_eq!(value, 42)),
        ],
        &fixtures,
    );
    let results = runner().run(&plan, &mut Collect::default());
    assert_eq!(results[0].name, "uses_fixture(42)");
    assert!(results[0].passed());
}

#[test]
fn test_missing_fixture_aborts_before_running() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    let tree = TestNamespace::from_tests([
        Arc::new(TestDefinition::builder("first").run(|| {
            CALLS.fetch_add(1, Ordering::SeqCst);
        })),
        Arc::new(TestDefinition::builder("second").fixtures(["absent"]).run(|_: i32| {})),
    ]);
    let err = TestPlan::build(&tree, &Fixtures::new()).unwrap_err();
    assert!(matches!(err, SetupError::MissingFixture { .. }));
    assert_eq!(CALLS.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Coverage
// =============================================================================

fn classify(n: i32) -> &'static str {
    probe!();
    if n < 0 {
        probe!();
        return "negative";
    }
    for _ in 0..n {
        probe!();
    }
    "non-negative"
}

#[test]
fn test_probe_coverage_is_attached() {
    let plan = plan(vec![
        TestDefinition::builder("classify")
            .params(params![(3,)])
            .run(|n: i32| check_eq!(classify(n), "non-negative")),
    ]);
    let mut runner = runner().with_coverage(Box::new(ProbeCollector::new()));
    let results = runner.run(&plan, &mut Collect::default());

    let coverage = &results[0].coverage;
    assert_eq!(coverage.len(), 1);
    assert!(coverage[0].filename.ends_with("engine_tests.rs"));
    let hits: Vec<u64> = coverage[0].lines.iter().map(|line| line.hits).collect();
    assert_eq!(hits, vec![1, 3]);
    assert!(coverage[0].lines.windows(2).all(|pair| pair[0].line < pair[1].line));
}

#[test]
fn test_coverage_survives_failing_tests() {
    let plan = plan(vec![
        TestDefinition::builder("negative")
            .params(params![(-1,)])
            .run(|n: i32| check_eq!(classify(n), "non-negative")),
    ]);
    let mut runner = runner().with_coverage(Box::new(ProbeCollector::new()));
    let results = runner.run(&plan, &mut Collect::default());

    assert_eq!(results[0].outcome, Outcome::Fail);
    assert_eq!(results[0].coverage[0].lines.len(), 2);
}

/// Collector that reports fixed samples without calling the test.
struct Lazy;

impl CoverageCollector for Lazy {
    fn run_with_coverage(&mut self, _thunk: &mut dyn FnMut(), reports: &mut Vec<CoverageSample>) {
        reports.push(CoverageSample { address: 1, hits: 1 });
    }

    fn locate(&self, _address: usize) -> Option<SourceLine> {
        Some(SourceLine {
            file: "src/lib.rs".into(),
            line: 1,
        })
    }
}

#[test]
fn test_collector_that_skips_the_call_fails_the_test() {
    let plan = plan(vec![TestDefinition::builder("never_called").run(|| {})]);
    let mut runner = runner().with_coverage(Box::new(Lazy));
    let results = runner.run(&plan, &mut Collect::default());
    assert_eq!(results[0].outcome, Outcome::Fail);
    assert!(matches!(results[0].failure, Some(Failure::Exception(_))));
}

/// Collector whose own bookkeeping panics.
struct Broken;

impl CoverageCollector for Broken {
    fn run_with_coverage(&mut self, thunk: &mut dyn FnMut(), _reports: &mut Vec<CoverageSample>) {
        thunk();
        panic!("counter overflow");
    }

    fn locate(&self, _address: usize) -> Option<SourceLine> {
        None
    }
}

#[test]
fn test_panicking_collector_does_not_abort_the_run() {
    let results = {
        let plan = plan(vec![
            TestDefinition::builder("first").run(|| {}),
            TestDefinition::builder("second").run(|| {}),
        ]);
        let mut runner = runner().with_coverage(Box::new(Broken));
        runner.run(&plan, &mut Collect::default())
    };
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(TestResult::passed));
    assert!(results.iter().all(|result| result.coverage.is_empty()));
}

/// Collector that tracks fine but cannot symbolize its samples.
struct Unsymbolized;

impl CoverageCollector for Unsymbolized {
    fn run_with_coverage(&mut self, thunk: &mut dyn FnMut(), reports: &mut Vec<CoverageSample>) {
        thunk();
        reports.push(CoverageSample { address: 7, hits: 1 });
    }

    fn locate(&self, _address: usize) -> Option<SourceLine> {
        panic!("symbolizer crashed");
    }
}

#[test]
fn test_panicking_locate_does_not_abort_the_run() {
    let mut recorder = Recorder::default();
    let results = {
        let plan = plan(vec![
            TestDefinition::builder("first").run(|| {}),
            TestDefinition::builder("second").run(|| check!(false)),
        ]);
        let mut runner = runner().with_coverage(Box::new(Unsymbolized));
        runner.run(&plan, &mut recorder)
    };
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].outcome, Outcome::Pass);
    assert_eq!(results[1].outcome, Outcome::Fail);
    assert!(results.iter().all(|result| result.coverage.is_empty()));
    assert_eq!(recorder.events.last().map(String::as_str), Some("after_run 2"));
}

// =============================================================================
// Reporter protocol
// =============================================================================

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl Reporter for Recorder {
    fn before_run(&mut self, plan: &TestPlan) {
        self.events.push(format!("before_run {}", plan.invocation_count()));
    }

    fn enter_namespace(&mut self, name: &str) {
        self.events.push(format!("enter {name}"));
    }

    fn before_test_group(&mut self, test: &TestDefinition) {
        self.events.push(format!("group {}", test.full_name()));
    }

    fn before_test(&mut self, invocation: &Invocation) {
        self.events.push(format!("before {}", invocation.name()));
    }

    fn after_test(&mut self, result: &TestResult) {
        self.events.push(format!("after {} {}", result.name, result.outcome.as_str()));
    }

    fn after_test_group(&mut self, results: &[TestResult]) {
        self.events.push(format!("group done {}", results.len()));
    }

    fn exit_namespace(&mut self, name: &str) {
        self.events.push(format!("exit {name}"));
    }

    fn after_run(&mut self, results: &[TestResult]) {
        self.events.push(format!("after_run {}", results.len()));
    }
}

#[test]
fn test_hook_order_follows_traversal() {
    let plan = plan(vec![
        TestDefinition::builder("top").skip().run(|| {}),
        TestDefinition::builder("outer::inner::t1")
            .params(params![(1,), (2,)])
            .run(|_: i32| {}),
    ]);
    let mut recorder = Recorder::default();
    runner().run(&plan, &mut recorder);

    assert_eq!(
        recorder.events,
        vec![
            "before_run 3",
            "enter outer",
            "enter inner",
            "group outer::inner::t1",
            "before t1(1)",
            "after t1(1) pass",
            "before t1(2)",
            "after t1(2) pass",
            "group done 2",
            "exit inner",
            "exit outer",
            "group top",
            "before top(...)",
            "after top(...) skip",
            "group done 1",
            "after_run 3",
        ]
    );
}

#[test]
fn test_execute_single_invocation() {
    let plan = plan(vec![TestDefinition::builder("direct").run(|| check!(true))]);
    let invocation = &plan.tests()[0].invocations()[0];
    let result = runner().execute(invocation);
    assert!(result.passed());
    assert_eq!(result.name, "direct()");
}
