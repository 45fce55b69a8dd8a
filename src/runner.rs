//! Execution engine
//!
//! Walks a [`TestPlan`] depth-first and runs every invocation in order,
//! streaming events to a [`Reporter`]. Each invocation goes through:
//!
//! 1. the owning definition's skip check (once per definition),
//! 2. output capture and, when a collector is installed, coverage tracking,
//! 3. the call itself, timed, with every panic or returned error caught,
//! 4. classification into PASS / FAIL, inverted for expected failures.
//!
//! Nothing a test does escapes the run loop: panics, errors and failing
//! collectors all end up as results.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use rigor_core::assertion;
use rigor_core::{Failure, Invocation, Outcome, PlannedNamespace, PlannedTest, TestPlan, TestResult};
use tracing::{debug, warn};

use crate::capture::{CapturedOutput, OutputCapture};
use crate::coverage::{CoverageCollector, CoverageSample, harvest};
use crate::reporter::Reporter;

// ============================================================================
// Panic hook
// ============================================================================

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

thread_local! {
    static LAST_PANIC: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Install depth and the hook to restore once it drops back to zero.
static INSTALLED: Mutex<Option<(usize, PanicHook)>> = Mutex::new(None);

fn quiet_hook(info: &PanicHookInfo<'_>) {
    let location = info.location().map(|location| format!("{}:{}", location.file(), location.line()));
    LAST_PANIC.with(|last| *last.borrow_mut() = location);
}

/// Replaces the process panic hook while any guard is alive.
///
/// The replacement prints nothing and records where the panic happened, so
/// captured stderr holds only what the test itself wrote. Guards nest and may
/// be held from several threads; the previous hook comes back when the last
/// one drops.
struct QuietPanics;

impl QuietPanics {
    fn install() -> Self {
        let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
        match installed.as_mut() {
            Some((depth, _)) => *depth += 1,
            None => {
                let previous = panic::take_hook();
                panic::set_hook(Box::new(quiet_hook));
                *installed = Some((1, previous));
            }
        }
        QuietPanics
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        let mut installed = INSTALLED.lock().unwrap_or_else(PoisonError::into_inner);
        let Some((depth, _)) = installed.as_mut() else {
            return;
        };
        *depth = depth.saturating_sub(1);
        // The hook cannot be swapped from a panicking thread; the next
        // install picks the entry up again at depth zero.
        if *depth > 0 || thread::panicking() {
            return;
        }
        if let Some((_, previous)) = installed.take() {
            panic::set_hook(previous);
        }
    }
}

fn take_panic_location() -> Option<String> {
    LAST_PANIC.with(|last| last.borrow_mut().take())
}

// ============================================================================
// Summary
// ============================================================================

/// Pass/fail/skip tallies of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn new(results: &[TestResult]) -> Self {
        results.iter().fold(Self::default(), |mut summary, result| {
            match result.outcome {
                Outcome::Pass => summary.passed += 1,
                Outcome::Fail => summary.failed += 1,
                Outcome::Skip => summary.skipped += 1,
            }
            summary
        })
    }

    /// Results that were actually executed.
    pub fn executed(&self) -> usize {
        self.passed + self.failed
    }

    pub fn total(&self) -> usize {
        self.executed() + self.skipped
    }

    /// Every executed result passed (or failed as expected).
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

// ============================================================================
// Runner
// ============================================================================

/// Sequential test executor.
pub struct Runner {
    capture: bool,
    coverage: Option<Box<dyn CoverageCollector>>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// A runner that captures output and collects no coverage.
    pub fn new() -> Self {
        Self {
            capture: true,
            coverage: None,
        }
    }

    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_coverage(mut self, collector: Box<dyn CoverageCollector>) -> Self {
        self.coverage = Some(collector);
        self
    }

    /// Run every invocation in `plan`, in traversal order.
    #[tracing::instrument(skip_all, fields(invocations = plan.invocation_count()))]
    pub fn run(&mut self, plan: &TestPlan, reporter: &mut dyn Reporter) -> Vec<TestResult> {
        reporter.before_run(plan);
        let mut results = Vec::new();
        {
            let _quiet = QuietPanics::install();
            self.run_namespace(plan.root(), reporter, &mut results);
        }
        reporter.after_run(&results);

        let summary = RunSummary::new(&results);
        debug!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            "run finished"
        );
        results
    }

    fn run_namespace(&mut self, node: &PlannedNamespace, reporter: &mut dyn Reporter, results: &mut Vec<TestResult>) {
        // The root of a tree is unnamed and is not reported as a namespace.
        let named = !node.name().is_empty();
        if named {
            reporter.enter_namespace(node.name());
        }
        for child in node.children() {
            self.run_namespace(child, reporter, results);
        }
        for planned in node.tests() {
            let group = self.run_group(planned, reporter);
            reporter.after_test_group(&group);
            results.extend(group);
        }
        if named {
            reporter.exit_namespace(node.name());
        }
    }

    fn run_group(&mut self, planned: &PlannedTest, reporter: &mut dyn Reporter) -> Vec<TestResult> {
        let test = planned.test();
        reporter.before_test_group(test);

        match panic::catch_unwind(AssertUnwindSafe(|| test.should_skip())) {
            Ok(false) => {}
            Ok(true) => {
                debug!(test = %test.full_name(), "skipped");
                let invocation = Invocation::skipped(test);
                reporter.before_test(&invocation);
                let result = TestResult::new(&invocation, Outcome::Skip);
                reporter.after_test(&result);
                return vec![result];
            }
            Err(payload) => {
                let invocation = Invocation::skipped(test);
                reporter.before_test(&invocation);
                let mut result = TestResult::new(&invocation, Outcome::Fail);
                result.failure = Some(Failure::from_panic(payload));
                result.panic_location = take_panic_location();
                warn!(test = %test.full_name(), "skip predicate panicked");
                reporter.after_test(&result);
                return vec![result];
            }
        }

        planned
            .invocations()
            .iter()
            .map(|invocation| {
                reporter.before_test(invocation);
                let result = self.execute(invocation);
                reporter.after_test(&result);
                result
            })
            .collect()
    }

    /// Run one invocation to a result. Never panics on behalf of the test.
    pub fn execute(&mut self, invocation: &Invocation) -> TestResult {
        let test = invocation.test();
        let _quiet = QuietPanics::install();
        assertion::begin(&test.full_name());
        take_panic_location();

        let capture = if self.capture {
            match OutputCapture::begin() {
                Ok(capture) => Some(capture),
                Err(err) => {
                    warn!(error = %err, "output capture unavailable, running uncaptured");
                    self.capture = false;
                    None
                }
            }
        } else {
            None
        };

        let mut samples = Vec::new();
        let started = Instant::now();
        let failure = match self.coverage.as_mut() {
            Some(collector) => call_with_coverage(&mut **collector, invocation, &mut samples),
            None => call(invocation),
        };
        let duration = started.elapsed();

        let output = match capture.map(OutputCapture::finish) {
            Some(Ok(output)) => output,
            Some(Err(err)) => {
                warn!(error = %err, test = invocation.name(), "failed to read captured output");
                CapturedOutput::default()
            }
            None => CapturedOutput::default(),
        };

        let outcome = match (&failure, test.expect_failure()) {
            (None, false) | (Some(_), true) => Outcome::Pass,
            (None, true) | (Some(_), false) => Outcome::Fail,
        };

        let mut result = TestResult::new(invocation, outcome);
        result.duration = duration;
        result.panic_location = failure.as_ref().and_then(|_| take_panic_location());
        result.failure = failure;
        result.stdout = output.stdout;
        result.stderr = output.stderr;
        result.assertions = assertion::take();
        if let Some(collector) = self.coverage.as_deref() {
            match panic::catch_unwind(AssertUnwindSafe(|| harvest(collector, &samples))) {
                Ok(coverage) => result.coverage = coverage,
                Err(payload) => {
                    let failure = Failure::from_panic(payload);
                    warn!(test = invocation.name(), error = failure.message(), "coverage harvest panicked");
                }
            }
        }

        debug!(
            test = invocation.name(),
            outcome = outcome.as_str(),
            duration_ms = result.duration_ms(),
            "finished"
        );
        result
    }
}

/// Call `invocation`, classifying any raised failure.
fn call(invocation: &Invocation) -> Option<Failure> {
    match panic::catch_unwind(AssertUnwindSafe(|| invocation.call())) {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(Failure::from_error(error)),
        Err(payload) => Some(Failure::from_panic(payload)),
    }
}

fn call_with_coverage(
    collector: &mut dyn CoverageCollector,
    invocation: &Invocation,
    samples: &mut Vec<CoverageSample>,
) -> Option<Failure> {
    let mut raised = None;
    let tracked = panic::catch_unwind(AssertUnwindSafe(|| {
        collector.run_with_coverage(&mut || raised = Some(call(invocation)), samples);
    }));

    match (raised, tracked) {
        (Some(failure), _) => failure,
        (None, Err(payload)) => Some(Failure::from_panic(payload)),
        (None, Ok(())) => Some(Failure::Exception(
            "coverage collector returned without calling the test".to_string(),
        )),
    }
}
