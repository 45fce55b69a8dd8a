//! Live console reporter
//!
//! Prints one line as each invocation starts and finishes, then a summary:
//!
//! ```text
//! Running 3 tests...
//! [ RUN      ] params::test(a, 10)
//! [       OK ] params::test(a, 10) (0.012 ms)
//! [ RUN      ] broken()
//! [   FAILED ] broken() (0.030 ms)
//! ERROR: check failed at demos/src/main.rs:40
//! ...
//! === Summary ===
//! 1 / 2 tests passed, 1 skipped.
//! ```

use std::fmt;
use std::io::{self, Stdout, Write};

use rigor_core::{Failure, Invocation, Outcome, TestPlan, TestResult};

use super::Reporter;
use crate::config::RunConfig;
use crate::runner::RunSummary;

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

pub struct ConsoleReporter<W: Write = Stdout> {
    out: W,
    colour: bool,
    durations: bool,
    error: Option<io::Error>,
}

impl ConsoleReporter<Stdout> {
    pub fn new(config: &RunConfig) -> Self {
        Self::with_writer(io::stdout(), config.colour.enabled(), config.durations)
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn with_writer(out: W, colour: bool, durations: bool) -> Self {
        Self {
            out,
            colour,
            durations,
            error: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write one line, keeping the first error for `finalize`.
    fn line(&mut self, args: fmt::Arguments<'_>) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.out.write_fmt(args).and_then(|()| self.out.write_all(b"\n")) {
            self.error = Some(err);
        }
    }

    fn paint<'a>(&self, colour: &'a str) -> (&'a str, &'a str) {
        if self.colour { (colour, RESET) } else { ("", "") }
    }

    fn timing(&self, result: &TestResult) -> String {
        if self.durations {
            format!(" ({:.3} ms)", result.duration_ms())
        } else {
            String::new()
        }
    }
}

impl<W: Write> Reporter for ConsoleReporter<W> {
    fn before_run(&mut self, plan: &TestPlan) {
        self.line(format_args!("Running {} tests...", plan.invocation_count()));
    }

    fn before_test(&mut self, invocation: &Invocation) {
        self.line(format_args!("[ RUN      ] {}", invocation.name()));
    }

    fn after_test(&mut self, result: &TestResult) {
        let timing = self.timing(result);
        match result.outcome {
            Outcome::Pass => {
                let (on, off) = self.paint(GREEN);
                let note = if result.is_expected_failure() { " (failed as expected)" } else { "" };
                self.line(format_args!("[{on}       OK {off}] {}{timing}{note}", result.name));
            }
            Outcome::Skip => {
                let (on, off) = self.paint(YELLOW);
                self.line(format_args!("[{on}  SKIPPED {off}] {}", result.name));
            }
            Outcome::Fail => {
                let (on, off) = self.paint(RED);
                self.line(format_args!("[{on}   FAILED {off}] {}{timing}", result.name));
                if let Some(message) = result.message() {
                    self.line(format_args!("{on}ERROR{off}: {message}"));
                }
                if let (Some(Failure::Exception(_) | Failure::Unknown), Some(location)) =
                    (&result.failure, &result.panic_location)
                {
                    self.line(format_args!("    at {location}"));
                }
                if !result.stdout.is_empty() {
                    self.line(format_args!("==== {on}stdout{off} ====\n{}", result.stdout.trim_end()));
                }
                if !result.stderr.is_empty() {
                    self.line(format_args!("==== {on}stderr{off} ====\n{}", result.stderr.trim_end()));
                }
            }
        }
    }

    fn after_run(&mut self, results: &[TestResult]) {
        let summary = RunSummary::new(results);
        let skipped = if summary.skipped > 0 {
            format!(", {} skipped", summary.skipped)
        } else {
            String::new()
        };
        self.line(format_args!(
            "=== Summary ===\n{} / {} tests passed{skipped}.",
            summary.passed,
            summary.executed()
        ));
    }

    fn finalize(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.out.flush()
    }
}
