//! Reporter protocol
//!
//! A [`Reporter`] observes a run. The runner calls its hooks in a fixed order:
//!
//! ```text
//! before_run
//!   enter_namespace            (per named namespace, children first)
//!     before_test_group        (per definition)
//!       before_test            (per invocation)
//!       after_test
//!     after_test_group
//!   exit_namespace
//! after_run
//! finalize
//! ```
//!
//! `list_tests` is the alternative terminal action: it reports the selected
//! tests and their expanded invocations without running anything.
//!
//! ## Reporters
//!
//! - `plain` - live console output (default)
//! - `junit` - JUnit XML
//! - `xml` / `catch2` - Catch2 XML, format version 3
//! - `json` - one JSON document

pub mod catch2;
pub mod console;
pub mod json;
pub mod junit;
mod xml;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use rigor_core::{Invocation, PlannedNamespace, TestDefinition, TestPlan, TestResult};
use thiserror::Error;

pub use catch2::Catch2Reporter;
pub use console::ConsoleReporter;
pub use json::JsonReporter;
pub use junit::JunitReporter;

use crate::config::RunConfig;

/// Observer of a test run.
pub trait Reporter {
    /// Called once, before the first test runs
    fn before_run(&mut self, _plan: &TestPlan) {}

    /// Called when traversal enters a named namespace
    fn enter_namespace(&mut self, _name: &str) {}

    /// Called before the invocations of one definition run
    fn before_test_group(&mut self, _test: &TestDefinition) {}

    /// Called before each invocation runs
    fn before_test(&mut self, _invocation: &Invocation) {}

    /// Called with the result of each invocation
    fn after_test(&mut self, result: &TestResult);

    /// Called with every result of one definition
    fn after_test_group(&mut self, _results: &[TestResult]) {}

    /// Called when traversal leaves a named namespace
    fn exit_namespace(&mut self, _name: &str) {}

    /// Called once with every result, in run order
    fn after_run(&mut self, _results: &[TestResult]) {}

    /// Write the tests of `plan` instead of running them.
    fn list_tests(&mut self, plan: &TestPlan, out: &mut dyn Write) -> io::Result<()> {
        write_tree(plan.root(), 0, out)
    }

    /// Write any accumulated report to `out`.
    fn finalize(&mut self, _out: &mut dyn Write) -> io::Result<()> {
        Ok(())
    }
}

/// Indented tree listing: namespaces end in `::`, tests show their location
/// and each invocation follows on its own `- ` line.
fn write_tree(node: &PlannedNamespace, depth: usize, out: &mut dyn Write) -> io::Result<()> {
    for child in node.children() {
        writeln!(out, "{:indent$}{}::", "", child.name(), indent = depth * 2)?;
        write_tree(child, depth + 1, out)?;
    }
    for planned in node.tests() {
        let test = planned.test();
        writeln!(
            out,
            "{:indent$}{} ({})",
            "",
            test.base_name(),
            test.location(),
            indent = depth * 2
        )?;
        for invocation in planned.invocations() {
            writeln!(out, "{:indent$}- {}", "", invocation.name(), indent = (depth + 1) * 2)?;
        }
    }
    Ok(())
}

/// Names accepted by [`make`].
pub const REPORTERS: &[&str] = &["plain", "junit", "xml", "catch2", "json"];

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("unknown reporter `{name}` (available: {})", REPORTERS.join(", "))]
    Unknown { name: String },

    #[error("cannot open report file `{}`: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write report: {0}")]
    Write(#[from] io::Error),
}

/// Build the reporter registered under `name`.
pub fn make(name: &str, config: &RunConfig) -> Result<Box<dyn Reporter>, ReporterError> {
    match name {
        "plain" | "console" => Ok(Box::new(ConsoleReporter::new(config))),
        "junit" => Ok(Box::new(JunitReporter::new())),
        "xml" | "catch2" => Ok(Box::new(Catch2Reporter::new().with_name(run_name()))),
        "json" => Ok(Box::new(JsonReporter::new())),
        other => Err(ReporterError::Unknown {
            name: other.to_string(),
        }),
    }
}

/// Whether `name` is a reporter that writes as the run goes instead of
/// producing a document on `finalize`.
pub fn is_live(name: &str) -> bool {
    matches!(name, "plain" | "console")
}

fn run_name() -> Option<String> {
    let program = std::env::args().next()?;
    Path::new(&program)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

// ============================================================================
// Output
// ============================================================================

/// Report destination: stdout, or a file truncated on open.
pub enum Output {
    Stdout(io::Stdout),
    File(BufWriter<File>),
}

impl Output {
    pub fn open(path: Option<&Path>) -> Result<Self, ReporterError> {
        match path {
            None => Ok(Output::Stdout(io::stdout())),
            Some(path) => File::create(path)
                .map(|file| Output::File(BufWriter::new(file)))
                .map_err(|source| ReporterError::Open {
                    path: path.to_path_buf(),
                    source,
                }),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(out) => out.write(buf),
            Output::File(out) => out.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(out) => out.flush(),
            Output::File(out) => out.flush(),
        }
    }
}
