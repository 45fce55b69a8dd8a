//! JSON reporter
//!
//! Writes a single document on `finalize`:
//!
//! ```json
//! {
//!   "results": [
//!     { "name": "test(a, 10)", "test": "params::test", "outcome": "pass", "duration_ms": 0.01,
//!       "failure": null, "stdout": "", "stderr": "", "coverage": [] }
//!   ],
//!   "summary": { "total": 1, "passed": 1, "failed": 0, "skipped": 0 }
//! }
//! ```

use std::io::{self, Write};

use rigor_core::{FileCoverage, TestResult};
use serde_json::{Value, json};

use super::Reporter;
use crate::runner::RunSummary;

#[derive(Debug, Default)]
pub struct JsonReporter {
    results: Vec<Value>,
    summary: Option<RunSummary>,
}

impl JsonReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> Value {
        let summary = self.summary.unwrap_or_default();
        json!({
            "results": self.results,
            "summary": {
                "total": summary.total(),
                "passed": summary.passed,
                "failed": summary.failed,
                "skipped": summary.skipped,
            },
        })
    }
}

fn coverage(files: &[FileCoverage]) -> Value {
    files
        .iter()
        .map(|file| {
            let lines: Vec<Value> = file
                .lines
                .iter()
                .map(|line| json!({ "line": line.line, "hits": line.hits }))
                .collect();
            json!({ "file": file.filename, "lines": lines })
        })
        .collect()
}

impl Reporter for JsonReporter {
    fn after_test(&mut self, result: &TestResult) {
        let failure = match (&result.failure, result.message()) {
            (Some(failure), _) if result.failed() || result.is_expected_failure() => {
                json!({ "kind": failure.kind(), "message": failure.message() })
            }
            (None, Some(message)) => json!({ "kind": "unexpected-pass", "message": message }),
            _ => Value::Null,
        };
        self.results.push(json!({
            "name": result.name,
            "test": result.test.full_name(),
            "outcome": result.outcome.as_str(),
            "duration_ms": result.duration_ms(),
            "failure": failure,
            "stdout": result.stdout,
            "stderr": result.stderr,
            "coverage": coverage(&result.coverage),
        }));
    }

    fn after_run(&mut self, results: &[TestResult]) {
        self.summary = Some(RunSummary::new(results));
    }

    fn finalize(&mut self, out: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *out, &self.document()).map_err(io::Error::other)?;
        writeln!(out)?;
        self.results.clear();
        out.flush()
    }
}
