//! Test results

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::assertion::{AssertionFailure, AssertionInfo};
use crate::callable::BoxError;
use crate::definition::TestDefinition;
use crate::expand::Invocation;

/// Text reported for a failure whose payload carries no message.
pub const UNKNOWN_FAILURE: &str = "unknown exception thrown";

/// Text reported when an expected-failure test passes.
pub const UNEXPECTED_PASS: &str = "passed but was expected to fail";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Pass,
    Fail,
    Skip,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::Skip => "skip",
        }
    }
}

/// Why an invocation raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A framework check failed.
    Assertion(AssertionFailure),
    /// Any other panic or error carrying a message.
    Exception(String),
    /// A panic with a payload that carries no message.
    Unknown,
}

impl Failure {
    /// Classify a panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        match payload.downcast::<AssertionFailure>() {
            Ok(failure) => Failure::Assertion(*failure),
            Err(payload) => {
                if let Some(message) = payload.downcast_ref::<&'static str>() {
                    Failure::Exception((*message).to_string())
                } else if let Some(message) = payload.downcast_ref::<String>() {
                    Failure::Exception(message.clone())
                } else if let Some(error) = payload.downcast_ref::<BoxError>() {
                    Failure::Exception(error.to_string())
                } else {
                    Failure::Unknown
                }
            }
        }
    }

    /// Classify an error returned from a test body.
    pub fn from_error(error: BoxError) -> Self {
        match error.downcast::<AssertionFailure>() {
            Ok(failure) => Failure::Assertion(*failure),
            Err(error) => Failure::Exception(error.to_string()),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Failure::Assertion(failure) => &failure.message,
            Failure::Exception(message) => message,
            Failure::Unknown => UNKNOWN_FAILURE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Assertion(_) => "assertion",
            Failure::Exception(_) => "exception",
            Failure::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCoverage {
    pub line: u32,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCoverage {
    pub filename: String,
    pub lines: Vec<LineCoverage>,
}

/// Outcome of one invocation.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub test: Arc<TestDefinition>,
    /// Invocation display name
    pub name: String,
    pub outcome: Outcome,
    /// Time spent in the call itself
    pub duration: Duration,
    pub failure: Option<Failure>,
    /// `file:line` of the panic that raised `failure`, when known
    pub panic_location: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub assertions: Vec<AssertionInfo>,
    pub coverage: Vec<FileCoverage>,
}

impl TestResult {
    pub fn new(invocation: &Invocation, outcome: Outcome) -> Self {
        Self {
            test: Arc::clone(invocation.test()),
            name: invocation.name().to_string(),
            outcome,
            duration: Duration::ZERO,
            failure: None,
            panic_location: None,
            stdout: String::new(),
            stderr: String::new(),
            assertions: Vec::new(),
            coverage: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.outcome == Outcome::Pass
    }

    pub fn failed(&self) -> bool {
        self.outcome == Outcome::Fail
    }

    pub fn is_skipped(&self) -> bool {
        self.outcome == Outcome::Skip
    }

    /// Passed because the failure it raised was expected.
    pub fn is_expected_failure(&self) -> bool {
        self.passed() && self.test.expect_failure()
    }

    /// Failure text to report for a failed result.
    pub fn message(&self) -> Option<&str> {
        match (&self.failure, self.outcome) {
            (Some(failure), _) => Some(failure.message()),
            (None, Outcome::Fail) if self.test.expect_failure() => Some(UNEXPECTED_PASS),
            (None, _) => None,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}
