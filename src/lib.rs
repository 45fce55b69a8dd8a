#![forbid(unsafe_code)]
//! Rigor test runner
//!
//! Tests are declared with [`TestDefinition::builder`], collected in a
//! [`Registry`] and run by a test binary through [`cli::run`]. Definitions
//! can be parameterised with literal sets, generators, fixtures or
//! monomorphised variants; every invocation is executed in isolation with its
//! output captured, and results stream to a pluggable [`Reporter`].
//!
//! ```no_run
//! use rigor::{Registry, TestDefinition, check_eq, params};
//!
//! fn adds() -> TestDefinition {
//!     TestDefinition::builder("math::adds")
//!         .params(params![(1, 2, 3), (2, 2, 4)])
//!         .run(|a: i32, b: i32, sum: i32| check_eq!(a + b, sum))
//! }
//!
//! fn main() {
//!     rigor::cli::run(rigor::cli::Harness::new(Registry::new().with_test(adds)));
//! }
//! ```
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Test bodies**: panics raised by the code under test are caught by the [`runner`] and become failed results;
//!   they never abort a run.
//!
//! ## Unsafe code
//!
//! None. Output capture redirects file descriptors through `nix`.

pub mod capture;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod reporter;
pub mod runner;

pub use rigor_core::{assertion, registry, result};
pub use rigor_core::{cartesian, check, check_eq, check_ne, params, variant};

pub use rigor_core::{
    AssertionFailure, AssertionInfo, BoxError, Failure, FileCoverage, Fixture, Fixtures, Invocation, LineCoverage,
    Outcome, ParamSet, ParamSource, Registry, Repr, SetupError, SourceLocation, TestDefinition, TestNamespace,
    TestPlan, TestResult, Value, Variant, cartesian_product, expand,
};

pub use config::RunConfig;
pub use coverage::{CoverageCollector, ProbeCollector};
pub use reporter::Reporter;
pub use runner::{RunSummary, Runner};
