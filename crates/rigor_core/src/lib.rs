//! Define, expand and organise tests for the rigor test runner.
//!
//! This crate holds everything about a test that exists before it runs: its
//! definition and flags, fixtures, parameter sources, expansion into concrete
//! invocations, the namespace tree and the resulting run plan. Executing a plan
//! and reporting on it live in the `rigor` crate.
//!
//! ## Notes
//!
//! - No IO and no unsafe code. The only global state is the optional process-wide [`registry`].
//! - Setup problems (missing fixtures, argument mismatches, panicking generators) are returned as
//!   [`SetupError`] while the plan is built, never reported as failed tests.

#![forbid(unsafe_code)]

pub mod assertion;
pub mod callable;
pub mod definition;
pub mod error;
pub mod expand;
pub mod fixture;
pub mod namespace;
pub mod plan;
pub mod registry;
pub mod result;
pub mod value;

pub use assertion::{AssertionFailure, AssertionInfo};
pub use callable::{BoxError, Callable, TestReturn};
pub use definition::{SkipPredicate, SourceLocation, TestBuilder, TestDefinition, Variant};
pub use error::{ArgumentError, SetupError};
pub use expand::{Invocation, ParamSource, expand};
pub use fixture::{Fixture, Fixtures};
pub use namespace::TestNamespace;
pub use plan::{PlannedNamespace, PlannedTest, TestPlan};
pub use registry::{FixtureFactory, Registry, TestFactory};
pub use result::{Failure, FileCoverage, LineCoverage, Outcome, TestResult};
pub use value::{FromArgs, IntoParamSet, ParamSet, Repr, Value, cartesian_product};
