//! Setup-time errors
//!
//! Everything here is fatal for a run: these errors abort plan building before
//! the first test executes, instead of being reported as failed tests.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that occur while binding a [`ParamSet`](crate::ParamSet) to a Rust signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("expected {expected} argument(s), found {found}")]
    Arity { expected: usize, found: usize },

    #[error("argument {index} has type `{found}`, expected `{expected}`")]
    Type {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },
}

/// Errors raised while resolving fixtures or expanding test definitions.
#[derive(Debug, Error, Diagnostic)]
pub enum SetupError {
    #[error("no fixture named `{name}` is registered (required by `{required_by}`)")]
    #[diagnostic(
        code(rigor::setup::missing_fixture),
        help("register the fixture, or declare explicit parameters for the test")
    )]
    MissingFixture { name: String, required_by: String },

    #[error("fixture dependency cycle: {}", .path.join(" -> "))]
    #[diagnostic(code(rigor::setup::fixture_cycle))]
    FixtureCycle { path: Vec<String> },

    #[error("fixture `{0}` is registered more than once")]
    #[diagnostic(code(rigor::setup::duplicate_fixture))]
    DuplicateFixture(String),

    #[error("fixture `{name}` panicked: {message}")]
    #[diagnostic(code(rigor::setup::fixture_failed))]
    FixtureFailed { name: String, message: String },

    #[error("parameter generator for `{test}` panicked: {message}")]
    #[diagnostic(code(rigor::setup::generator_failed))]
    GeneratorFailed { test: String, message: String },

    #[error("cannot bind arguments for `{target}`: {source}")]
    #[diagnostic(
        code(rigor::setup::arguments),
        help("parameter sets and fixtures must match the declared argument types in order")
    )]
    Arguments {
        target: String,
        #[source]
        source: ArgumentError,
    },

    #[error("`{test}` requests variant expansion but declares no variants")]
    #[diagnostic(
        code(rigor::setup::no_variants),
        help("pass at least one `variant!(..)` to `.variants(..)`")
    )]
    NoVariants { test: String },
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
