//! Command-line front end for test binaries
//!
//! A test binary builds a [`Harness`] from its registered tests and hands it
//! to [`run`], which parses the command line, runs the selected tests and
//! exits with the run's status.
//!
//! ## Options
//!
//! - `[FILTER]` - comma-separated `::` paths selecting tests (`*` selects all)
//! - `-r, --reporter <NAME>` - `plain`, `junit`, `xml`/`catch2` or `json`
//! - `-d, --durations <yes|no>` - show per-test durations
//! - `--list-tests` - list the selected tests instead of running them
//! - `--use-colour <auto|yes|no>` - colour console output
//! - `-c, --section <NAME>` - narrow every filter by one more segment
//! - `-o, --out <FILE>` - write the report to a file
//! - `-v, --verbosity <quiet|normal|high>` - log level when `RUST_LOG` is unset
//! - `-s, --nocapture` - let test output through instead of capturing it
//!
//! ## Design
//!
//! Everything below [`run`] returns `CliResult<T>`; only `run` prints errors
//! and calls `process::exit`. Setup errors render as `miette` diagnostics.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::fmt;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;
use rigor_core::{Registry, SetupError, TestPlan};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::config::{ColourMode, RunConfig, Toggle, Verbosity};
use crate::coverage::CoverageCollector;
use crate::reporter::{self, Output, ReporterError};
use crate::runner::{RunSummary, Runner};

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<SetupError> for CliError {
    fn from(err: SetupError) -> Self {
        CliError::failure(format!("{:?}", miette::Report::new(err)))
    }
}

impl From<ReporterError> for CliError {
    fn from(err: ReporterError) -> Self {
        CliError::failure(format!("Error: {err}"))
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        CliError::failure(format!("Error writing report: {err}"))
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Run the tests compiled into this binary
#[derive(Parser, Debug)]
#[command(version, about = "Run the tests compiled into this binary", long_about = None)]
pub struct Cli {
    /// Comma-separated test paths, e.g. `suite::inner,other`
    #[arg(value_name = "FILTER")]
    pub filter: Option<String>,

    /// Reporter to use
    #[arg(short, long, value_name = "NAME", default_value = "plain")]
    pub reporter: String,

    /// Show per-test durations
    #[arg(short, long, value_enum, default_value = "yes")]
    pub durations: Toggle,

    /// List the selected tests without running them
    #[arg(long = "list-tests")]
    pub list_tests: bool,

    /// Colour console output
    #[arg(long = "use-colour", value_enum, default_value = "auto")]
    pub colour: ColourMode,

    /// Append a segment to every filter path (repeatable)
    #[arg(short = 'c', long = "section", value_name = "NAME")]
    pub sections: Vec<String>,

    /// Write the report to FILE instead of stdout
    #[arg(short, long = "out", value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Logging verbosity when RUST_LOG is unset
    #[arg(short, long, value_enum, default_value = "normal")]
    pub verbosity: Verbosity,

    /// Do not capture test stdout/stderr
    #[arg(short = 's', long = "nocapture")]
    pub nocapture: bool,
}

impl Cli {
    /// The run configuration these arguments describe.
    pub fn config(&self) -> RunConfig {
        RunConfig {
            reporter: self.reporter.clone(),
            filter: self.filter.clone(),
            sections: self.sections.clone(),
            durations: self.durations.into(),
            colour: self.colour,
            list_only: self.list_tests,
            output: self.out.clone(),
            capture: !self.nocapture,
            verbosity: self.verbosity,
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// The tests of one binary, ready to be run under a [`RunConfig`].
pub struct Harness {
    registry: Registry,
    coverage: Option<Box<dyn CoverageCollector>>,
}

impl Harness {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            coverage: None,
        }
    }

    /// Harness over the process-wide registry.
    pub fn global() -> Self {
        Self::new(rigor_core::registry::global())
    }

    pub fn with_coverage(mut self, collector: Box<dyn CoverageCollector>) -> Self {
        self.coverage = Some(collector);
        self
    }

    /// Run with the report going where `config.output` says.
    ///
    /// A live reporter has no document to write, so a report file is only
    /// accepted with it when listing.
    pub fn execute(self, config: &RunConfig) -> CliResult<ExitCode> {
        if let Some(path) = &config.output {
            if reporter::is_live(&config.reporter) && !config.list_only {
                return Err(CliError::failure(format!(
                    "Error: reporter `{}` writes to the terminal and cannot write `{}`; use junit, xml or json",
                    config.reporter,
                    path.display()
                )));
            }
        }
        let mut out = Output::open(config.output.as_deref())?;
        self.execute_with(config, &mut out)
    }

    /// Run with the report going to `out`.
    ///
    /// Live console output still goes to stdout; `out` receives listings and
    /// the documents of accumulating reporters.
    pub fn execute_with(self, config: &RunConfig, out: &mut dyn Write) -> CliResult<ExitCode> {
        let mut tree = self.registry.tree();
        let paths = config.filter_paths();
        tree.filter_any(&paths);
        debug!(filters = paths.len(), selected = tree.count(), "filtered tests");

        let mut reporter = reporter::make(&config.reporter, config)?;
        let fixtures = self.registry.fixtures()?;
        let plan = TestPlan::build(&tree, &fixtures)?;
        if config.list_only {
            reporter.list_tests(&plan, out)?;
            return Ok(ExitCode::SUCCESS);
        }

        info!(
            tests = plan.test_count(),
            invocations = plan.invocation_count(),
            "starting run"
        );

        let mut runner = Runner::new().with_capture(config.capture);
        if let Some(collector) = self.coverage {
            runner = runner.with_coverage(collector);
        }
        let results = runner.run(&plan, &mut *reporter);
        reporter.finalize(out)?;
        out.flush()?;

        if RunSummary::new(&results).success() {
            Ok(ExitCode::SUCCESS)
        } else {
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Install the `tracing` subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `verbosity`. A subscriber installed earlier is kept.
pub fn init_logging(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_level()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Main entry point of a test binary.
///
/// This is the only place where `process::exit` is called.
pub fn run(harness: Harness) {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    match harness.execute(&cli.config()) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["tests"]).unwrap();
        assert_eq!(cli.config(), RunConfig::default());
    }

    #[test]
    fn test_cli_parse_options() {
        let cli = Cli::try_parse_from([
            "tests",
            "suite::inner",
            "-r",
            "junit",
            "-d",
            "no",
            "--use-colour",
            "yes",
            "-c",
            "leaf",
            "-o",
            "report.xml",
            "-v",
            "high",
            "-s",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.filter.as_deref(), Some("suite::inner"));
        assert_eq!(config.reporter, "junit");
        assert!(!config.durations);
        assert_eq!(config.colour, ColourMode::Yes);
        assert_eq!(config.sections, vec!["leaf".to_string()]);
        assert_eq!(config.output, Some(PathBuf::from("report.xml")));
        assert_eq!(config.verbosity, Verbosity::High);
        assert!(!config.capture);
    }

    #[test]
    fn test_cli_list_tests_flag() {
        let cli = Cli::try_parse_from(["tests", "--list-tests"]).unwrap();
        assert!(cli.config().list_only);
    }

    #[test]
    fn test_cli_rejects_bad_toggle() {
        assert!(Cli::try_parse_from(["tests", "--durations", "maybe"]).is_err());
    }

    #[test]
    fn test_setup_error_message() {
        let err = CliError::from(SetupError::DuplicateFixture("db".into()));
        assert_eq!(err.exit_code, ExitCode::FAILURE);
        assert!(err.message.contains("is registered more than once"));
    }
}
