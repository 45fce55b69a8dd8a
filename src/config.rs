//! Run configuration
//!
//! `RunConfig` collects every knob the CLI exposes. It can also be built
//! directly through its `with_*` methods when a harness drives runs itself.

use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::ValueEnum;

/// Whether to colour console output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColourMode {
    /// Colour when stdout is a terminal
    #[default]
    Auto,
    Yes,
    No,
}

impl ColourMode {
    pub fn enabled(self) -> bool {
        match self {
            ColourMode::Auto => io::stdout().is_terminal(),
            ColourMode::Yes => true,
            ColourMode::No => false,
        }
    }
}

/// A yes/no command-line switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    Yes,
    No,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> bool {
        toggle == Toggle::Yes
    }
}

/// How much the runner logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    High,
}

impl Verbosity {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub fn log_level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::High => "debug",
        }
    }
}

/// Configuration for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Reporter name (default: "plain")
    pub reporter: String,
    /// Comma-separated test filters, `::`-separated segments each
    pub filter: Option<String>,
    /// Extra segments appended to every filter path
    pub sections: Vec<String>,
    /// Show per-test durations (default: true)
    pub durations: bool,
    pub colour: ColourMode,
    /// List matching tests instead of running them
    pub list_only: bool,
    /// Report destination; stdout when unset
    pub output: Option<PathBuf>,
    /// Capture test stdout/stderr (default: true)
    pub capture: bool,
    pub verbosity: Verbosity,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            reporter: "plain".to_string(),
            filter: None,
            sections: Vec::new(),
            durations: true,
            colour: ColourMode::Auto,
            list_only: false,
            output: None,
            capture: true,
            verbosity: Verbosity::Normal,
        }
    }
}

impl RunConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reporter(mut self, reporter: impl Into<String>) -> Self {
        self.reporter = reporter.into();
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.sections.push(section.into());
        self
    }

    pub fn with_durations(mut self, durations: bool) -> Self {
        self.durations = durations;
        self
    }

    pub fn with_colour(mut self, colour: ColourMode) -> Self {
        self.colour = colour;
        self
    }

    pub fn with_list_only(mut self, list_only: bool) -> Self {
        self.list_only = list_only;
        self
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Namespace-tree filter paths selected by this configuration.
    ///
    /// An empty result selects everything. `*` and `[.],*` also select
    /// everything, optionally narrowed by sections.
    pub fn filter_paths(&self) -> Vec<Vec<String>> {
        let filter = self.filter.as_deref().map(str::trim).unwrap_or_default();
        let patterns: Vec<&str> = match filter {
            "" | "*" | "[.],*" => Vec::new(),
            _ => filter
                .split(',')
                .map(str::trim)
                .filter(|pattern| !pattern.is_empty())
                .collect(),
        };

        if patterns.is_empty() {
            return if self.sections.is_empty() {
                Vec::new()
            } else {
                vec![self.sections.clone()]
            };
        }

        patterns
            .into_iter()
            .map(|pattern| {
                let mut path: Vec<String> = pattern
                    .split("::")
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect();
                path.extend(self.sections.iter().cloned());
                path
            })
            .collect()
    }
}
