//! Demonstration suite for the rigor test runner
//!
//! ```text
//! cargo run -p rigor_demos -- --list-tests
//! cargo run -p rigor_demos -- demo::params -r junit
//! ```
//!
//! Several tests here fail on purpose to show how failures are reported.

mod basics;
mod conditional;
mod coverage;
mod fixtures;
mod output;
mod params;
mod tparams;

use rigor::Registry;
use rigor::cli::{self, Harness};
use rigor::coverage::ProbeCollector;

fn main() {
    let mut registry = Registry::new();
    basics::register(&mut registry);
    conditional::register(&mut registry);
    fixtures::register(&mut registry);
    params::register(&mut registry);
    tparams::register(&mut registry);
    output::register(&mut registry);
    coverage::register(&mut registry);

    let harness = Harness::new(registry).with_coverage(Box::new(ProbeCollector::new()));
    cli::run(harness);
}
