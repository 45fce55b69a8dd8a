//! Coverage collaborator contract and a probe-based collector
//!
//! The runner does not know how coverage is gathered. A [`CoverageCollector`]
//! wraps one test call: it resets its counters, enables tracking, calls the
//! test, disables tracking and reports every reached address with its hit
//! count. The runner then resolves the addresses to source lines with
//! [`harvest`].
//!
//! Collectors keep process-wide counters and are not safe for concurrent
//! invocations: only one call may be tracked at a time.
//!
//! [`ProbeCollector`] is a pure-Rust collector driven by explicit [`probe!`]
//! markers in the code under test.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::panic::Location;

use rigor_core::{FileCoverage, LineCoverage};

/// One reached instrumentation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageSample {
    pub address: usize,
    pub hits: u64,
}

/// Source position an address resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub file: String,
    pub line: u32,
}

/// Pluggable coverage backend.
pub trait CoverageCollector {
    /// Reset counters, enable tracking, call `thunk`, disable tracking and
    /// append every reached address to `reports`.
    ///
    /// Tracking must be disabled again even if `thunk` unwinds.
    fn run_with_coverage(&mut self, thunk: &mut dyn FnMut(), reports: &mut Vec<CoverageSample>);

    /// Resolve an address reported by [`run_with_coverage`](Self::run_with_coverage).
    fn locate(&self, address: usize) -> Option<SourceLine>;
}

/// Paths of toolchain sources, which are never reported.
const TOOLCHAIN_PATH: &str = "/rustc/";

/// Group samples into per-file line lists, files and lines in ascending order.
///
/// Samples resolving to the same line are summed; unresolvable samples and
/// toolchain sources are dropped.
pub fn harvest(collector: &dyn CoverageCollector, samples: &[CoverageSample]) -> Vec<FileCoverage> {
    let mut files: BTreeMap<String, BTreeMap<u32, u64>> = BTreeMap::new();
    for sample in samples {
        let Some(source) = collector.locate(sample.address) else {
            continue;
        };
        if source.file.contains(TOOLCHAIN_PATH) {
            continue;
        }
        *files.entry(source.file).or_default().entry(source.line).or_default() += sample.hits;
    }

    files
        .into_iter()
        .map(|(filename, lines)| FileCoverage {
            filename,
            lines: lines
                .into_iter()
                .map(|(line, hits)| LineCoverage { line, hits })
                .collect(),
        })
        .collect()
}

// ============================================================================
// Probe collector
// ============================================================================

#[derive(Default)]
struct Probes {
    tracking: bool,
    sites: Vec<&'static Location<'static>>,
    index: HashMap<(&'static str, u32, u32), usize>,
    counters: Vec<u64>,
}

impl Probes {
    fn reset(&mut self) {
        self.counters.iter_mut().for_each(|count| *count = 0);
    }

    fn hit(&mut self, site: &'static Location<'static>) {
        if !self.tracking {
            return;
        }
        let key = (site.file(), site.line(), site.column());
        let address = match self.index.get(&key) {
            Some(address) => *address,
            None => {
                self.sites.push(site);
                self.counters.push(0);
                let address = self.sites.len() - 1;
                self.index.insert(key, address);
                address
            }
        };
        self.counters[address] += 1;
    }
}

thread_local! {
    static PROBES: RefCell<Probes> = RefCell::new(Probes::default());
}

/// Record a hit at the caller's location. Use through [`probe!`].
#[track_caller]
pub fn hit() {
    let site = Location::caller();
    PROBES.with(|probes| probes.borrow_mut().hit(site));
}

/// Mark an instrumented location for [`ProbeCollector`].
///
/// Outside a tracked call this is a no-op.
#[macro_export]
macro_rules! probe {
    () => {
        $crate::coverage::hit()
    };
}

struct Tracking;

impl Tracking {
    fn enable() -> Self {
        PROBES.with(|probes| {
            let mut probes = probes.borrow_mut();
            probes.reset();
            probes.tracking = true;
        });
        Tracking
    }
}

impl Drop for Tracking {
    fn drop(&mut self) {
        PROBES.with(|probes| probes.borrow_mut().tracking = false);
    }
}

/// Collector counting [`probe!`] hits on the running thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbeCollector;

impl ProbeCollector {
    pub fn new() -> Self {
        Self
    }
}

impl CoverageCollector for ProbeCollector {
    fn run_with_coverage(&mut self, thunk: &mut dyn FnMut(), reports: &mut Vec<CoverageSample>) {
        let tracking = Tracking::enable();
        thunk();
        drop(tracking);

        PROBES.with(|probes| {
            let probes = probes.borrow();
            reports.extend(
                probes
                    .counters
                    .iter()
                    .enumerate()
                    .filter(|(_, hits)| **hits > 0)
                    .map(|(address, hits)| CoverageSample { address, hits: *hits }),
            );
        });
    }

    fn locate(&self, address: usize) -> Option<SourceLine> {
        PROBES.with(|probes| {
            probes.borrow().sites.get(address).map(|site| SourceLine {
                file: site.file().to_string(),
                line: site.line(),
            })
        })
    }
}
