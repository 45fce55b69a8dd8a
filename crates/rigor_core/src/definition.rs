//! Test definitions
//!
//! A [`TestDefinition`] is the immutable identity of one discovered test unit:
//! its qualified name, source location, run-time flags, parameter sources and
//! the target it binds arguments to. Definitions are built with
//! [`TestDefinition::builder`] and expanded into invocations by
//! [`expand`](crate::expand::expand).

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use crate::callable::{BoxError, Callable, TestReturn};
use crate::error::ArgumentError;
use crate::expand::ParamSource;
use crate::value::{FromArgs, IntoParamSet, ParamSet};

pub(crate) type Thunk = Arc<dyn Fn() -> Result<(), BoxError> + Send + Sync>;
pub(crate) type Binder = Arc<dyn Fn(&ParamSet) -> Result<Thunk, ArgumentError> + Send + Sync>;

/// Run-time skip predicate.
pub type SkipPredicate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Where a test was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    /// Location of the caller of the enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: location.file(),
            line: location.line(),
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

fn binder<Args, F>(body: F) -> Binder
where
    F: Callable<Args>,
    F::Output: TestReturn,
    Args: FromArgs + Clone + Send + Sync + 'static,
{
    let body = Arc::new(body);
    Arc::new(move |set: &ParamSet| {
        let args = Args::from_args(set)?;
        let body = Arc::clone(&body);
        let thunk: Thunk = Arc::new(move || body.call(args.clone()).into_result());
        Ok(thunk)
    })
}

// ============================================================================
// Variants
// ============================================================================

/// One type/value specialisation of a parameterised test.
///
/// A variant carries its own pre-monomorphised target, so expansion never
/// needs to instantiate anything: it binds each parameter set against every
/// variant in turn.
#[derive(Clone)]
pub struct Variant {
    labels: Vec<String>,
    binder: Binder,
}

impl Variant {
    pub fn new<L, S, Args, F>(labels: L, body: F) -> Self
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
        F: Callable<Args>,
        F::Output: TestReturn,
        Args: FromArgs + Clone + Send + Sync + 'static,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
            binder: binder(body),
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Bracketed label list, e.g. `<i32, 10>`.
    pub fn render(&self) -> String {
        format!("<{}>", self.labels.join(", "))
    }

    pub(crate) fn binder(&self) -> &Binder {
        &self.binder
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Variant").field(&self.render()).finish()
    }
}

/// Build a [`Variant`] from a generic function and its generic arguments.
///
/// ```ignore
/// fn gt_5<T, const I: i32>() { check!(I > 5); }
/// let variants = vec![variant!(gt_5::<i32, 10>), variant!(gt_5::<f32, 21>)];
/// ```
///
/// Each generic argument must be a single token tree; wrap compound types in
/// parentheses.
#[macro_export]
macro_rules! variant {
    ($target:ident :: < $($arg:tt),+ $(,)? >) => {
        $crate::Variant::new([$(::std::stringify!($arg)),+], $target::<$($arg),+>)
    };
}

// ============================================================================
// TestDefinition
// ============================================================================

pub(crate) enum Target {
    Single(Binder),
    Variants(Vec<Variant>),
}

/// Identity of one discovered test unit.
pub struct TestDefinition {
    name: String,
    display_name: Option<String>,
    qualified_name: Vec<String>,
    location: SourceLocation,
    expect_failure: bool,
    skip: SkipPredicate,
    sources: Vec<ParamSource>,
    fixtures: Vec<String>,
    target: Target,
}

impl TestDefinition {
    /// Start a definition. `name` may be `::`-qualified (`a::b::test`).
    #[track_caller]
    pub fn builder(name: impl Into<String>) -> TestBuilder {
        TestBuilder::new(name.into(), SourceLocation::caller())
    }

    /// Raw name, the last segment of the qualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name invocations are displayed under: the rename if any, else the raw name.
    pub fn base_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    /// Qualified name segments, outermost first. The last segment is [`name`](Self::name).
    pub fn qualified_name(&self) -> &[String] {
        &self.qualified_name
    }

    pub fn full_name(&self) -> String {
        self.qualified_name.join("::")
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn expect_failure(&self) -> bool {
        self.expect_failure
    }

    /// Evaluate the skip predicate.
    pub fn should_skip(&self) -> bool {
        (self.skip)()
    }

    pub fn sources(&self) -> &[ParamSource] {
        &self.sources
    }

    /// Fixture names bound when no parameter source is declared.
    pub fn fixtures(&self) -> &[String] {
        &self.fixtures
    }

    pub fn is_parameterized(&self) -> bool {
        !self.sources.is_empty()
    }

    pub fn variants(&self) -> Option<&[Variant]> {
        match &self.target {
            Target::Single(_) => None,
            Target::Variants(variants) => Some(variants),
        }
    }

    pub(crate) fn target(&self) -> &Target {
        &self.target
    }

    /// Whether a filter segment names this test.
    ///
    /// Matches the raw or display name, either verbatim or with a variant /
    /// argument suffix stripped (`test(a, 10)` matches `test`).
    pub fn matches_name(&self, segment: &str) -> bool {
        let stripped = strip_decorations(segment);
        [self.name.as_str(), self.base_name()]
            .iter()
            .any(|name| *name == segment || *name == stripped)
    }
}

impl fmt::Debug for TestDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDefinition")
            .field("qualified_name", &self.qualified_name)
            .field("display_name", &self.display_name)
            .field("location", &self.location)
            .field("expect_failure", &self.expect_failure)
            .field("sources", &self.sources)
            .field("fixtures", &self.fixtures)
            .field("variants", &self.variants())
            .finish_non_exhaustive()
    }
}

/// Strip a `<..>` variant list and `(..)` argument list from a display name.
pub fn strip_decorations(display: &str) -> &str {
    match display.find(|c| c == '<' || c == '(') {
        Some(idx) => &display[..idx],
        None => display,
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`TestDefinition`].
pub struct TestBuilder {
    name: String,
    namespace: Vec<String>,
    display_name: Option<String>,
    location: SourceLocation,
    expect_failure: bool,
    skip: Option<SkipPredicate>,
    sources: Vec<ParamSource>,
    fixtures: Vec<String>,
}

impl TestBuilder {
    fn new(name: String, location: SourceLocation) -> Self {
        let mut segments = split_path(&name);
        let name = segments.pop().unwrap_or_default();
        Self {
            name,
            namespace: segments,
            display_name: None,
            location,
            expect_failure: false,
            skip: None,
            sources: Vec::new(),
            fixtures: Vec::new(),
        }
    }

    /// Set the enclosing namespace segments, outermost first.
    pub fn namespace<I, S>(mut self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.namespace = segments.into_iter().map(Into::into).collect();
        self
    }

    /// Set the enclosing namespace from a Rust module path (`module_path!()`).
    pub fn module(self, path: &str) -> Self {
        let segments = split_path(path);
        self.namespace(segments)
    }

    /// Display invocations under `name` instead of the raw name.
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Override the recorded source location.
    pub fn located(mut self, file: &'static str, line: u32) -> Self {
        self.location = SourceLocation { file, line };
        self
    }

    /// Invert the pass/fail decision.
    pub fn expect_failure(mut self) -> Self {
        self.expect_failure = true;
        self
    }

    /// Always skip.
    pub fn skip(self) -> Self {
        self.skip_if(|| true)
    }

    /// Skip when `predicate` returns true at run time.
    pub fn skip_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.skip = Some(Arc::new(predicate));
        self
    }

    /// Add a literal parameter source.
    pub fn params<I, T>(mut self, sets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoParamSet,
    {
        self.sources.push(ParamSource::literal(sets));
        self
    }

    /// Add a generator parameter source, called once per expansion.
    pub fn generator<G, I, T>(mut self, generator: G) -> Self
    where
        G: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: IntoParamSet,
    {
        self.sources.push(ParamSource::generator(generator));
        self
    }

    pub fn source(mut self, source: ParamSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Fixture names to bind, in argument order, when no parameter source is declared.
    pub fn fixtures<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fixtures = names.into_iter().map(Into::into).collect();
        self
    }

    /// Finish with a single test body.
    pub fn run<Args, F>(self, body: F) -> TestDefinition
    where
        F: Callable<Args>,
        F::Output: TestReturn,
        Args: FromArgs + Clone + Send + Sync + 'static,
    {
        self.finish(Target::Single(binder(body)))
    }

    /// Finish with a list of type/value variants.
    pub fn variants(self, variants: Vec<Variant>) -> TestDefinition {
        self.finish(Target::Variants(variants))
    }

    fn finish(self, target: Target) -> TestDefinition {
        let mut qualified_name = self.namespace;
        qualified_name.push(self.name.clone());
        TestDefinition {
            name: self.name,
            display_name: self.display_name,
            qualified_name,
            location: self.location,
            expect_failure: self.expect_failure,
            skip: self.skip.unwrap_or_else(|| Arc::new(|| false)),
            sources: self.sources,
            fixtures: self.fixtures,
            target,
        }
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split("::")
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
