//! Invocation expansion
//!
//! Turns one [`TestDefinition`] into the ordered list of concrete invocations
//! it runs as: literal parameter sets in declaration order, then generator
//! output, each bound against every variant. A definition with no parameter
//! source binds its fixtures instead and yields exactly one invocation.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::debug;

use crate::callable::BoxError;
use crate::definition::{Binder, Target, TestDefinition, Thunk};
use crate::error::{SetupError, panic_message};
use crate::fixture::Fixtures;
use crate::value::{IntoParamSet, ParamSet};

type Generator = Arc<dyn Fn() -> Vec<ParamSet> + Send + Sync>;

/// Where a test's parameter sets come from.
#[derive(Clone)]
pub enum ParamSource {
    /// A fixed list, used in order.
    Literal(Vec<ParamSet>),
    /// A function producing the list, called once per expansion.
    Generator(Generator),
}

impl ParamSource {
    pub fn literal<I, T>(sets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: IntoParamSet,
    {
        Self::Literal(sets.into_iter().map(IntoParamSet::into_param_set).collect())
    }

    pub fn generator<G, I, T>(generator: G) -> Self
    where
        G: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = T>,
        T: IntoParamSet,
    {
        Self::Generator(Arc::new(move || {
            generator()
                .into_iter()
                .map(IntoParamSet::into_param_set)
                .collect()
        }))
    }

    /// Produce the parameter sets. `test` names the owner in errors.
    pub fn sets(&self, test: &str) -> Result<Vec<ParamSet>, SetupError> {
        match self {
            Self::Literal(sets) => Ok(sets.clone()),
            Self::Generator(generator) => {
                panic::catch_unwind(AssertUnwindSafe(|| generator())).map_err(|payload| {
                    SetupError::GeneratorFailed {
                        test: test.to_string(),
                        message: panic_message(&*payload),
                    }
                })
            }
        }
    }
}

impl fmt::Debug for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(sets) => f.debug_tuple("Literal").field(&sets.len()).finish(),
            Self::Generator(_) => f.write_str("Generator"),
        }
    }
}

// ============================================================================
// Invocation
// ============================================================================

/// One concrete, runnable call of a test with bound arguments.
#[derive(Clone)]
pub struct Invocation {
    test: Arc<TestDefinition>,
    name: String,
    thunk: Thunk,
}

impl Invocation {
    pub(crate) fn new(test: Arc<TestDefinition>, name: String, thunk: Thunk) -> Self {
        Self { test, name, thunk }
    }

    /// Placeholder standing for every invocation of a skipped test.
    pub fn skipped(test: &Arc<TestDefinition>) -> Self {
        Self {
            name: format!("{}(...)", test.base_name()),
            test: Arc::clone(test),
            thunk: Arc::new(|| Ok(())),
        }
    }

    pub fn test(&self) -> &Arc<TestDefinition> {
        &self.test
    }

    /// Display name, e.g. `test(a, 10)` or `gt_5<i32, 10>()`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the bound call. Panics propagate to the caller.
    pub fn call(&self) -> Result<(), BoxError> {
        (self.thunk)()
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("test", &self.test.full_name())
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Expansion
// ============================================================================

/// Expand `test` into its invocations, in run order.
#[tracing::instrument(level = "debug", skip_all, fields(test = %test.full_name()))]
pub fn expand(test: &Arc<TestDefinition>, fixtures: &Fixtures) -> Result<Vec<Invocation>, SetupError> {
    let mut invocations = Vec::new();
    match test.target() {
        Target::Single(binder) => expand_target(test, binder, "", fixtures, &mut invocations)?,
        Target::Variants(variants) => {
            if variants.is_empty() {
                return Err(SetupError::NoVariants {
                    test: test.full_name(),
                });
            }
            for variant in variants {
                expand_target(test, variant.binder(), &variant.render(), fixtures, &mut invocations)?;
            }
        }
    }
    debug!(invocations = invocations.len(), "expanded test");
    Ok(invocations)
}

fn expand_target(
    test: &Arc<TestDefinition>,
    binder: &Binder,
    variant: &str,
    fixtures: &Fixtures,
    out: &mut Vec<Invocation>,
) -> Result<(), SetupError> {
    let base = format!("{}{variant}", test.base_name());
    let full_name = test.full_name();

    let sets = if test.is_parameterized() {
        let mut sets = Vec::new();
        for source in test.sources() {
            sets.extend(source.sets(&full_name)?);
        }
        sets
    } else {
        vec![fixtures.resolve(test.fixtures(), &full_name)?]
    };

    for set in sets {
        let name = format!("{base}{}", set.render());
        let thunk = binder(&set).map_err(|source| SetupError::Arguments {
            target: name.clone(),
            source,
        })?;
        out.push(Invocation::new(Arc::clone(test), name, thunk));
    }
    Ok(())
}
