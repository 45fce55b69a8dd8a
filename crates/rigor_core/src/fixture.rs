//! Fixtures
//!
//! A fixture is a named producer of a test argument. Fixtures may depend on
//! other fixtures by name; dependencies are resolved depth-first and a fresh
//! value is produced every time a fixture is requested.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::trace;

use crate::callable::Callable;
use crate::error::{ArgumentError, SetupError, panic_message};
use crate::value::{FromArgs, ParamSet, Repr, Value};

type Producer = Arc<dyn Fn(&ParamSet) -> Result<Value, ArgumentError> + Send + Sync>;

/// A named, registered value producer.
#[derive(Clone)]
pub struct Fixture {
    name: String,
    dependencies: Vec<String>,
    producer: Producer,
}

impl Fixture {
    /// Register `producer` under `name`. Its arguments are bound from the
    /// fixtures named in [`depends_on`](Self::depends_on), in order.
    pub fn new<Args, F>(name: impl Into<String>, producer: F) -> Self
    where
        F: Callable<Args>,
        F::Output: Any + Send + Sync + Repr,
        Args: FromArgs + 'static,
    {
        let producer: Producer = Arc::new(move |args: &ParamSet| {
            let args = Args::from_args(args)?;
            Ok(Value::new(producer.call(args)))
        });
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            producer,
        }
    }

    pub fn depends_on<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

/// The set of fixtures visible to a run, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    by_name: HashMap<String, Fixture>,
}

impl Fixtures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, fixture: Fixture) -> Result<(), SetupError> {
        if self.by_name.contains_key(fixture.name()) {
            return Err(SetupError::DuplicateFixture(fixture.name));
        }
        self.by_name.insert(fixture.name.clone(), fixture);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Fixture> {
        self.by_name.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Produce fresh values for `names`, in order.
    ///
    /// `required_by` names the requesting test in errors.
    pub fn resolve(&self, names: &[String], required_by: &str) -> Result<ParamSet, SetupError> {
        let mut stack = Vec::new();
        names
            .iter()
            .map(|name| self.produce(name, required_by, &mut stack))
            .collect()
    }

    fn produce(&self, name: &str, required_by: &str, stack: &mut Vec<String>) -> Result<Value, SetupError> {
        if let Some(start) = stack.iter().position(|entry| entry == name) {
            let mut path = stack[start..].to_vec();
            path.push(name.to_string());
            return Err(SetupError::FixtureCycle { path });
        }

        let fixture = self.by_name.get(name).ok_or_else(|| SetupError::MissingFixture {
            name: name.to_string(),
            required_by: stack.last().map_or_else(|| required_by.to_string(), Clone::clone),
        })?;

        stack.push(name.to_string());
        let dependencies = fixture
            .dependencies
            .iter()
            .map(|dependency| self.produce(dependency, required_by, stack))
            .collect::<Result<ParamSet, _>>()?;
        stack.pop();

        trace!(fixture = name, "producing fixture value");
        panic::catch_unwind(AssertUnwindSafe(|| (fixture.producer)(&dependencies)))
            .map_err(|payload| SetupError::FixtureFailed {
                name: name.to_string(),
                message: panic_message(&*payload),
            })?
            .map_err(|source| SetupError::Arguments {
                target: format!("fixture `{name}`"),
                source,
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_with_dependency() {
        let mut fixtures = Fixtures::new();
        fixtures.insert(Fixture::new("meta_fixture", || 21)).unwrap();
        fixtures
            .insert(Fixture::new("fixture", |meta: i32| meta * 2).depends_on(["meta_fixture"]))
            .unwrap();

        let set = fixtures.resolve(&names(&["fixture"]), "suite::test").unwrap();
        assert_eq!(set.render(), "(42)");
    }

    #[test]
    fn test_fresh_value_per_request() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let mut fixtures = Fixtures::new();
        fixtures
            .insert(Fixture::new("counter", || CALLS.fetch_add(1, Ordering::SeqCst)))
            .unwrap();

        let set = fixtures.resolve(&names(&["counter", "counter"]), "t").unwrap();
        assert_eq!(set.render(), "(0, 1)");
    }

    #[test]
    fn test_missing_fixture() {
        let fixtures = Fixtures::new();
        let err = fixtures.resolve(&names(&["absent"]), "suite::test").unwrap_err();
        assert!(matches!(
            err,
            SetupError::MissingFixture { ref name, ref required_by } if name == "absent" && required_by == "suite::test"
        ));
    }

    #[test]
    fn test_missing_dependency_names_requiring_fixture() {
        let mut fixtures = Fixtures::new();
        fixtures
            .insert(Fixture::new("outer", |x: i32| x).depends_on(["inner"]))
            .unwrap();
        let err = fixtures.resolve(&names(&["outer"]), "t").unwrap_err();
        assert!(matches!(err, SetupError::MissingFixture { ref required_by, .. } if required_by == "outer"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut fixtures = Fixtures::new();
        fixtures.insert(Fixture::new("a", |x: i32| x).depends_on(["b"])).unwrap();
        fixtures.insert(Fixture::new("b", |x: i32| x).depends_on(["a"])).unwrap();
        let err = fixtures.resolve(&names(&["a"]), "t").unwrap_err();
        match err {
            SetupError::FixtureCycle { path } => assert_eq!(path, vec!["a", "b", "a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut fixtures = Fixtures::new();
        fixtures.insert(Fixture::new("x", || 1)).unwrap();
        let err = fixtures.insert(Fixture::new("x", || 2)).unwrap_err();
        assert!(matches!(err, SetupError::DuplicateFixture(ref name) if name == "x"));
        assert_eq!(fixtures.len(), 1);
    }

    #[test]
    fn test_dependency_type_mismatch() {
        let mut fixtures = Fixtures::new();
        fixtures.insert(Fixture::new("text", || "hello")).unwrap();
        fixtures
            .insert(Fixture::new("number", |x: i32| x).depends_on(["text"]))
            .unwrap();
        let err = fixtures.resolve(&names(&["number"]), "t").unwrap_err();
        assert!(matches!(err, SetupError::Arguments { .. }));
    }
}
