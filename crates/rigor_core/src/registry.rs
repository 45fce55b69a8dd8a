//! Test registry
//!
//! Tests and fixtures are registered as factory functions. A [`Registry`]
//! value can be built and passed around explicitly; the process-wide registry
//! behind [`register_test`] and [`register_fixture`] serves binaries that
//! collect their suites from several modules.

use std::ptr;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::definition::TestDefinition;
use crate::error::SetupError;
use crate::fixture::{Fixture, Fixtures};
use crate::namespace::TestNamespace;

pub type TestFactory = fn() -> TestDefinition;
pub type FixtureFactory = fn() -> Fixture;

/// Insertion-ordered collection of test and fixture factories.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    tests: Vec<TestFactory>,
    fixtures: Vec<FixtureFactory>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            tests: Vec::new(),
            fixtures: Vec::new(),
        }
    }

    /// Add a test factory. Registering the same factory twice is a no-op;
    /// returns whether it was added.
    pub fn register(&mut self, factory: TestFactory) -> bool {
        if self.tests.iter().any(|known| ptr::fn_addr_eq(*known, factory)) {
            return false;
        }
        self.tests.push(factory);
        true
    }

    pub fn register_fixture(&mut self, factory: FixtureFactory) -> bool {
        if self.fixtures.iter().any(|known| ptr::fn_addr_eq(*known, factory)) {
            return false;
        }
        self.fixtures.push(factory);
        true
    }

    /// Chaining form of [`register`](Self::register).
    pub fn with_test(mut self, factory: TestFactory) -> Self {
        self.register(factory);
        self
    }

    /// Chaining form of [`register_fixture`](Self::register_fixture).
    pub fn with_fixture(mut self, factory: FixtureFactory) -> Self {
        self.register_fixture(factory);
        self
    }

    /// Every registered test factory, in registration order.
    pub fn all(&self) -> &[TestFactory] {
        &self.tests
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Instantiate every test into a namespace tree.
    pub fn tree(&self) -> TestNamespace {
        TestNamespace::from_tests(self.tests.iter().map(|factory| Arc::new(factory())))
    }

    /// Instantiate every fixture.
    pub fn fixtures(&self) -> Result<Fixtures, SetupError> {
        let mut fixtures = Fixtures::new();
        for factory in &self.fixtures {
            fixtures.insert(factory())?;
        }
        debug!(count = fixtures.len(), "registered fixtures");
        Ok(fixtures)
    }
}

static GLOBAL: Mutex<Registry> = Mutex::new(Registry::new());

/// Add a test to the process-wide registry.
pub fn register_test(factory: TestFactory) -> bool {
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .register(factory)
}

/// Add a fixture to the process-wide registry.
pub fn register_fixture(factory: FixtureFactory) -> bool {
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .register_fixture(factory)
}

/// Copy of the process-wide registry.
pub fn global() -> Registry {
    GLOBAL
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}
