//! Run plan
//!
//! A [`TestPlan`] is a filtered namespace tree with every test expanded into
//! its invocations. Building the plan is where setup errors surface, so a
//! plan that exists can be executed without further failure modes beyond the
//! tests themselves.

use std::sync::Arc;

use tracing::info;

use crate::definition::TestDefinition;
use crate::error::SetupError;
use crate::expand::{Invocation, expand};
use crate::fixture::Fixtures;
use crate::namespace::TestNamespace;

/// One definition and the invocations it expanded into.
#[derive(Debug, Clone)]
pub struct PlannedTest {
    test: Arc<TestDefinition>,
    invocations: Vec<Invocation>,
}

impl PlannedTest {
    pub fn test(&self) -> &Arc<TestDefinition> {
        &self.test
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }
}

/// Namespace node of a [`TestPlan`], mirroring [`TestNamespace`].
#[derive(Debug, Clone, Default)]
pub struct PlannedNamespace {
    name: String,
    tests: Vec<PlannedTest>,
    children: Vec<PlannedNamespace>,
}

impl PlannedNamespace {
    fn build(node: &TestNamespace, fixtures: &Fixtures) -> Result<Self, SetupError> {
        let children = node
            .children()
            .iter()
            .map(|child| Self::build(child, fixtures))
            .collect::<Result<Vec<_>, _>>()?;
        let tests = node
            .tests()
            .iter()
            .map(|test| {
                Ok(PlannedTest {
                    test: Arc::clone(test),
                    invocations: expand(test, fixtures)?,
                })
            })
            .collect::<Result<Vec<_>, SetupError>>()?;
        Ok(Self {
            name: node.name().to_string(),
            tests,
            children,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tests(&self) -> &[PlannedTest] {
        &self.tests
    }

    pub fn children(&self) -> &[PlannedNamespace] {
        &self.children
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a PlannedTest>) {
        for child in &self.children {
            child.collect(out);
        }
        out.extend(self.tests.iter());
    }
}

/// Expanded, ready-to-run test tree.
#[derive(Debug, Clone, Default)]
pub struct TestPlan {
    root: PlannedNamespace,
}

impl TestPlan {
    /// Expand every test in `tree`.
    #[tracing::instrument(skip_all, fields(tests = tree.count()))]
    pub fn build(tree: &TestNamespace, fixtures: &Fixtures) -> Result<Self, SetupError> {
        let root = PlannedNamespace::build(tree, fixtures)?;
        let plan = Self { root };
        info!(
            tests = plan.test_count(),
            invocations = plan.invocation_count(),
            "built test plan"
        );
        Ok(plan)
    }

    pub fn root(&self) -> &PlannedNamespace {
        &self.root
    }

    /// Planned tests in depth-first order, children before own tests.
    pub fn tests(&self) -> Vec<&PlannedTest> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    pub fn test_count(&self) -> usize {
        self.tests().len()
    }

    pub fn invocation_count(&self) -> usize {
        self.tests().iter().map(|planned| planned.invocations.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.test_count() == 0
    }
}
