//! Test namespace tree
//!
//! Definitions are grouped by their qualified-name prefix into a tree of
//! namespaces. Traversal is depth-first: a node's child namespaces are
//! visited before its own tests, and both keep insertion order.

use std::slice;
use std::sync::Arc;

use crate::definition::TestDefinition;

#[derive(Debug, Clone, Default)]
pub struct TestNamespace {
    name: String,
    tests: Vec<Arc<TestDefinition>>,
    children: Vec<TestNamespace>,
}

impl TestNamespace {
    /// An unnamed root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Build a tree from definitions, in the given order.
    pub fn from_tests<I>(tests: I) -> Self
    where
        I: IntoIterator<Item = Arc<TestDefinition>>,
    {
        let mut root = Self::root();
        for test in tests {
            root.insert(test);
        }
        root
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tests placed directly at this node.
    pub fn tests(&self) -> &[Arc<TestDefinition>] {
        &self.tests
    }

    pub fn children(&self) -> &[TestNamespace] {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<&TestNamespace> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Place `test` at the node named by its qualified-name prefix,
    /// creating intermediate namespaces as needed.
    pub fn insert(&mut self, test: Arc<TestDefinition>) {
        let depth = test.qualified_name().len().saturating_sub(1);
        let mut node = self;
        for segment in &test.qualified_name()[..depth] {
            node = node.child_entry(segment);
        }
        node.tests.push(test);
    }

    fn child_entry(&mut self, name: &str) -> &mut TestNamespace {
        let index = match self.children.iter().position(|child| child.name == name) {
            Some(index) => index,
            None => {
                self.children.push(Self::new(name));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Number of tests in this subtree.
    pub fn count(&self) -> usize {
        self.tests.len() + self.children.iter().map(Self::count).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty() && self.children.is_empty()
    }

    /// Prune to the subtree selected by a name path.
    ///
    /// Each segment first selects a child namespace of that name, dropping
    /// everything else at the current level. When no child matches, the
    /// segment selects tests at the current level by name and all children
    /// are dropped; a test only matches as the last segment of the path. An
    /// empty path leaves the tree untouched.
    pub fn filter<S: AsRef<str>>(&mut self, path: &[S]) {
        let Some((first, rest)) = path.split_first() else {
            return;
        };
        let first = first.as_ref();

        if let Some(index) = self.children.iter().position(|child| child.name == first) {
            let mut child = self.children.swap_remove(index);
            child.filter(rest);
            self.children = vec![child];
            self.tests.clear();
        } else {
            self.children.clear();
            if rest.is_empty() {
                self.tests.retain(|test| test.matches_name(first));
            } else {
                self.tests.clear();
            }
        }
    }

    /// Union of the trees selected by each path, in first-selected order.
    ///
    /// No paths leaves the tree untouched.
    pub fn filter_any<S: AsRef<str>>(&mut self, paths: &[Vec<S>]) {
        if paths.is_empty() {
            return;
        }
        let mut selected = Self {
            name: self.name.clone(),
            ..Self::default()
        };
        for path in paths {
            let mut pruned = self.clone();
            pruned.filter(path);
            selected.merge(pruned);
        }
        *self = selected;
    }

    /// Add every test of `other` not already present.
    fn merge(&mut self, other: TestNamespace) {
        for test in other.iter() {
            if !self.iter().any(|existing| Arc::ptr_eq(existing, test)) {
                self.insert(Arc::clone(test));
            }
        }
    }

    /// Depth-first traversal. Each call starts a fresh pass.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            stack: vec![Frame::new(self)],
        }
    }
}

impl<'a> IntoIterator for &'a TestNamespace {
    type Item = &'a Arc<TestDefinition>;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

struct Frame<'a> {
    children: slice::Iter<'a, TestNamespace>,
    tests: slice::Iter<'a, Arc<TestDefinition>>,
}

impl<'a> Frame<'a> {
    fn new(node: &'a TestNamespace) -> Self {
        Self {
            children: node.children.iter(),
            tests: node.tests.iter(),
        }
    }
}

/// Depth-first iterator over a [`TestNamespace`].
pub struct Iter<'a> {
    stack: Vec<Frame<'a>>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Arc<TestDefinition>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let frame = self.stack.last_mut()?;
            if let Some(child) = frame.children.next() {
                self.stack.push(Frame::new(child));
                continue;
            }
            if let Some(test) = frame.tests.next() {
                return Some(test);
            }
            self.stack.pop();
        }
    }
}
