//! Test target catalog.

use serde::{Deserialize, Serialize};

/// A buildable, runnable test binary and the source paths it depends on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestTarget {
    /// Binary path relative to the build directory (also the build target name).
    pub binary: String,

    /// Source paths, relative to the project root, that trigger this target.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl TestTarget {
    /// Create a new target.
    pub fn new<I, S>(binary: impl Into<String>, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            binary: binary.into(),
            dependencies: dependencies.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` is one of this target's dependencies (exact match).
    pub fn depends_on(&self, path: &str) -> bool {
        self.dependencies.iter().any(|d| d == path)
    }
}

/// Ordered catalog of test targets.
///
/// Registration order is the execution and report order. Duplicate
/// registrations are kept as-is.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: Vec<TestTarget>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a target.
    pub fn register(&mut self, target: TestTarget) {
        self.targets.push(target);
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(mut self, target: TestTarget) -> Self {
        self.register(target);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestTarget> {
        self.targets.iter()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl FromIterator<TestTarget> for TargetRegistry {
    fn from_iter<T: IntoIterator<Item = TestTarget>>(iter: T) -> Self {
        Self {
            targets: iter.into_iter().collect(),
        }
    }
}
