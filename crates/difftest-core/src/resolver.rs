//! Changed path to test target resolution.

use crate::changes::{ChangeSet, FileLister};
use crate::error::Result;
use crate::registry::TargetRegistry;
use tracing::debug;

/// Deduplicated, insertion-ordered set of target binaries selected for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTargetSet {
    binaries: Vec<String>,
}

impl ResolvedTargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `binary` unless already present. Returns whether it was added.
    pub fn insert(&mut self, binary: &str) -> bool {
        if self.contains(binary) {
            return false;
        }
        self.binaries.push(binary.to_string());
        true
    }

    pub fn contains(&self, binary: &str) -> bool {
        self.binaries.iter().any(|b| b == binary)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.binaries.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.binaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binaries.is_empty()
    }
}

/// Select every target whose dependency list contains one of `changed_paths`.
///
/// Paths are compared verbatim. A target is added the first time any changed
/// path matches it.
pub fn resolve<S: AsRef<str>>(registry: &TargetRegistry, changed_paths: &[S]) -> ResolvedTargetSet {
    let mut resolved = ResolvedTargetSet::new();

    for path in changed_paths {
        let path = path.as_ref();
        for target in registry.iter() {
            if target.depends_on(path) && resolved.insert(&target.binary) {
                debug!(path = %path, target = %target.binary, "Path selects target");
            }
        }
    }

    resolved
}

/// Resolve a [`ChangeSet`], expanding `AllFiles` through `lister`.
pub fn resolve_change_set(
    registry: &TargetRegistry,
    change_set: &ChangeSet,
    lister: &dyn FileLister,
) -> Result<ResolvedTargetSet> {
    match change_set {
        ChangeSet::Paths(paths) => Ok(resolve(registry, paths.as_slice())),
        ChangeSet::AllFiles => {
            let paths = lister.list_files()?;
            debug!(files = paths.len(), "Resolving against full file listing");
            Ok(resolve(registry, paths.as_slice()))
        }
    }
}
