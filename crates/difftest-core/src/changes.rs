//! Changed-path providers.
//!
//! A run is driven either by an explicit list of changed paths or by the full
//! listing of the project tree. Paths are project-root relative and use `/`
//! separators, matching how target dependencies are declared.

use crate::error::{DifftestError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

/// Input to target resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSet {
    /// Explicit changed paths, used verbatim.
    Paths(Vec<String>),

    /// Every file in the project tree.
    AllFiles,
}

impl ChangeSet {
    /// Build a change set from CLI-style input: `all` wins over `paths`.
    pub fn from_selection(all: bool, paths: Vec<String>) -> Self {
        if all {
            ChangeSet::AllFiles
        } else {
            ChangeSet::Paths(paths)
        }
    }
}

/// Source of the full project file listing.
pub trait FileLister: Send + Sync {
    fn list_files(&self) -> Result<Vec<String>>;
}

/// Lists files under a project root with `walkdir`.
///
/// `.git` and any configured excluded directories (the build directory) are
/// skipped.
#[derive(Debug, Clone)]
pub struct WalkdirLister {
    root: PathBuf,
    excluded: Vec<PathBuf>,
}

impl WalkdirLister {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded: vec![PathBuf::from(".git")],
        }
    }

    /// Skip a root-relative directory.
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        self.excluded.push(dir.into());
        self
    }

    fn is_excluded(&self, relative: &Path) -> bool {
        self.excluded.iter().any(|e| relative.starts_with(e))
    }
}

impl FileLister for WalkdirLister {
    fn list_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| match entry.path().strip_prefix(&self.root) {
                Ok(relative) => relative.as_os_str().is_empty() || !self.is_excluded(relative),
                Err(_) => true,
            });

        for entry in walker {
            let entry = entry.map_err(|e| DifftestError::Listing(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                files.push(to_slash_path(relative));
            }
        }

        Ok(files)
    }
}

/// Paths changed since `since`, via `git diff --name-only`.
///
/// Output paths are relative to `root` (`--relative`), so they line up with
/// declared dependencies when `root` is the project root.
pub fn git_changed_paths(root: &Path, since: &str) -> Result<Vec<String>> {
    let output = Command::new("git")
        .args(["diff", "--name-only", "--relative", since])
        .current_dir(root)
        .output()
        .map_err(|e| DifftestError::Git(format!("failed to run git: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DifftestError::Git(format!(
            "git diff --name-only {since} failed: {}",
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
