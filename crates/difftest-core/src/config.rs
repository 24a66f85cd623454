//! Toolchain configuration and the `difftest.toml` manifest.

use crate::error::{DifftestError, Result};
use crate::registry::{TargetRegistry, TestTarget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default manifest file name at the project root.
pub const MANIFEST_FILE: &str = "difftest.toml";

/// External tools and directories used by a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Toolchain {
    /// Configure command, invoked as `<configure> <project_root>`.
    pub configure: String,

    /// Build command, invoked as `<build> <binary> -j<jobs>`.
    pub build: String,

    /// Parallelism hint forwarded to the build tool.
    pub jobs: u32,

    /// Build output directory, relative to the project root unless absolute.
    pub build_dir: PathBuf,

    /// Subdirectory created inside the build directory before configuring.
    pub work_subdir: PathBuf,

    /// Flag that makes a test binary print its JSON report.
    pub json_flag: String,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            configure: "cmake".to_string(),
            build: "make".to_string(),
            jobs: 8,
            build_dir: PathBuf::from("UnitTests"),
            work_subdir: PathBuf::from("tests"),
            json_flag: "--json".to_string(),
        }
    }
}

impl Toolchain {
    /// Absolute build directory for `project_root`.
    pub fn build_dir_in(&self, project_root: &Path) -> PathBuf {
        if self.build_dir.is_absolute() {
            self.build_dir.clone()
        } else {
            project_root.join(&self.build_dir)
        }
    }

    /// The `-j<jobs>` argument.
    pub fn jobs_arg(&self) -> String {
        format!("-j{}", self.jobs)
    }
}

/// Contents of `difftest.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub toolchain: Toolchain,

    #[serde(default, rename = "target")]
    pub targets: Vec<TestTarget>,
}

impl Manifest {
    /// Parse a manifest from TOML text.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|e| DifftestError::Manifest {
            path: origin.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load a manifest from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DifftestError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml(&text, path)
    }

    /// Registry of the declared targets, in declaration order.
    pub fn registry(&self) -> TargetRegistry {
        self.targets.iter().cloned().collect()
    }
}
