use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::RegresqlError;

pub const REGRESS_DIR: &str = "regresql";
pub const CONFIG_FILE: &str = "regress.yaml";

/// Where a suite keeps its artifacts, all under `<root>/regresql/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub root: PathBuf,
    pub regress_dir: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let regress_dir = root.join(REGRESS_DIR);
        Self { root, regress_dir }
    }

    /// Keeps artifacts in `regress_dir` instead of under the root.
    pub fn with_regress_dir(mut self, regress_dir: impl Into<PathBuf>) -> Self {
        self.regress_dir = regress_dir.into();
        self
    }

    pub fn config_file(&self) -> PathBuf {
        self.regress_dir.join(CONFIG_FILE)
    }

    pub fn plans_dir(&self) -> PathBuf {
        self.regress_dir.join("plans")
    }

    pub fn expected_dir(&self) -> PathBuf {
        self.regress_dir.join("expected")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.regress_dir.join("out")
    }

    /// Creates `<root>/regresql`. An existing directory is left alone.
    pub fn create_regress_dir(&self) -> crate::Result<()> {
        if self.regress_dir.is_dir() {
            info!("Directory '{}' already exists", self.regress_dir.display());
            return Ok(());
        }
        ensure_dir(&self.regress_dir)
    }
}

/// `mkdir -p`, skipped when `path` is already there.
pub fn ensure_dir(path: &Path) -> crate::Result<()> {
    if path.is_dir() {
        return Ok(());
    }

    debug!("Creating directory '{}'", path.display());
    std::fs::create_dir_all(path).map_err(|e| {
        RegresqlError::Config(format!(
            "Failed to create directory '{}': {}",
            path.display(),
            e
        ))
    })
}
