//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::identity::{RecordId, RecordPrefix};

/// Represents a KBT project
#[derive(Debug)]
pub struct Project {
    /// Root directory of the project (parent of .kbt/)
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            let kbt_dir = current.join(".kbt");
            if kbt_dir.is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        let kbt_dir = root.join(".kbt");
        if kbt_dir.exists() {
            return Err(ProjectError::AlreadyExists(root.clone()));
        }

        Self::create_structure(&root)?;
        Ok(Self { root })
    }

    /// Force initialization even if .kbt/ exists
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_structure(&root)?;
        Ok(Self { root })
    }

    fn create_structure(root: &Path) -> Result<(), ProjectError> {
        let kbt_dir = root.join(".kbt");
        std::fs::create_dir_all(kbt_dir.join("merges"))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        let config_path = kbt_dir.join("config.yaml");
        std::fs::write(&config_path, Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        for dir in ["suppliers", "materials", "invoices"] {
            std::fs::create_dir_all(root.join(dir))
                .map_err(|e| ProjectError::IoError(e.to_string()))?;
        }

        Ok(())
    }

    fn default_config() -> &'static str {
        r#"# KBT Project Configuration

# Default author for new records (can be overridden by global config)
# author: ""

# Editor to use for `kbt edit` commands (default: $EDITOR)
# editor: ""

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .kbt configuration directory
    pub fn kbt_dir(&self) -> PathBuf {
        self.root.join(".kbt")
    }

    /// Get the directory where in-progress merge intents are journaled
    pub fn merges_dir(&self) -> PathBuf {
        self.kbt_dir().join("merges")
    }

    /// Get the directory for a given record prefix
    pub fn record_directory(prefix: RecordPrefix) -> &'static str {
        match prefix {
            RecordPrefix::Sup => "suppliers",
            RecordPrefix::Mat => "materials",
            RecordPrefix::Inv => "invoices",
        }
    }

    /// Get the directory holding records of a given type
    pub fn record_dir(&self, prefix: RecordPrefix) -> PathBuf {
        self.root.join(Self::record_directory(prefix))
    }

    /// Get the path for a record file
    pub fn record_path(&self, id: &RecordId) -> PathBuf {
        self.record_dir(id.prefix())
            .join(format!("{}.kbt.yaml", id))
    }

}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a KBT project (searched from {searched_from:?}). Run 'kbt init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("KBT project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
