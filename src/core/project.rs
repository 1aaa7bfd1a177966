//! Project discovery and initialization
//!
//! A project is any directory holding a `.coilqc/` marker directory. The
//! document collections live next to it in the project root.

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::core::store::{StoreError, YamlStore};

/// Name of the marker directory
pub const PROJECT_DIR: &str = ".coilqc";

/// Project configuration file inside [`PROJECT_DIR`]
pub const CONFIG_FILE: &str = "config.yaml";

const DEFAULT_CONFIG: &str = "\
# coilqc project configuration
# operator: Sam
warning_band: 0.0005
histogram_bins: 20
coil_positions: 3
";

#[derive(Debug, Error, Diagnostic)]
pub enum ProjectError {
    #[error("Not inside a coilqc project (searched upward from {})", start.display())]
    #[diagnostic(
        code(coilqc::project::not_found),
        help("Run 'coilqc init' to create a project here")
    )]
    NotFound { start: PathBuf },

    #[error("A coilqc project already exists at {}", root.display())]
    #[diagnostic(code(coilqc::project::exists))]
    AlreadyExists { root: PathBuf },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    #[diagnostic(code(coilqc::project::io))]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Find the project containing the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let cwd = std::env::current_dir()?;
        Self::discover_from(&cwd)
    }

    /// Walk upward from `start` until a directory with `.coilqc/` is found
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start.canonicalize()?;
        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }
            let Some(parent) = current.parent() else {
                return Err(ProjectError::NotFound {
                    start: start.to_path_buf(),
                });
            };
            current = parent.to_path_buf();
        }
    }

    /// Create a new project at `root`
    ///
    /// With `force`, an existing project is re-initialized: missing
    /// directories are created and the config file is rewritten. Documents
    /// are left alone.
    pub fn init(root: &Path, force: bool) -> Result<Self, ProjectError> {
        let marker = root.join(PROJECT_DIR);
        if marker.exists() && !force {
            return Err(ProjectError::AlreadyExists {
                root: root.to_path_buf(),
            });
        }

        fs::create_dir_all(&marker)?;
        fs::write(marker.join(CONFIG_FILE), DEFAULT_CONFIG)?;

        let project = Self {
            root: root.to_path_buf(),
        };
        project.store().create_layout()?;
        Ok(project)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn coilqc_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    pub fn config_path(&self) -> PathBuf {
        self.coilqc_dir().join(CONFIG_FILE)
    }

    /// Document store rooted at this project
    pub fn store(&self) -> YamlStore {
        YamlStore::new(&self.root)
    }
}
