//! Shared utilities for CLI commands

use miette::Result;

use crate::core::{Config, Project, YamlStore};

/// Everything a command needs to touch project data
pub struct Workspace {
    pub project: Project,
    pub store: YamlStore,
    pub config: Config,
}

/// Discover the project, open its store and load configuration
pub fn open_workspace() -> Result<Workspace> {
    let project = Project::discover()?;
    let store = project.store();
    let config = Config::load();
    Ok(Workspace {
        project,
        store,
        config,
    })
}
