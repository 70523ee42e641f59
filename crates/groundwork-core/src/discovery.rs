//! Project file discovery
//!
//! Finds the project root and the KDL files that make up a configuration,
//! following the conventional layout: `ground.kdl` (or
//! `.groundwork/ground.kdl`) at the root plus `resources/**/*.kdl`.

use crate::error::{CoreError, Result};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Discovered configuration files
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// Root file (ground.kdl)
    pub root: Option<PathBuf>,
    /// Resource definition files (resources/**/*.kdl)
    pub resources: Vec<PathBuf>,
    /// Environment file (.env)
    pub env_file: Option<PathBuf>,
}

impl DiscoveredFiles {
    /// All KDL files in load order: root first, then resources
    pub fn kdl_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        if let Some(root) = &self.root {
            files.push(root.clone());
        }
        files.extend(self.resources.iter().cloned());
        files
    }
}

/// Locate the project root
///
/// Search order:
/// 1. `GROUNDWORK_PROJECT_ROOT` environment variable
/// 2. Walk up from the current directory looking for `ground.kdl` or
///    `.groundwork/ground.kdl`
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var("GROUNDWORK_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking GROUNDWORK_PROJECT_ROOT");
        if path.join("ground.kdl").exists() || path.join(".groundwork/ground.kdl").exists() {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
    }

    let start_dir = std::env::current_dir()?;
    let mut current = start_dir.clone();

    loop {
        if current.join("ground.kdl").exists() {
            info!(project_root = %current.display(), "Found project root (ground.kdl)");
            return Ok(current);
        }
        if current.join(".groundwork/ground.kdl").exists() {
            info!(project_root = %current.display(), "Found project root (.groundwork/ground.kdl)");
            return Ok(current);
        }
        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(CoreError::ProjectRootNotFound(start_dir))
}

/// Discover configuration files under the project root
#[tracing::instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn discover_files(project_root: &Path) -> Result<DiscoveredFiles> {
    let mut discovered = DiscoveredFiles::default();

    let root_file = project_root.join("ground.kdl");
    let hidden_root_file = project_root.join(".groundwork/ground.kdl");
    if root_file.exists() {
        discovered.root = Some(root_file);
    } else if hidden_root_file.exists() {
        discovered.root = Some(hidden_root_file);
    }

    let resources_dir = project_root.join("resources");
    if resources_dir.is_dir() {
        discovered.resources = discover_kdl_files(&resources_dir)?;
        info!(
            resource_file_count = discovered.resources.len(),
            "Discovered resource files"
        );
    }

    let env_file = project_root.join(".env");
    if env_file.exists() {
        discovered.env_file = Some(env_file);
    }

    Ok(discovered)
}

/// Collect `**/*.kdl` under a directory, sorted for deterministic load order
fn discover_kdl_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/**/*.kdl", dir.display());
    let mut files: Vec<PathBuf> = glob(&pattern)
        .map_err(|e| CoreError::IoPath {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();
    Ok(files)
}
