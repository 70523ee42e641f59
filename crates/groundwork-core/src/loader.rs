//! Unified loader
//!
//! Combines discovery, template expansion and parsing into one pipeline.

use crate::discovery::{DiscoveredFiles, discover_files, find_project_root};
use crate::error::{CoreError, Result};
use crate::model::Blueprint;
use crate::parser::parse_kdl_string;
use crate::template::{TemplateProcessor, Variables, extract_variables};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Load the project containing the current directory
///
/// Steps:
/// 1. Find the project root
/// 2. Discover configuration files
/// 3. Collect variables
/// 4. Expand templates
/// 5. Parse KDL and resolve providers
#[instrument]
pub fn load_project() -> Result<Blueprint> {
    info!("Starting project load");
    let project_root = find_project_root()?;
    load_project_from_root(&project_root)
}

/// Load a project from an explicit root directory
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_project_from_root(project_root: &Path) -> Result<Blueprint> {
    debug!("Step 1: Discovering files");
    let discovered = discover_files(project_root)?;

    debug!("Step 2: Preparing template processor");
    let mut processor = prepare_template_processor(&discovered, project_root)?;

    debug!("Step 3: Expanding templates");
    let expanded_content = processor.render_files(&discovered.kdl_files())?;
    info!(
        content_size = expanded_content.len(),
        "Template expansion complete"
    );

    debug!("Step 4: Parsing KDL");
    let name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let mut blueprint = parse_kdl_string(&expanded_content, name)?;

    debug!("Step 5: Resolving providers");
    blueprint.resolve_providers()?;

    info!(
        resources = blueprint.resources.len(),
        providers = blueprint.providers.len(),
        "Project loaded successfully"
    );
    Ok(blueprint)
}

/// Collect variables into a template processor
fn prepare_template_processor(
    discovered: &DiscoveredFiles,
    project_root: &Path,
) -> Result<TemplateProcessor> {
    let mut processor = TemplateProcessor::new();
    let mut all_variables = Variables::new();

    // Builtin: PROJECT_ROOT
    processor.add_variable(
        "PROJECT_ROOT",
        serde_json::Value::String(project_root.to_string_lossy().to_string()),
    );

    // variables blocks from the root file
    if let Some(root_file) = &discovered.root {
        let content = std::fs::read_to_string(root_file).map_err(|e| CoreError::IoPath {
            path: root_file.clone(),
            message: e.to_string(),
        })?;
        all_variables.extend(extract_variables(&content)?);
    }

    processor.add_variables(all_variables);

    // .env overrides variables blocks
    if let Some(env_file) = &discovered.env_file {
        processor.add_env_file_variables(env_file)?;
    }

    Ok(processor)
}
