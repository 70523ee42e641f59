//! KDL parser
//!
//! Parses Groundwork's KDL configuration into a [`Blueprint`]. Per-node-type
//! parsing lives in submodules.

mod provider;
mod resource;

use provider::parse_provider;
pub use resource::parse_resource;

use crate::error::Result;
use crate::model::{Blueprint, ResourceDecl};
use kdl::KdlDocument;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Parse a KDL file into a Blueprint
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<Blueprint> {
    let content = fs::read_to_string(path.as_ref())?;
    let name = path
        .as_ref()
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    parse_kdl_string(&content, name)
}

/// Parse a KDL string into a Blueprint
pub fn parse_kdl_string(content: &str, default_name: String) -> Result<Blueprint> {
    let doc: KdlDocument = content.parse()?;

    let mut name = default_name;
    let mut providers = HashMap::new();
    let mut resources: Vec<ResourceDecl> = Vec::new();
    let mut variables: HashMap<String, String> = HashMap::new();

    for node in doc.nodes() {
        match node.name().value() {
            "project" => {
                if let Some(project_name) =
                    node.entries().first().and_then(|e| e.value().as_string())
                {
                    name = project_name.to_string();
                }
            }
            "provider" => {
                let (provider_name, provider) = parse_provider(node)?;
                providers.insert(provider_name, provider);
            }
            "resource" => {
                // Declaration order is preserved; it breaks ordering ties later
                resources.push(parse_resource(node)?);
            }
            "variables" => {
                if let Some(vars) = node.children() {
                    for var in vars.nodes() {
                        let key = var.name().value().to_string();
                        let value = var
                            .entries()
                            .first()
                            .and_then(|e| e.value().as_string())
                            .unwrap_or("")
                            .to_string();
                        variables.insert(key, value);
                    }
                }
            }
            _ => {
                // Unknown top-level nodes are skipped
            }
        }
    }

    Ok(Blueprint {
        name,
        providers,
        resources,
        variables,
    })
}
