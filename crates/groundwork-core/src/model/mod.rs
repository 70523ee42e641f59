//! Data model
//!
//! Declarations parsed from the project's KDL files. Resources keep their
//! declaration order; it is the tie-breaker for execution ordering.

mod provider;
mod resource;

// Re-exports
pub use provider::*;
pub use resource::*;

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fully loaded project configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Blueprint {
    /// Project name
    pub name: String,

    /// Declared providers by name
    pub providers: HashMap<String, ProviderDecl>,

    /// Resource declarations in declaration order
    pub resources: Vec<ResourceDecl>,

    /// Project-level template variables
    pub variables: HashMap<String, String>,
}

impl Blueprint {
    /// Look up a resource by id
    pub fn resource(&self, id: &ResourceId) -> Option<&ResourceDecl> {
        self.resources.iter().find(|r| &r.id == id)
    }

    /// The single declared provider, if there is exactly one
    pub fn default_provider(&self) -> Option<&str> {
        if self.providers.len() == 1 {
            self.providers.keys().next().map(|s| s.as_str())
        } else {
            None
        }
    }

    /// Assign the default provider to resources that omit one and verify
    /// every resource names a declared provider
    pub fn resolve_providers(&mut self) -> Result<()> {
        let default = self.default_provider().map(|s| s.to_string());
        for resource in &mut self.resources {
            if resource.provider.is_empty() {
                match &default {
                    Some(name) => resource.provider = name.clone(),
                    None => {
                        return Err(CoreError::InvalidConfig(format!(
                            "resource {} does not name a provider and no single default exists",
                            resource.id
                        )));
                    }
                }
            }
            if !self.providers.contains_key(&resource.provider) {
                return Err(CoreError::UnknownProvider {
                    resource: resource.id.to_string(),
                    provider: resource.provider.clone(),
                });
            }
        }
        Ok(())
    }
}
