//! Provider declaration model

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Provider block from the project configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderDecl {
    /// Provider name (e.g. "local")
    pub name: String,

    /// Region or zone, if the provider distinguishes one
    pub region: Option<String>,

    /// Additional provider-specific settings
    pub config: HashMap<String, String>,
}
