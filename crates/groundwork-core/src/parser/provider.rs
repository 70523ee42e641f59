//! Provider node parsing

use crate::error::{CoreError, Result};
use crate::model::ProviderDecl;
use kdl::KdlNode;

/// Parse a `provider` node
pub fn parse_provider(node: &KdlNode) -> Result<(String, ProviderDecl)> {
    let name = node
        .entries()
        .first()
        .and_then(|e| e.value().as_string())
        .ok_or_else(|| CoreError::InvalidConfig("provider requires a name".to_string()))?
        .to_string();

    let mut provider = ProviderDecl {
        name: name.clone(),
        ..Default::default()
    };

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "region" | "zone" => {
                    provider.region = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(|s| s.to_string());
                }
                // Anything else goes into config
                other => {
                    if let Some(value) = child.entries().first().and_then(|e| e.value().as_string())
                    {
                        provider.config.insert(other.to_string(), value.to_string());
                    }
                }
            }
        }
    }

    Ok((name, provider))
}
