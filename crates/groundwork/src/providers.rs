//! Provider registry construction

use groundwork_core::Blueprint;
use groundwork_engine::ProviderRegistry;
use groundwork_provider_local::{DEFAULT_ROOT, LocalProvider};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Build the registry for every provider the blueprint declares
pub fn build_registry(
    blueprint: &Blueprint,
    project_root: &Path,
) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    for (name, decl) in &blueprint.providers {
        match name.as_str() {
            "local" => {
                let root = decl
                    .config
                    .get("root")
                    .map(PathBuf::from)
                    .map(|p| {
                        if p.is_absolute() {
                            p
                        } else {
                            project_root.join(p)
                        }
                    })
                    .unwrap_or_else(|| project_root.join(DEFAULT_ROOT));
                registry.register(Arc::new(LocalProvider::new(root)));
            }
            other => {
                anyhow::bail!("unknown provider type '{other}' (supported: local)");
            }
        }
    }

    Ok(registry)
}
