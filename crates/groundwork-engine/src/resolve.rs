//! Reference resolution
//!
//! Turns declared attribute values into concrete JSON. References are looked
//! up in an [`AttributeStore`] holding the materialized attributes of
//! already-applied producers (seeded from recorded state, updated as the
//! executor walks the order).

use crate::error::{EngineError, Result};
use crate::provider::ResolvedResource;
use groundwork_core::{AttrValue, ResourceDecl, ResourceId};
use std::collections::HashMap;

/// Materialized attributes per resource
#[derive(Debug, Clone, Default)]
pub struct AttributeStore {
    attributes: HashMap<ResourceId, HashMap<String, serde_json::Value>>,
}

impl AttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ResourceId, attributes: HashMap<String, serde_json::Value>) {
        self.attributes.insert(id, attributes);
    }

    pub fn get(&self, id: &ResourceId, attribute: &str) -> Option<&serde_json::Value> {
        self.attributes.get(id).and_then(|attrs| attrs.get(attribute))
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.attributes.contains_key(id)
    }
}

/// Resolve every attribute of a declaration
///
/// Fails with [`EngineError::UnresolvedReference`] when a referenced
/// attribute has not been materialized.
pub fn resolve_resource(decl: &ResourceDecl, store: &AttributeStore) -> Result<ResolvedResource> {
    let mut attributes = HashMap::with_capacity(decl.attributes.len());
    for (name, value) in &decl.attributes {
        attributes.insert(name.clone(), resolve_value(&decl.id, value, store)?);
    }
    Ok(ResolvedResource {
        id: decl.id.clone(),
        provider: decl.provider.clone(),
        attributes,
    })
}

fn resolve_value(
    owner: &ResourceId,
    value: &AttrValue,
    store: &AttributeStore,
) -> Result<serde_json::Value> {
    match value {
        AttrValue::String(s) => Ok(serde_json::Value::String(s.clone())),
        AttrValue::Integer(i) => Ok(serde_json::json!(i)),
        AttrValue::Float(f) => Ok(serde_json::json!(f)),
        AttrValue::Bool(b) => Ok(serde_json::Value::Bool(*b)),
        AttrValue::Reference(reference) => store
            .get(&reference.target, &reference.attribute)
            .cloned()
            .ok_or_else(|| EngineError::UnresolvedReference {
                reference: reference.to_string(),
                required_by: owner.to_string(),
            }),
        AttrValue::List(items) => {
            let resolved = items
                .iter()
                .map(|item| resolve_value(owner, item, store))
                .collect::<Result<Vec<_>>>()?;
            Ok(serde_json::Value::Array(resolved))
        }
    }
}
