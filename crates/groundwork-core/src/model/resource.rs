//! Resource declaration model
//!
//! A resource node is an identifier (type + name), a map of attribute values
//! and the set of dependencies implied by references plus any explicit
//! `depends_on` entries. Declarations are immutable after load; materialized
//! attribute values live in the engine's state, not here.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a declared resource: type plus name, e.g. `instance.web-01`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub resource_type: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
        }
    }

    /// Parse a `type.name` pair, as written in `depends_on`
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((resource_type, name)) if !resource_type.is_empty() && !name.is_empty() => {
                Ok(Self::new(resource_type, name))
            }
            _ => Err(CoreError::InvalidConfig(format!(
                "invalid resource id '{s}' (expected \"type.name\")"
            ))),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource_type, self.name)
    }
}

/// A directed edge from a consuming attribute to a producing node's attribute
///
/// Written `"@type.name.attribute"` in KDL. The value is only resolvable
/// after the producer has been materialized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub target: ResourceId,
    pub attribute: String,
}

impl Reference {
    /// Parse the `@type.name.attribute` form (without enforcing a leading `@`)
    pub fn parse(s: &str) -> Result<Self> {
        let body = s.strip_prefix('@').unwrap_or(s);
        let mut parts = body.splitn(3, '.');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(t), Some(n), Some(a)) if !t.is_empty() && !n.is_empty() && !a.is_empty() => {
                Ok(Self {
                    target: ResourceId::new(t, n),
                    attribute: a.to_string(),
                })
            }
            _ => Err(CoreError::MalformedReference(s.to_string())),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}.{}", self.target, self.attribute)
    }
}

/// Attribute value: scalar, list, or reference to another node's attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Reference(Reference),
    List(Vec<AttrValue>),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// All references contained in this value, including inside lists
    pub fn references(&self) -> Vec<&Reference> {
        match self {
            AttrValue::Reference(r) => vec![r],
            AttrValue::List(items) => items.iter().flat_map(|v| v.references()).collect(),
            _ => Vec::new(),
        }
    }
}

/// A single declared infrastructure object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDecl {
    /// Identifier (type + name)
    pub id: ResourceId,

    /// Provider responsible for materializing this resource.
    /// Empty until the loader assigns the project default.
    pub provider: String,

    /// Attribute name to declared value
    pub attributes: HashMap<String, AttrValue>,

    /// Explicit dependencies from `depends_on`
    pub depends_on: Vec<ResourceId>,
}

impl ResourceDecl {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            provider: String::new(),
            attributes: HashMap::new(),
            depends_on: Vec::new(),
        }
    }

    /// References appearing in any attribute value
    pub fn references(&self) -> Vec<&Reference> {
        let mut refs: Vec<&Reference> = self
            .attributes
            .values()
            .flat_map(|v| v.references())
            .collect();
        // Deterministic edge order regardless of attribute map iteration
        refs.sort_by(|a, b| (&a.target.resource_type, &a.target.name, &a.attribute)
            .cmp(&(&b.target.resource_type, &b.target.name, &b.attribute)));
        refs.dedup();
        refs
    }

    /// All dependencies: implicit (references) then explicit (`depends_on`),
    /// deduplicated preserving first occurrence
    pub fn dependencies(&self) -> Vec<ResourceId> {
        let mut deps: Vec<ResourceId> = self
            .references()
            .into_iter()
            .map(|r| r.target.clone())
            .collect();
        for dep in &self.depends_on {
            if !deps.contains(dep) {
                deps.push(dep.clone());
            }
        }
        deps
    }
}
