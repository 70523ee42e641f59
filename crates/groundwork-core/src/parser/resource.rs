//! Resource node parsing

use crate::error::{CoreError, Result};
use crate::model::{AttrValue, Reference, ResourceDecl, ResourceId};
use kdl::{KdlNode, KdlValue};

/// Parse a `resource "<type>" "<name>" { ... }` node
pub fn parse_resource(node: &KdlNode) -> Result<ResourceDecl> {
    let mut entries = node.entries().iter().filter_map(|e| e.value().as_string());
    let resource_type = entries.next().ok_or_else(|| {
        CoreError::InvalidConfig("resource requires a type and a name".to_string())
    })?;
    let name = entries.next().ok_or_else(|| {
        CoreError::InvalidConfig(format!("resource \"{resource_type}\" requires a name"))
    })?;

    let mut resource = ResourceDecl::new(ResourceId::new(resource_type, name));

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "provider" => {
                    resource.provider = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .unwrap_or("")
                        .to_string();
                }
                "depends_on" | "depends-on" => {
                    for entry in child.entries() {
                        let target = entry.value().as_string().ok_or_else(|| {
                            CoreError::MalformedAttribute {
                                resource: resource.id.to_string(),
                                attribute: "depends_on".to_string(),
                                message: "entries must be \"type.name\" strings".to_string(),
                            }
                        })?;
                        resource.depends_on.push(ResourceId::parse(target)?);
                    }
                }
                attribute => {
                    let value = parse_attr_value(&resource.id, attribute, child)?;
                    resource.attributes.insert(attribute.to_string(), value);
                }
            }
        }
    }

    Ok(resource)
}

/// Parse a child node into an attribute value: one entry is a scalar or
/// reference, several entries form a list
fn parse_attr_value(id: &ResourceId, attribute: &str, node: &KdlNode) -> Result<AttrValue> {
    let entries = node.entries();
    match entries.len() {
        0 => Err(CoreError::MalformedAttribute {
            resource: id.to_string(),
            attribute: attribute.to_string(),
            message: "attribute has no value".to_string(),
        }),
        1 => scalar_value(id, attribute, entries[0].value()),
        _ => {
            let items = entries
                .iter()
                .map(|e| scalar_value(id, attribute, e.value()))
                .collect::<Result<Vec<_>>>()?;
            Ok(AttrValue::List(items))
        }
    }
}

fn scalar_value(id: &ResourceId, attribute: &str, value: &KdlValue) -> Result<AttrValue> {
    if let Some(s) = value.as_string() {
        if s.starts_with('@') {
            return Ok(AttrValue::Reference(Reference::parse(s)?));
        }
        return Ok(AttrValue::String(s.to_string()));
    }
    if let Some(i) = value.as_integer() {
        return Ok(AttrValue::Integer(i as i64));
    }
    if let Some(f) = value.as_float() {
        return Ok(AttrValue::Float(f));
    }
    if let Some(b) = value.as_bool() {
        return Ok(AttrValue::Bool(b));
    }
    Err(CoreError::MalformedAttribute {
        resource: id.to_string(),
        attribute: attribute.to_string(),
        message: "null is not a valid attribute value".to_string(),
    })
}
