//! Object-to-tree serialization
//!
//! A plain recursive descent over the object's merged property table, in
//! declaration order. Each property maps to one child element named after
//! it: scalars write text, user types recurse, arrays emit repeated
//! `item` children, dictionaries emit `item` children holding `key` and
//! `value` sub-elements. Type-erased slots wrap their payload in a
//! kind-tag element so the concrete kind survives the round trip.
//!
//! Errors are isolated per property: with `abort_on_error == false` a
//! failing property is skipped and the walk continues — partial output is
//! a designed outcome, the forward/backward-compatibility mechanism for
//! evolving schemas. With `true` the first error aborts the whole walk.

use std::sync::Arc;

use opal_reflect::{Kind, ObjectHandle, PropertyAccess, Value};

use crate::error::Result;
use crate::proxy::TreeProxy;

/// Tag-based property selection for one serialization pass
///
/// With a tag set, `include == true` keeps only properties carrying the
/// tag and `include == false` keeps only properties without it. With no
/// tag, every property passes.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    tag: Option<String>,
    include: bool,
}

impl Filter {
    /// Pass every property
    pub fn all() -> Self {
        Self::default()
    }

    /// Keep only properties carrying the tag
    pub fn include(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            include: true,
        }
    }

    /// Keep only properties not carrying the tag
    pub fn exclude(tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            include: false,
        }
    }

    pub(crate) fn skips(&self, property: &dyn PropertyAccess) -> bool {
        match &self.tag {
            None => false,
            Some(tag) => property.tags().has(tag) != self.include,
        }
    }
}

/// Serialize an object's properties into children of `node`
pub fn serialize<P: TreeProxy>(
    object: &ObjectHandle,
    tree: &mut P,
    node: P::Node,
    filter: &Filter,
    abort_on_error: bool,
) -> Result<()> {
    let class = Arc::clone(object.class()?);
    for index in 0..class.property_count() {
        let outcome = serialize_property(object, &class, index, tree, node, filter, abort_on_error);
        if abort_on_error {
            outcome?;
        }
    }
    Ok(())
}

fn serialize_property<P: TreeProxy>(
    object: &ObjectHandle,
    class: &Arc<opal_reflect::Class>,
    index: usize,
    tree: &mut P,
    node: P::Node,
    filter: &Filter,
    abort_on_error: bool,
) -> Result<()> {
    let property = class.property_at(index)?;
    if filter.skips(property) {
        return Ok(());
    }

    let child = tree.add_child(node, property.name());
    if !tree.is_valid(child) {
        return Ok(());
    }

    match property.kind() {
        Kind::Object => {
            let nested = property.get(object)?.to_object()?;
            serialize(&nested, tree, child, filter, abort_on_error)?;
        }
        Kind::Array => {
            let Some(array) = property.as_array() else {
                return Ok(());
            };
            let count = array.size(object)?;
            for i in 0..count {
                let item = tree.add_child(child, "item");
                if !tree.is_valid(item) {
                    continue;
                }
                let element = array.element(object, i)?;
                match array.element_type().kind() {
                    Kind::Object => {
                        serialize(&element.to_object()?, tree, item, filter, abort_on_error)?;
                    }
                    Kind::Value => write_any(&element, tree, item, filter, abort_on_error)?,
                    _ => tree.set_text(item, &element),
                }
            }
        }
        Kind::Dictionary => {
            let Some(dictionary) = property.as_dictionary() else {
                return Ok(());
            };
            let mut cursor = dictionary.iterate(object)?;
            while let Some((key, value)) = cursor.entry() {
                let item = tree.add_child(child, "item");
                if tree.is_valid(item) {
                    let key_node = tree.add_child(item, "key");
                    if tree.is_valid(key_node) {
                        match dictionary.key_type().kind() {
                            Kind::Object => serialize(
                                &key.to_object()?,
                                tree,
                                key_node,
                                filter,
                                abort_on_error,
                            )?,
                            Kind::Value => {
                                write_any(key, tree, key_node, filter, abort_on_error)?
                            }
                            _ => tree.set_text(key_node, key),
                        }
                    }

                    let value_node = tree.add_child(item, "value");
                    if tree.is_valid(value_node) {
                        match dictionary.element_type().kind() {
                            Kind::Object => serialize(
                                &value.to_object()?,
                                tree,
                                value_node,
                                filter,
                                abort_on_error,
                            )?,
                            Kind::Value => {
                                write_any(value, tree, value_node, filter, abort_on_error)?
                            }
                            _ => tree.set_text(value_node, value),
                        }
                    }
                }
                cursor.next();
            }
        }
        Kind::Value => {
            let value = property.get(object)?;
            write_any(&value, tree, child, filter, abort_on_error)?;
        }
        _ => {
            let value = property.get(object)?;
            tree.set_text(child, &value);
        }
    }
    Ok(())
}

/// Write a type-erased payload wrapped in its kind-tag element
///
/// Enum payloads nest one further element named after the enumeration,
/// object payloads one named after the class, so reads can reconstruct
/// the concrete kind with no external schema. The none value writes
/// nothing.
pub(crate) fn write_any<P: TreeProxy>(
    value: &Value,
    tree: &mut P,
    node: P::Node,
    filter: &Filter,
    abort_on_error: bool,
) -> Result<()> {
    match value {
        Value::None => Ok(()),
        Value::Bool(_) | Value::Int(_) | Value::Real(_) | Value::String(_) => {
            let tagged = tree.add_child(node, value.kind().name());
            if tree.is_valid(tagged) {
                tree.set_text(tagged, value);
            }
            Ok(())
        }
        Value::Enum(instance) => {
            let tagged = tree.add_child(node, Kind::Enum.name());
            if tree.is_valid(tagged) {
                let named = tree.add_child(tagged, instance.descriptor().name());
                if tree.is_valid(named) {
                    tree.set_text(named, value);
                }
            }
            Ok(())
        }
        Value::Object(handle) => {
            let tagged = tree.add_child(node, Kind::Object.name());
            if tree.is_valid(tagged) {
                let named = tree.add_child(tagged, handle.class()?.name());
                if tree.is_valid(named) {
                    serialize(handle, tree, named, filter, abort_on_error)?;
                }
            }
            Ok(())
        }
    }
}
