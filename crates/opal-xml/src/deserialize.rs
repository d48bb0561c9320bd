//! Tree-to-object deserialization
//!
//! Mirror traversal of [`serialize`](crate::serialize::serialize): for
//! each property passing the tag filter, locate the child element named
//! after it — absence is a skip, not an error — and read it back. Nested
//! objects are mutated in place through the existing reference; dynamic
//! arrays grow as items appear while fixed arrays stop early; dictionary
//! pairs upsert. The same per-property error isolation applies.
//!
//! Behavioral tags consulted here:
//!
//! - `AddFunction` — name of a function invoked with the key to register
//!   a missing dictionary entry before its user-typed value is read.
//! - `SetFunction` — name of a function invoked with key and value in
//!   place of the dictionary's own element write.
//! - `DeserializeCopySet` — read into a freshly constructed copy, write
//!   the copy back through `set`, then release it; for properties whose
//!   getter answers a temporary.
//! - `DeserializeReSet` — after in-place recursion, re-`set` the
//!   unchanged value so change observers fire.

use std::sync::Arc;

use opal_reflect::{Class, Kind, ObjectHandle, Registry, TypeInfo, Value};

use crate::error::{Result, XmlError};
use crate::proxy::TreeProxy;
use crate::serialize::Filter;

/// Deserialize children of `node` into an object's properties
pub fn deserialize<P: TreeProxy>(
    registry: &Registry,
    object: &ObjectHandle,
    tree: &P,
    node: P::Node,
    filter: &Filter,
    abort_on_error: bool,
) -> Result<()> {
    let class = Arc::clone(object.class()?);
    for index in 0..class.property_count() {
        let outcome =
            deserialize_property(registry, object, &class, index, tree, node, filter, abort_on_error);
        if abort_on_error {
            outcome?;
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn deserialize_property<P: TreeProxy>(
    registry: &Registry,
    object: &ObjectHandle,
    class: &Arc<Class>,
    index: usize,
    tree: &P,
    node: P::Node,
    filter: &Filter,
    abort_on_error: bool,
) -> Result<()> {
    let property = class.property_at(index)?;
    if filter.skips(property) {
        return Ok(());
    }

    let child = tree.first_child(node, Some(property.name()));
    if !tree.is_valid(child) {
        return Ok(());
    }

    match property.kind() {
        Kind::Object => {
            if property.tags().has("DeserializeCopySet") {
                let copy = construct_for(registry, property.type_info())?;
                deserialize(registry, &copy, tree, child, filter, abort_on_error)?;
                let written = property.set(object, Value::Object(copy.clone()));
                copy.class()?.destroy(&copy)?;
                written?;
            } else {
                let nested = property.get(object)?.to_object()?;
                deserialize(registry, &nested, tree, child, filter, abort_on_error)?;
                if property.tags().has("DeserializeReSet") {
                    property.set(object, Value::Object(nested))?;
                }
            }
        }
        Kind::Array => {
            let Some(array) = property.as_array() else {
                return Ok(());
            };
            let mut index = 0usize;
            let mut item = tree.first_child(child, Some("item"));
            while tree.is_valid(item) {
                let count = array.size(object)?;
                if index >= count {
                    if array.is_dynamic() {
                        array.resize(object, index + 1)?;
                    } else {
                        // Fixed array exhausted: remaining tree items are
                        // ignored, not an error.
                        break;
                    }
                }
                match array.element_type().kind() {
                    Kind::Object => {
                        let element = array.element(object, index)?.to_object()?;
                        deserialize(registry, &element, tree, item, filter, abort_on_error)?;
                    }
                    Kind::Value => {
                        let value = read_any(registry, tree, item, filter, abort_on_error)?;
                        array.set_element(object, index, value)?;
                    }
                    _ => array.set_element(object, index, tree.text(item))?,
                }
                index += 1;
                item = tree.next_sibling(item, Some("item"));
            }
        }
        Kind::Dictionary => {
            let Some(dictionary) = property.as_dictionary() else {
                return Ok(());
            };
            let mut item = tree.first_child(child, Some("item"));
            while tree.is_valid(item) {
                let mut key = Value::None;
                let key_node = tree.first_child(item, Some("key"));
                if tree.is_valid(key_node) {
                    key = match dictionary.key_type().kind() {
                        Kind::Object => {
                            let key_object = construct_for(registry, dictionary.key_type())?;
                            deserialize(
                                registry,
                                &key_object,
                                tree,
                                key_node,
                                filter,
                                abort_on_error,
                            )?;
                            Value::Object(key_object)
                        }
                        Kind::Value => {
                            read_any(registry, tree, key_node, filter, abort_on_error)?
                        }
                        _ => tree.text(key_node),
                    };
                }

                let value_node = tree.first_child(item, Some("value"));
                if tree.is_valid(value_node) {
                    match dictionary.element_type().kind() {
                        Kind::Object => {
                            // Register the key first when the backing
                            // collection needs an explicit insertion hook.
                            if let Some(add) = property.tags().get("AddFunction") {
                                if !dictionary.exists(object, &key)? {
                                    class
                                        .function(&add.to_text()?)?
                                        .call(object, &[key.clone()])?;
                                }
                            }
                            let element = dictionary.element(object, &key)?.to_object()?;
                            deserialize(
                                registry,
                                &element,
                                tree,
                                value_node,
                                filter,
                                abort_on_error,
                            )?;
                        }
                        Kind::Value => {
                            let value =
                                read_any(registry, tree, value_node, filter, abort_on_error)?;
                            dictionary.set_element(object, key.clone(), value)?;
                        }
                        _ => {
                            let value = tree.text(value_node);
                            if let Some(set) = property.tags().get("SetFunction") {
                                class
                                    .function(&set.to_text()?)?
                                    .call(object, &[key.clone(), value])?;
                            } else {
                                dictionary.set_element(object, key.clone(), value)?;
                            }
                        }
                    }
                }
                item = tree.next_sibling(item, Some("item"));
            }
        }
        Kind::Value => {
            let value = read_any(registry, tree, child, filter, abort_on_error)?;
            property.set(object, value)?;
        }
        _ => property.set(object, tree.text(child))?,
    }
    Ok(())
}

/// Construct a fresh instance of the class a type descriptor references
fn construct_for(registry: &Registry, info: &TypeInfo) -> Result<ObjectHandle> {
    let TypeInfo::Class(name) = info else {
        return Err(XmlError::Malformed {
            reason: format!("expected a class type, got {}", info.kind()),
        });
    };
    let class = registry.class(name)?;
    let object = class.construct(&[])?;
    if object.is_nothing() {
        return Err(XmlError::Malformed {
            reason: format!("class '{name}' has no default constructor"),
        });
    }
    Ok(object)
}

/// Read a type-erased payload back from its kind-tag element
///
/// A node with no kind-tag child answers the none value.
pub(crate) fn read_any<P: TreeProxy>(
    registry: &Registry,
    tree: &P,
    node: P::Node,
    filter: &Filter,
    abort_on_error: bool,
) -> Result<Value> {
    let tagged = tree.first_child(node, None);
    if !tree.is_valid(tagged) {
        return Ok(Value::None);
    }
    let kind = tree.name(tagged);
    match kind.as_str() {
        "bool" => Ok(Value::Bool(tree.text(tagged).to_bool()?)),
        "int" => Ok(Value::Int(tree.text(tagged).to_int()?)),
        "real" => Ok(Value::Real(tree.text(tagged).to_real()?)),
        "string" => Ok(tree.text(tagged)),
        "enum" => {
            let named = tree.first_child(tagged, None);
            if !tree.is_valid(named) {
                return Err(XmlError::Malformed {
                    reason: "enum payload without an enumeration element".to_string(),
                });
            }
            let descriptor = registry.enumeration(&tree.name(named))?;
            Ok(Value::Enum(tree.text(named).to_enum(&descriptor)?))
        }
        "object" => {
            let named = tree.first_child(tagged, None);
            if !tree.is_valid(named) {
                return Err(XmlError::Malformed {
                    reason: "object payload without a class element".to_string(),
                });
            }
            let info = TypeInfo::class_ref(tree.name(named));
            let object = construct_for(registry, &info)?;
            deserialize(registry, &object, tree, named, filter, abort_on_error)?;
            Ok(Value::Object(object))
        }
        other => Err(XmlError::Malformed {
            reason: format!("unknown kind tag '{other}'"),
        }),
    }
}
