//! Descriptor registry
//!
//! The [`Registry`] owns every class and enum descriptor by its unique
//! name. It is an ordinary value constructed once at startup and passed
//! by reference to whoever resolves names — there is no hidden global.
//! After the declaring code finishes registering, the registry is only
//! ever read, so sharing it across threads needs no further coordination
//! than the internal lock.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::class::Class;
use crate::enums::EnumDescriptor;
use crate::error::{Error, Result};

#[derive(Default)]
struct Tables {
    classes: Vec<Arc<Class>>,
    class_index: FxHashMap<String, usize>,
    enums: Vec<Arc<EnumDescriptor>>,
    enum_index: FxHashMap<String, usize>,
}

/// Owner of all registered class and enum descriptors
#[derive(Default)]
pub struct Registry {
    tables: RwLock<Tables>,
}

impl Registry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class under its unique name
    pub fn register_class(&self, class: Arc<Class>) -> Result<Arc<Class>> {
        let mut tables = self.tables.write();
        if tables.class_index.contains_key(class.name()) {
            return Err(Error::DuplicateClass {
                name: class.name().to_string(),
            });
        }
        let index = tables.classes.len();
        tables.class_index.insert(class.name().to_string(), index);
        tables.classes.push(Arc::clone(&class));
        Ok(class)
    }

    /// Class by name
    pub fn class(&self, name: &str) -> Result<Arc<Class>> {
        let tables = self.tables.read();
        tables
            .class_index
            .get(name)
            .map(|&i| Arc::clone(&tables.classes[i]))
            .ok_or_else(|| Error::ClassNotFound {
                name: name.to_string(),
            })
    }

    /// Check for a class by name
    pub fn has_class(&self, name: &str) -> bool {
        self.tables.read().class_index.contains_key(name)
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.tables.read().classes.len()
    }

    /// Snapshot of every registered class, in registration order
    pub fn classes(&self) -> Vec<Arc<Class>> {
        self.tables.read().classes.clone()
    }

    /// Register an enum under its unique name
    pub fn register_enum(&self, descriptor: Arc<EnumDescriptor>) -> Result<Arc<EnumDescriptor>> {
        let mut tables = self.tables.write();
        if tables.enum_index.contains_key(descriptor.name()) {
            return Err(Error::DuplicateEnum {
                name: descriptor.name().to_string(),
            });
        }
        let index = tables.enums.len();
        tables
            .enum_index
            .insert(descriptor.name().to_string(), index);
        tables.enums.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Enum by name
    pub fn enumeration(&self, name: &str) -> Result<Arc<EnumDescriptor>> {
        let tables = self.tables.read();
        tables
            .enum_index
            .get(name)
            .map(|&i| Arc::clone(&tables.enums[i]))
            .ok_or_else(|| Error::EnumNotFound {
                name: name.to_string(),
            })
    }

    /// Check for an enum by name
    pub fn has_enum(&self, name: &str) -> bool {
        self.tables.read().enum_index.contains_key(name)
    }

    /// Number of registered enums
    pub fn enum_count(&self) -> usize {
        self.tables.read().enums.len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read();
        f.debug_struct("Registry")
            .field("classes", &tables.classes.len())
            .field("enums", &tables.enums.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use crate::enums::EnumBuilder;

    #[test]
    fn test_class_registration() {
        let registry = Registry::new();
        registry
            .register_class(ClassBuilder::new("Point").build().unwrap())
            .unwrap();

        assert!(registry.has_class("Point"));
        assert_eq!(registry.class("Point").unwrap().name(), "Point");
        assert_eq!(registry.class_count(), 1);
        assert_eq!(
            registry.class("Missing").unwrap_err(),
            Error::ClassNotFound {
                name: "Missing".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let registry = Registry::new();
        registry
            .register_class(ClassBuilder::new("Point").build().unwrap())
            .unwrap();
        assert_eq!(
            registry
                .register_class(ClassBuilder::new("Point").build().unwrap())
                .unwrap_err(),
            Error::DuplicateClass {
                name: "Point".to_string()
            }
        );
        assert_eq!(registry.class_count(), 1);
    }

    #[test]
    fn test_enum_registration() {
        let registry = Registry::new();
        registry
            .register_enum(EnumBuilder::new("Color").value("red", 0).build())
            .unwrap();

        assert!(registry.has_enum("Color"));
        assert_eq!(registry.enumeration("Color").unwrap().value("red").unwrap(), 0);
        assert_eq!(
            registry.enumeration("Shape").unwrap_err(),
            Error::EnumNotFound {
                name: "Shape".to_string()
            }
        );
        assert_eq!(
            registry
                .register_enum(EnumBuilder::new("Color").build())
                .unwrap_err(),
            Error::DuplicateEnum {
                name: "Color".to_string()
            }
        );
    }

    #[test]
    fn test_classes_snapshot_in_registration_order() {
        let registry = Registry::new();
        registry
            .register_class(ClassBuilder::new("B").build().unwrap())
            .unwrap();
        registry
            .register_class(ClassBuilder::new("A").build().unwrap())
            .unwrap();

        let names: Vec<String> = registry
            .classes()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
