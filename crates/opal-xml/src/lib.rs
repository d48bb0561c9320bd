//! Generic tree serialization for reflected objects
//!
//! Walks a registered class's properties against a tree of nodes in both
//! directions — object to tree and tree to object — through the
//! [`TreeProxy`] adapter, so the algorithm is written once and any
//! hierarchical document library can sit behind it. [`XmlTree`] is the
//! bundled adapter: an arena document parsed and rendered with quick-xml.
//!
//! ```
//! use opal_reflect::{ClassBuilder, InstanceMut, InstanceRef, ObjectHandle,
//!     Property, Registry, TypeInfo, Value};
//! use opal_xml::{deserialize, serialize, Filter, XmlTree};
//!
//! #[derive(Default)]
//! struct Point { x: i64, y: i64 }
//!
//! let registry = Registry::new();
//! let class = registry.register_class(
//!     ClassBuilder::new("Point")
//!         .property(Property::new("x", TypeInfo::Int, |i: InstanceRef<'_>| {
//!             Ok(Value::Int(unsafe { i.downcast_ref::<Point>() }.x))
//!         })
//!         .with_setter(|i: InstanceMut<'_>, v| {
//!             unsafe { i.downcast_mut::<Point>() }.x = v.to_int()?;
//!             Ok(())
//!         }))
//!         .property(Property::new("y", TypeInfo::Int, |i: InstanceRef<'_>| {
//!             Ok(Value::Int(unsafe { i.downcast_ref::<Point>() }.y))
//!         })
//!         .with_setter(|i: InstanceMut<'_>, v| {
//!             unsafe { i.downcast_mut::<Point>() }.y = v.to_int()?;
//!             Ok(())
//!         }))
//!         .build()
//!         .unwrap(),
//! ).unwrap();
//!
//! let mut point = Point { x: 5, y: 0 };
//! let object = ObjectHandle::of(&class, &mut point);
//!
//! let mut tree = XmlTree::with_root("point");
//! let root = tree.root();
//! serialize(&object, &mut tree, root, &Filter::all(), true).unwrap();
//! assert_eq!(tree.to_xml().unwrap(), "<point><x>5</x><y>0</y></point>");
//!
//! let mut restored = Point::default();
//! let target = ObjectHandle::of(&class, &mut restored);
//! deserialize(&registry, &target, &tree, root, &Filter::all(), true).unwrap();
//! assert_eq!(restored.x, 5);
//! ```

pub mod deserialize;
pub mod error;
pub mod proxy;
pub mod serialize;
pub mod tree;

pub use deserialize::deserialize;
pub use error::{Result, XmlError};
pub use proxy::TreeProxy;
pub use serialize::{serialize, Filter};
pub use tree::{NodeId, XmlTree};
