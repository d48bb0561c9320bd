//! Opal reflection core
//!
//! A runtime reflection ("metaobject") layer: register classes,
//! enumerations, properties, functions and constructors once at startup,
//! then inspect and manipulate arbitrary instances generically — get and
//! set properties by name, call functions by name, iterate array- and
//! dictionary-valued properties, walk class hierarchies.
//!
//! The pieces, leaf first:
//!
//! - [`Kind`] / [`TypeInfo`] — the closed kind discriminant and the
//!   recursive schema descriptor.
//! - [`Value`] — the type-erased runtime value with explicit, fallible
//!   conversions.
//! - [`EnumDescriptor`] / [`EnumBuilder`] — enumeration metaobjects.
//! - [`Property`], [`ArrayProperty`], [`DictionaryProperty`] — the gated
//!   accessor family behind the [`PropertyAccess`] trait, with
//!   pre-mutation [`Signal`]s observers can veto through.
//! - [`Function`] / [`Constructor`] — callable members and instance
//!   factories.
//! - [`Class`] / [`ClassBuilder`] — the metaclass with merged member
//!   tables, base offsets and dual-direction pointer adjustment.
//! - [`Registry`] — the explicitly passed-around owner of every
//!   descriptor.
//!
//! Per-object mutation is not synchronized internally: a given instance
//! must be driven from one thread at a time. Descriptors themselves are
//! immutable after their building phase and freely shared.

pub mod array;
pub mod class;
pub mod constructor;
pub mod dictionary;
pub mod enums;
pub mod error;
pub mod function;
pub mod object;
pub mod property;
pub mod registry;
pub mod signal;
pub mod tags;
pub mod typeinfo;
pub mod value;

pub use array::{ArrayInsertEvent, ArrayProperty, ArrayRemoveEvent, ArraySetEvent};
pub use class::{Class, ClassBuilder, ClassVisitor};
pub use constructor::Constructor;
pub use dictionary::{
    DictionaryCursor, DictionaryProperty, DictionaryRemoveEvent, DictionarySetEvent,
};
pub use enums::{EnumBuilder, EnumDescriptor, EnumPair};
pub use error::{Error, Result};
pub use function::Function;
pub use object::{drop_erased, into_erased, InstanceMut, InstanceRef, ObjectHandle};
pub use property::{AccessGate, Property, PropertyAccess, SetEvent};
pub use registry::Registry;
pub use signal::{Signal, SlotId};
pub use tags::TagMap;
pub use typeinfo::{Kind, TypeInfo, TypeInfoVisitor};
pub use value::{EnumValue, Value};
