//! Type kinds and schema descriptors
//!
//! `Kind` is the closed discriminant shared by values and properties; it
//! answers "what shape does this thing have right now". `TypeInfo` carries
//! the schema side instead: what a property *could* contain, including
//! recursive array/dictionary element descriptors. The two are kept apart
//! on purpose — a dictionary-valued property has `Kind::Dictionary` while
//! the values flowing through it have their element kind.

use std::fmt;

/// Closed set of runtime kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No value
    None,
    /// Boolean
    Bool,
    /// 64-bit signed integer
    Int,
    /// Double-precision real
    Real,
    /// UTF-8 string
    String,
    /// Instance of a registered enumeration
    Enum,
    /// Indexed container accessed through an array property
    Array,
    /// Keyed container accessed through a dictionary property
    Dictionary,
    /// Type-erased "any" slot: the payload kind is only known at runtime
    Value,
    /// Instance of a registered class
    Object,
}

impl Kind {
    /// Stable lowercase name, also used as the kind-tag element name in
    /// serialized trees
    pub const fn name(self) -> &'static str {
        match self {
            Kind::None => "none",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Real => "real",
            Kind::String => "string",
            Kind::Enum => "enum",
            Kind::Array => "array",
            Kind::Dictionary => "dictionary",
            Kind::Value => "value",
            Kind::Object => "object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Schema descriptor for a property, argument or return slot
///
/// Structural: two array descriptors are equal iff their element descriptors
/// are equal, recursively. Enum and class references are carried by name and
/// resolved against a [`Registry`](crate::Registry) when an actual
/// descriptor is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeInfo {
    /// No declared type
    None,
    /// Boolean scalar
    Bool,
    /// Integer scalar
    Int,
    /// Real scalar
    Real,
    /// String scalar
    String,
    /// Type-erased slot accepting any value kind
    Value,
    /// Reference to a registered enumeration
    Enum(String),
    /// Reference to a registered class
    Class(String),
    /// Indexed container of a nested type
    Array(Box<TypeInfo>),
    /// Keyed container with nested key and element types
    Dictionary {
        /// Key type
        key: Box<TypeInfo>,
        /// Element type
        element: Box<TypeInfo>,
    },
}

impl TypeInfo {
    /// Array-of shorthand
    pub fn array(element: TypeInfo) -> Self {
        TypeInfo::Array(Box::new(element))
    }

    /// Dictionary-of shorthand
    pub fn dictionary(key: TypeInfo, element: TypeInfo) -> Self {
        TypeInfo::Dictionary {
            key: Box::new(key),
            element: Box::new(element),
        }
    }

    /// Enum reference shorthand
    pub fn enum_ref(name: impl Into<String>) -> Self {
        TypeInfo::Enum(name.into())
    }

    /// Class reference shorthand
    pub fn class_ref(name: impl Into<String>) -> Self {
        TypeInfo::Class(name.into())
    }

    /// Project the active variant onto its runtime kind
    pub fn kind(&self) -> Kind {
        match self {
            TypeInfo::None => Kind::None,
            TypeInfo::Bool => Kind::Bool,
            TypeInfo::Int => Kind::Int,
            TypeInfo::Real => Kind::Real,
            TypeInfo::String => Kind::String,
            TypeInfo::Value => Kind::Value,
            TypeInfo::Enum(_) => Kind::Enum,
            TypeInfo::Class(_) => Kind::Object,
            TypeInfo::Array(_) => Kind::Array,
            TypeInfo::Dictionary { .. } => Kind::Dictionary,
        }
    }

    /// Dispatch on the active variant with one handler per kind
    pub fn visit<T>(&self, visitor: &mut dyn TypeInfoVisitor<T>) -> T {
        match self {
            TypeInfo::None | TypeInfo::Bool | TypeInfo::Int | TypeInfo::Real
            | TypeInfo::String | TypeInfo::Value => visitor.scalar(self.kind()),
            TypeInfo::Enum(name) => visitor.enum_ref(name),
            TypeInfo::Class(name) => visitor.class_ref(name),
            TypeInfo::Array(element) => visitor.array(element),
            TypeInfo::Dictionary { key, element } => visitor.dictionary(key, element),
        }
    }
}

/// Exhaustive handler set for [`TypeInfo::visit`]
pub trait TypeInfoVisitor<T> {
    /// Scalar kind (none/bool/int/real/string/value)
    fn scalar(&mut self, kind: Kind) -> T;
    /// Named enumeration reference
    fn enum_ref(&mut self, name: &str) -> T;
    /// Named class reference
    fn class_ref(&mut self, name: &str) -> T;
    /// Array of a nested type
    fn array(&mut self, element: &TypeInfo) -> T;
    /// Dictionary with nested key and element types
    fn dictionary(&mut self, key: &TypeInfo, element: &TypeInfo) -> T;
}
