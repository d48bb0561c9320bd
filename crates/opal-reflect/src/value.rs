//! Type-erased runtime values
//!
//! [`Value`] is the closed variant everything generic flows through:
//! property reads and writes, function arguments and returns, serialized
//! tree text. A value is immutable once constructed; changing a property
//! means constructing a new value and writing it through the property.
//!
//! Conversions are explicit and fallible. The defined pairs are fixed:
//! bool/int/real widen freely among themselves, every scalar formats to a
//! string, strings parse back into scalars, enum instances expose their
//! ordinal. Everything else fails with [`Error::BadType`] — notably any
//! conversion out of an object handle, which only re-targets through
//! [`ObjectHandle::cast`].

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::enums::EnumDescriptor;
use crate::error::{Error, Result};
use crate::object::ObjectHandle;
use crate::typeinfo::Kind;

/// Instance of a registered enumeration: descriptor plus ordinal
///
/// Constructed only through the validating constructors, so the ordinal is
/// always one the descriptor declares.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    descriptor: Arc<EnumDescriptor>,
    value: i64,
}

impl EnumValue {
    /// Instance from a declared ordinal
    pub fn new(descriptor: &Arc<EnumDescriptor>, value: i64) -> Result<Self> {
        if !descriptor.has_value(value) {
            return Err(Error::ElementNotFound);
        }
        Ok(Self {
            descriptor: Arc::clone(descriptor),
            value,
        })
    }

    /// Instance from a declared name
    pub fn by_name(descriptor: &Arc<EnumDescriptor>, name: &str) -> Result<Self> {
        let value = descriptor.value(name)?;
        Ok(Self {
            descriptor: Arc::clone(descriptor),
            value,
        })
    }

    /// Enumeration descriptor
    pub fn descriptor(&self) -> &Arc<EnumDescriptor> {
        &self.descriptor
    }

    /// Ordinal of this instance
    pub fn ordinal(&self) -> i64 {
        self.value
    }

    /// Declared name of this instance
    pub fn name(&self) -> Result<&str> {
        self.descriptor.name_of(self.value)
    }
}

/// Type-erased value over the closed kind set
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value
    #[default]
    None,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// Double-precision real
    Real(f64),
    /// UTF-8 string
    String(String),
    /// Enumeration instance
    Enum(EnumValue),
    /// Handle to an instance of a registered class
    Object(ObjectHandle),
}

impl Value {
    /// Runtime kind of the active variant
    pub fn kind(&self) -> Kind {
        match self {
            Value::None => Kind::None,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Real(_) => Kind::Real,
            Value::String(_) => Kind::String,
            Value::Enum(_) => Kind::Enum,
            Value::Object(_) => Kind::Object,
        }
    }

    /// Convert to a boolean
    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Real(r) => Ok(*r != 0.0),
            Value::Enum(e) => Ok(e.ordinal() != 0),
            Value::String(s) => match s.as_str() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(self.bad_type(Kind::Bool)),
            },
            _ => Err(self.bad_type(Kind::Bool)),
        }
    }

    /// Convert to an integer
    pub fn to_int(&self) -> Result<i64> {
        match self {
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Int(i) => Ok(*i),
            Value::Real(r) => Ok(*r as i64),
            Value::Enum(e) => Ok(e.ordinal()),
            Value::String(s) => s.parse().map_err(|_| self.bad_type(Kind::Int)),
            _ => Err(self.bad_type(Kind::Int)),
        }
    }

    /// Convert to a real
    pub fn to_real(&self) -> Result<f64> {
        match self {
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Ok(*i as f64),
            Value::Real(r) => Ok(*r),
            Value::Enum(e) => Ok(e.ordinal() as f64),
            Value::String(s) => s.parse().map_err(|_| self.bad_type(Kind::Real)),
            _ => Err(self.bad_type(Kind::Real)),
        }
    }

    /// Convert to a string
    pub fn to_text(&self) -> Result<String> {
        match self {
            Value::Bool(b) => Ok(b.to_string()),
            Value::Int(i) => Ok(i.to_string()),
            Value::Real(r) => Ok(r.to_string()),
            Value::String(s) => Ok(s.clone()),
            Value::Enum(e) => Ok(e.name()?.to_string()),
            _ => Err(self.bad_type(Kind::String)),
        }
    }

    /// Convert to an instance of the given enumeration
    pub fn to_enum(&self, descriptor: &Arc<EnumDescriptor>) -> Result<EnumValue> {
        match self {
            Value::Enum(e) => {
                if e.descriptor().name() == descriptor.name() {
                    Ok(e.clone())
                } else {
                    Err(self.bad_type(Kind::Enum))
                }
            }
            Value::Int(i) => EnumValue::new(descriptor, *i),
            Value::String(s) => {
                if descriptor.has_name(s) {
                    EnumValue::by_name(descriptor, s)
                } else if let Ok(i) = s.parse::<i64>() {
                    EnumValue::new(descriptor, i)
                } else {
                    Err(self.bad_type(Kind::Enum))
                }
            }
            _ => Err(self.bad_type(Kind::Enum)),
        }
    }

    /// Extract the object handle
    pub fn to_object(&self) -> Result<ObjectHandle> {
        match self {
            Value::Object(handle) => Ok(handle.clone()),
            _ => Err(self.bad_type(Kind::Object)),
        }
    }

    /// Non-throwing compatibility test used by constructor matching
    pub fn convertible_to(&self, kind: Kind) -> bool {
        match kind {
            Kind::None => matches!(self, Value::None),
            Kind::Bool => self.to_bool().is_ok(),
            Kind::Int => self.to_int().is_ok(),
            Kind::Real => self.to_real().is_ok(),
            Kind::String => self.to_text().is_ok(),
            Kind::Enum => matches!(self.kind(), Kind::Enum | Kind::Int | Kind::String),
            Kind::Object => matches!(self, Value::Object(_)),
            Kind::Value => true,
            Kind::Array | Kind::Dictionary => false,
        }
    }

    fn bad_type(&self, to: Kind) -> Error {
        Error::BadType {
            from: self.kind(),
            to,
        }
    }
}

impl PartialOrd for Value {
    /// Ordering is defined within a kind only; comparing across kinds
    /// answers `None`, which renders every `<`/`>` test false.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::None, Value::None) => Some(Ordering::Equal),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Real(a), Value::Real(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            (Value::Enum(a), Value::Enum(b)) => {
                if a.descriptor().name() == b.descriptor().name() {
                    a.ordinal().partial_cmp(&b.ordinal())
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Real(r) => write!(f, "{r}"),
            Value::String(s) => f.write_str(s),
            Value::Enum(e) => f.write_str(e.name().unwrap_or("")),
            Value::Object(h) => write!(f, "{h:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<EnumValue> for Value {
    fn from(v: EnumValue) -> Self {
        Value::Enum(v)
    }
}

impl From<ObjectHandle> for Value {
    fn from(v: ObjectHandle) -> Self {
        Value::Object(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::EnumBuilder;

    fn color() -> Arc<EnumDescriptor> {
        EnumBuilder::new("Color")
            .value("red", 0)
            .value("green", 1)
            .build()
    }

    #[test]
    fn test_kinds() {
        assert_eq!(Value::None.kind(), Kind::None);
        assert_eq!(Value::from(true).kind(), Kind::Bool);
        assert_eq!(Value::from(42).kind(), Kind::Int);
        assert_eq!(Value::from(1.5).kind(), Kind::Real);
        assert_eq!(Value::from("hi").kind(), Kind::String);
    }

    #[test]
    fn test_bool_conversions() {
        assert!(Value::from(1).to_bool().unwrap());
        assert!(!Value::from(0).to_bool().unwrap());
        assert!(Value::from(0.5).to_bool().unwrap());
        assert!(Value::from("true").to_bool().unwrap());
        assert!(!Value::from("0").to_bool().unwrap());
        assert_eq!(
            Value::from("maybe").to_bool().unwrap_err(),
            Error::BadType {
                from: Kind::String,
                to: Kind::Bool
            }
        );
        assert!(Value::None.to_bool().is_err());
    }

    #[test]
    fn test_int_conversions() {
        assert_eq!(Value::from(true).to_int().unwrap(), 1);
        assert_eq!(Value::from(3.9).to_int().unwrap(), 3);
        assert_eq!(Value::from("-17").to_int().unwrap(), -17);
        assert!(Value::from("seven").to_int().is_err());
    }

    #[test]
    fn test_real_conversions() {
        assert_eq!(Value::from(2).to_real().unwrap(), 2.0);
        assert_eq!(Value::from("2.5").to_real().unwrap(), 2.5);
        assert!(Value::None.to_real().is_err());
    }

    #[test]
    fn test_string_conversions() {
        assert_eq!(Value::from(42).to_text().unwrap(), "42");
        assert_eq!(Value::from(true).to_text().unwrap(), "true");
        assert_eq!(Value::from(2.5).to_text().unwrap(), "2.5");
        assert!(Value::None.to_text().is_err());
        assert!(Value::Object(ObjectHandle::nothing()).to_text().is_err());
    }

    #[test]
    fn test_enum_conversions() {
        let color = color();
        let green = EnumValue::by_name(&color, "green").unwrap();

        assert_eq!(Value::from(green.clone()).to_int().unwrap(), 1);
        assert_eq!(Value::from(green.clone()).to_text().unwrap(), "green");
        assert!(Value::from(green).to_bool().unwrap());

        assert_eq!(Value::from(1).to_enum(&color).unwrap().name().unwrap(), "green");
        assert_eq!(Value::from("red").to_enum(&color).unwrap().ordinal(), 0);
        assert_eq!(Value::from("0").to_enum(&color).unwrap().ordinal(), 0);
        assert_eq!(Value::from(9).to_enum(&color), Err(Error::ElementNotFound));

        let other = EnumBuilder::new("Other").value("red", 0).build();
        let red = EnumValue::by_name(&other, "red").unwrap();
        assert!(Value::from(red).to_enum(&color).is_err());
    }

    #[test]
    fn test_object_conversions() {
        assert_eq!(
            Value::from(42).to_object().unwrap_err(),
            Error::BadType {
                from: Kind::Int,
                to: Kind::Object
            }
        );
        let nothing = ObjectHandle::nothing();
        assert_eq!(
            Value::Object(nothing.clone()).to_object().unwrap(),
            nothing
        );
    }

    #[test]
    fn test_cross_kind_equality_is_false() {
        assert_ne!(Value::from(1), Value::from(true));
        assert_ne!(Value::from(0), Value::None);
        assert_ne!(Value::from("1"), Value::from(1));
        assert_eq!(Value::None, Value::None);
    }

    #[test]
    fn test_ordering() {
        assert!(Value::from(1) < Value::from(2));
        assert!(Value::from("a") < Value::from("b"));
        assert_eq!(Value::from(1).partial_cmp(&Value::from(1.0)), None);
        assert!(!(Value::from(1) < Value::from("2")));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Value::None), "");
        assert_eq!(format!("{}", Value::from(7)), "7");
        assert_eq!(format!("{}", Value::from("x")), "x");
    }

    #[test]
    fn test_convertible_to() {
        assert!(Value::from(1).convertible_to(Kind::Bool));
        assert!(Value::from("2.5").convertible_to(Kind::Real));
        assert!(!Value::from("x").convertible_to(Kind::Int));
        assert!(Value::from(1).convertible_to(Kind::Value));
        assert!(!Value::from(1).convertible_to(Kind::Object));
    }
}
