//! Reflection errors
//!
//! Every failure the core can surface is a named, distinguishable variant.
//! Schema errors (missing members, duplicate registrations, unrelated
//! classes) indicate integration defects and are never retried; gating and
//! range errors are expected outcomes of speculative access and are meant
//! to be caught by callers.

use thiserror::Error;

use crate::typeinfo::Kind;

/// Errors raised by the reflection core
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    /// Property name was not found in a metaclass
    #[error("property '{name}' not found in class '{class}'")]
    PropertyNotFound {
        /// Requested property name
        name: String,
        /// Class that was searched
        class: String,
    },

    /// Function name was not found in a metaclass
    #[error("function '{name}' not found in class '{class}'")]
    FunctionNotFound {
        /// Requested function name
        name: String,
        /// Class that was searched
        class: String,
    },

    /// Index is outside the valid range of a table or container
    #[error("index {index} is out of range [0, {size})")]
    OutOfRange {
        /// Requested index
        index: usize,
        /// Size of the container
        size: usize,
    },

    /// Keyed lookup did not match any element
    #[error("element not found")]
    ElementNotFound,

    /// Read access is closed for the property on this object
    #[error("property '{property}' is not readable")]
    ForbiddenRead {
        /// Property name
        property: String,
    },

    /// Write access is closed for the property on this object
    #[error("property '{property}' is not writable")]
    ForbiddenWrite {
        /// Property name
        property: String,
    },

    /// Call access is closed for the function on this object
    #[error("function '{function}' is not callable")]
    ForbiddenCall {
        /// Function name
        function: String,
    },

    /// Value conversion between two kinds is not defined
    #[error("cannot convert value from {from} to {to}")]
    BadType {
        /// Kind of the source value
        from: Kind,
        /// Requested target kind
        to: Kind,
    },

    /// A call argument could not be converted to the declared kind
    #[error("argument {index} of '{function}': cannot convert from {from} to {to}")]
    BadArgument {
        /// Zero-based argument position
        index: usize,
        /// Function name
        function: String,
        /// Kind of the supplied value
        from: Kind,
        /// Declared kind of the parameter
        to: Kind,
    },

    /// Too few arguments were supplied to a call
    #[error("'{function}' expects {expected} arguments, {provided} provided")]
    NotEnoughArguments {
        /// Function name
        function: String,
        /// Number of arguments supplied
        provided: usize,
        /// Number of arguments declared
        expected: usize,
    },

    /// The two classes share no base/derived relationship
    #[error("class '{from}' is not related to class '{to}'")]
    ClassUnrelated {
        /// Source class name
        from: String,
        /// Target class name
        to: String,
    },

    /// Operation needs a live instance but got the nothing sentinel
    #[error("object handle is null")]
    NullObject,

    /// Two members with the same name were declared in one class
    #[error("class '{class}' already declares a member named '{name}'")]
    DuplicateMember {
        /// Declaring class
        class: String,
        /// Conflicting member name
        name: String,
    },

    /// A class with this name is already registered
    #[error("class '{name}' is already registered")]
    DuplicateClass {
        /// Class name
        name: String,
    },

    /// No class with this name is registered
    #[error("class '{name}' is not registered")]
    ClassNotFound {
        /// Class name
        name: String,
    },

    /// An enum with this name is already registered
    #[error("enum '{name}' is already registered")]
    DuplicateEnum {
        /// Enum name
        name: String,
    },

    /// No enum with this name is registered
    #[error("enum '{name}' is not registered")]
    EnumNotFound {
        /// Enum name
        name: String,
    },
}

/// Result alias for reflection operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PropertyNotFound {
            name: "x".to_string(),
            class: "Point".to_string(),
        };
        assert_eq!(err.to_string(), "property 'x' not found in class 'Point'");

        let err = Error::OutOfRange { index: 5, size: 3 };
        assert_eq!(err.to_string(), "index 5 is out of range [0, 3)");

        let err = Error::BadType {
            from: Kind::String,
            to: Kind::Object,
        };
        assert_eq!(err.to_string(), "cannot convert value from string to object");
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(Error::NullObject, Error::NullObject);
        assert_ne!(
            Error::ElementNotFound,
            Error::ForbiddenRead {
                property: "x".to_string()
            }
        );
    }
}
