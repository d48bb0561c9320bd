//! Instance construction descriptors
//!
//! A [`Constructor`] pairs declared argument types with a factory closure
//! that allocates a new instance and returns its erased address. Matching
//! is a non-throwing compatibility test: overload resolution walks a
//! class's constructor list and picks the first whose arity and argument
//! kinds accept the supplied values.

use std::ptr::NonNull;

use crate::error::{Error, Result};
use crate::property::conform;
use crate::typeinfo::TypeInfo;
use crate::value::Value;

type FactoryFn = Box<dyn Fn(&[Value]) -> Result<NonNull<u8>> + Send + Sync>;

/// One way of building an instance of a registered class
pub struct Constructor {
    arg_types: Vec<TypeInfo>,
    factory: FactoryFn,
}

impl Constructor {
    /// Constructor from declared argument types and a factory closure
    ///
    /// The factory receives arguments already converted to the declared
    /// kinds and returns an erased allocation, usually via
    /// [`into_erased`](crate::object::into_erased).
    pub fn new<F>(arg_types: Vec<TypeInfo>, factory: F) -> Self
    where
        F: Fn(&[Value]) -> Result<NonNull<u8>> + Send + Sync + 'static,
    {
        Self {
            arg_types,
            factory: Box::new(factory),
        }
    }

    /// Number of declared arguments
    pub fn arg_count(&self) -> usize {
        self.arg_types.len()
    }

    /// Declared type of one argument
    pub fn arg_type(&self, index: usize) -> Result<&TypeInfo> {
        self.arg_types.get(index).ok_or(Error::OutOfRange {
            index,
            size: self.arg_types.len(),
        })
    }

    /// Whether the supplied arguments are compatible with this signature
    pub fn matches(&self, args: &[Value]) -> bool {
        args.len() == self.arg_types.len()
            && args
                .iter()
                .zip(&self.arg_types)
                .all(|(value, declared)| value.convertible_to(declared.kind()))
    }

    /// Convert the arguments and run the factory
    pub(crate) fn create(&self, args: &[Value]) -> Result<NonNull<u8>> {
        let mut converted = Vec::with_capacity(self.arg_types.len());
        for (value, declared) in args.iter().zip(&self.arg_types) {
            converted.push(conform(declared, value.clone())?);
        }
        (self.factory)(&converted)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("arg_types", &self.arg_types)
            .finish()
    }
}
