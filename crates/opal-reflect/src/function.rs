//! Callable member descriptors
//!
//! A [`Function`] is a named callable attached to a class: declared
//! argument and return types, an optional per-object call gate, and the
//! call closure itself. Arguments are converted to the declared kinds
//! before the closure runs; surplus arguments are ignored, missing ones
//! fail [`Error::NotEnoughArguments`].

use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::class::Class;
use crate::error::{Error, Result};
use crate::object::{InstanceMut, ObjectHandle};
use crate::property::{conform, AccessGate};
use crate::tags::TagMap;
use crate::typeinfo::TypeInfo;
use crate::value::Value;

type CallFn = Box<dyn Fn(InstanceMut<'_>, &[Value]) -> Result<Value> + Send + Sync>;

/// Callable member of a metaclass
pub struct Function {
    name: String,
    return_type: TypeInfo,
    arg_types: Vec<TypeInfo>,
    tags: TagMap,
    callable: AccessGate,
    body: CallFn,
    declaring: OnceCell<Weak<Class>>,
}

impl Function {
    /// Function from its signature and call closure
    pub fn new<F>(
        name: impl Into<String>,
        return_type: TypeInfo,
        arg_types: Vec<TypeInfo>,
        body: F,
    ) -> Self
    where
        F: Fn(InstanceMut<'_>, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            return_type,
            arg_types,
            tags: TagMap::new(),
            callable: AccessGate::open(),
            body: Box::new(body),
            declaring: OnceCell::new(),
        }
    }

    /// Gate calls on a per-object predicate
    pub fn callable_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ObjectHandle) -> bool + Send + Sync + 'static,
    {
        self.callable = AccessGate::when(predicate);
        self
    }

    /// Attach a metadata tag
    pub fn tag(mut self, name: impl Into<String>, value: Value) -> Self {
        self.tags.insert(name, value);
        self
    }

    /// Function name, unique within its declaring class
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared return type
    pub fn return_type(&self) -> &TypeInfo {
        &self.return_type
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

    /// Declaration-time metadata
    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    /// Whether the function can currently be called on this object
    pub fn callable(&self, object: &ObjectHandle) -> bool {
        self.callable.check(object)
    }

    /// Invoke on an object
    pub fn call(&self, object: &ObjectHandle, args: &[Value]) -> Result<Value> {
        if !self.callable(object) {
            return Err(Error::ForbiddenCall {
                function: self.name.clone(),
            });
        }
        if args.len() < self.arg_types.len() {
            return Err(Error::NotEnoughArguments {
                function: self.name.clone(),
                provided: args.len(),
                expected: self.arg_types.len(),
            });
        }

        let mut converted = Vec::with_capacity(self.arg_types.len());
        for (index, (value, declared)) in args.iter().zip(&self.arg_types).enumerate() {
            let value = conform(declared, value.clone()).map_err(|err| match err {
                Error::BadType { from, to } => Error::BadArgument {
                    index,
                    function: self.name.clone(),
                    from,
                    to,
                },
                other => other,
            })?;
            converted.push(value);
        }

        let ptr = self.adjusted(object)?;
        (self.body)(InstanceMut::new(ptr), &converted)
    }

    pub(crate) fn bind(&self, class: &Arc<Class>) {
        let _ = self.declaring.set(Arc::downgrade(class));
    }

    fn adjusted(&self, object: &ObjectHandle) -> Result<NonNull<u8>> {
        let declaring = self
            .declaring
            .get()
            .and_then(Weak::upgrade)
            .ok_or(Error::NullObject)?;
        object.class()?.apply_offset(object.pointer()?, &declaring)
    }
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("arg_types", &self.arg_types)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use crate::object::InstanceRef;
    use crate::property::Property;
    use crate::typeinfo::Kind;

    struct Accumulator {
        total: i64,
        sealed: bool,
    }

    fn accumulator_class() -> Arc<Class> {
        ClassBuilder::new("Accumulator")
            .property(Property::new("total", TypeInfo::Int, |i: InstanceRef<'_>| {
                Ok(Value::Int(unsafe { i.downcast_ref::<Accumulator>() }.total))
            }))
            .function(
                Function::new(
                    "add",
                    TypeInfo::Int,
                    vec![TypeInfo::Int],
                    |i: InstanceMut<'_>, args| {
                        let acc = unsafe { i.downcast_mut::<Accumulator>() };
                        acc.total += args[0].to_int()?;
                        Ok(Value::Int(acc.total))
                    },
                )
                .callable_if(|obj| {
                    obj.pointer()
                        .map(|p| !unsafe { p.cast::<Accumulator>().as_ref() }.sealed)
                        .unwrap_or(false)
                }),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_call_with_conversion() {
        let class = accumulator_class();
        let mut acc = Accumulator {
            total: 1,
            sealed: false,
        };
        let obj = ObjectHandle::of(&class, &mut acc);
        let add = class.function("add").unwrap();

        assert_eq!(add.call(&obj, &[Value::from(4)]).unwrap(), Value::Int(5));
        // A numeric string converts to the declared int kind.
        assert_eq!(add.call(&obj, &[Value::from("10")]).unwrap(), Value::Int(15));
        // Surplus arguments are ignored.
        assert_eq!(
            add.call(&obj, &[Value::from(1), Value::from(99)]).unwrap(),
            Value::Int(16)
        );
    }

    #[test]
    fn test_call_arity_and_kind_errors() {
        let class = accumulator_class();
        let mut acc = Accumulator {
            total: 0,
            sealed: false,
        };
        let obj = ObjectHandle::of(&class, &mut acc);
        let add = class.function("add").unwrap();

        assert_eq!(
            add.call(&obj, &[]).unwrap_err(),
            Error::NotEnoughArguments {
                function: "add".to_string(),
                provided: 0,
                expected: 1,
            }
        );
        assert_eq!(
            add.call(&obj, &[Value::from("seven")]).unwrap_err(),
            Error::BadArgument {
                index: 0,
                function: "add".to_string(),
                from: Kind::String,
                to: Kind::Int,
            }
        );
    }

    #[test]
    fn test_call_gate() {
        let class = accumulator_class();
        let mut acc = Accumulator {
            total: 0,
            sealed: true,
        };
        let obj = ObjectHandle::of(&class, &mut acc);
        let add = class.function("add").unwrap();

        assert!(!add.callable(&obj));
        assert_eq!(
            add.call(&obj, &[Value::from(1)]).unwrap_err(),
            Error::ForbiddenCall {
                function: "add".to_string()
            }
        );
    }

    #[test]
    fn test_signature_introspection() {
        let class = accumulator_class();
        let add = class.function("add").unwrap();

        assert_eq!(add.arg_count(), 1);
        assert_eq!(add.arg_type(0).unwrap(), &TypeInfo::Int);
        assert_eq!(
            add.arg_type(1).unwrap_err(),
            Error::OutOfRange { index: 1, size: 1 }
        );
        assert_eq!(add.return_type(), &TypeInfo::Int);
    }
}
