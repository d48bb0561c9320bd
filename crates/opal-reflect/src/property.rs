//! Scalar properties and the shared access contract
//!
//! Every property — scalar, array or dictionary — combines a static
//! capability (is there a setter at all) with a per-object dynamic
//! predicate supplied at declaration time. Reads on a closed gate fail
//! [`Error::ForbiddenRead`]; writes on a closed gate fire the
//! non-writable signal first and then fail [`Error::ForbiddenWrite`].
//! Successful writes fire the changed signal *before* the mutation is
//! applied, so an observer can veto it by returning an error.
//!
//! Accessor closures receive the instance address already adjusted to the
//! layout of the class the property was declared on, which makes the same
//! descriptor usable through any derived class.

use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::array::ArrayProperty;
use crate::class::{Class, ClassVisitor};
use crate::dictionary::DictionaryProperty;
use crate::error::{Error, Result};
use crate::object::{InstanceMut, InstanceRef, ObjectHandle};
use crate::signal::{Signal, SlotId};
use crate::tags::TagMap;
use crate::typeinfo::{Kind, TypeInfo};
use crate::value::Value;

/// Boxed scalar read accessor
pub type Getter = Box<dyn Fn(InstanceRef<'_>) -> Result<Value> + Send + Sync>;

/// Boxed scalar write accessor
pub type Setter = Box<dyn Fn(InstanceMut<'_>, Value) -> Result<()> + Send + Sync>;

/// Static capability combined with an optional per-object predicate
pub struct AccessGate {
    enabled: bool,
    predicate: Option<Box<dyn Fn(&ObjectHandle) -> bool + Send + Sync>>,
}

impl AccessGate {
    /// Gate that always answers true
    pub fn open() -> Self {
        Self {
            enabled: true,
            predicate: None,
        }
    }

    /// Gate that always answers false
    pub fn closed() -> Self {
        Self {
            enabled: false,
            predicate: None,
        }
    }

    /// Gate answering the predicate, evaluated against each object
    pub fn when<P>(predicate: P) -> Self
    where
        P: Fn(&ObjectHandle) -> bool + Send + Sync + 'static,
    {
        Self {
            enabled: true,
            predicate: Some(Box::new(predicate)),
        }
    }

    /// Evaluate the gate for one object
    pub fn check(&self, object: &ObjectHandle) -> bool {
        self.enabled && self.predicate.as_ref().is_none_or(|p| p(object))
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("enabled", &self.enabled)
            .field("dynamic", &self.predicate.is_some())
            .finish()
    }
}

/// Fired for scalar writes: before mutation on the changed signal, before
/// the error on the non-writable signal
#[derive(Debug)]
pub struct SetEvent {
    /// Target object
    pub object: ObjectHandle,
    /// Property name
    pub property: String,
    /// Value being written
    pub value: Value,
}

/// Name, schema, gating and declaring-class state shared by every
/// property shape
pub(crate) struct PropertyCore {
    name: String,
    type_info: TypeInfo,
    tags: TagMap,
    readable: AccessGate,
    writable: AccessGate,
    declaring: OnceCell<Weak<Class>>,
}

impl PropertyCore {
    pub(crate) fn new(name: impl Into<String>, type_info: TypeInfo) -> Self {
        Self {
            name: name.into(),
            type_info,
            tags: TagMap::new(),
            readable: AccessGate::open(),
            writable: AccessGate::open(),
            declaring: OnceCell::new(),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn type_info(&self) -> &TypeInfo {
        &self.type_info
    }

    pub(crate) fn tags(&self) -> &TagMap {
        &self.tags
    }

    pub(crate) fn tags_mut(&mut self) -> &mut TagMap {
        &mut self.tags
    }

    pub(crate) fn set_readable(&mut self, gate: AccessGate) {
        self.readable = gate;
    }

    pub(crate) fn set_writable(&mut self, gate: AccessGate) {
        self.writable = gate;
    }

    pub(crate) fn readable_on(&self, object: &ObjectHandle) -> bool {
        self.readable.check(object)
    }

    pub(crate) fn writable_on(&self, object: &ObjectHandle) -> bool {
        self.writable.check(object)
    }

    pub(crate) fn bind(&self, class: &Arc<Class>) {
        // First binding wins; a descriptor belongs to exactly one class.
        let _ = self.declaring.set(Arc::downgrade(class));
    }

    /// Instance address adjusted from the object's class to the declaring
    /// class
    pub(crate) fn adjusted(&self, object: &ObjectHandle) -> Result<NonNull<u8>> {
        let declaring = self
            .declaring
            .get()
            .and_then(Weak::upgrade)
            .ok_or(Error::NullObject)?;
        object.class()?.apply_offset(object.pointer()?, &declaring)
    }
}

impl std::fmt::Debug for PropertyCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyCore")
            .field("name", &self.name)
            .field("type_info", &self.type_info)
            .finish()
    }
}

/// Convert a value to a property's declared scalar kind; non-scalar kinds
/// pass through for the accessor to interpret
pub(crate) fn conform(info: &TypeInfo, value: Value) -> Result<Value> {
    match info.kind() {
        Kind::Bool => Ok(Value::Bool(value.to_bool()?)),
        Kind::Int => Ok(Value::Int(value.to_int()?)),
        Kind::Real => Ok(Value::Real(value.to_real()?)),
        Kind::String => Ok(Value::String(value.to_text()?)),
        _ => Ok(value),
    }
}

/// Uniform view of a property independent of its storage shape
///
/// The metaclass tables and the serialization engine depend only on this
/// trait; [`as_array`](PropertyAccess::as_array) and
/// [`as_dictionary`](PropertyAccess::as_dictionary) recover the richer
/// leaf interfaces when the kind calls for them.
pub trait PropertyAccess: std::fmt::Debug + Send + Sync {
    /// Property name, unique within its declaring class
    fn name(&self) -> &str;

    /// Runtime kind this property reports
    fn kind(&self) -> Kind;

    /// Declared schema
    fn type_info(&self) -> &TypeInfo;

    /// Declaration-time metadata
    fn tags(&self) -> &TagMap;

    /// Whether the property can currently be read on this object
    fn readable(&self, object: &ObjectHandle) -> bool;

    /// Whether the property can currently be written on this object
    fn writable(&self, object: &ObjectHandle) -> bool;

    /// Read the current value
    fn get(&self, object: &ObjectHandle) -> Result<Value>;

    /// Write a value
    fn set(&self, object: &ObjectHandle, value: Value) -> Result<()>;

    /// Concrete scalar leaf, when this is a plain property
    fn as_scalar(&self) -> Option<&Property> {
        None
    }

    /// Leaf interface for indexed access, when this is an array property
    fn as_array(&self) -> Option<&ArrayProperty> {
        None
    }

    /// Leaf interface for keyed access, when this is a dictionary property
    fn as_dictionary(&self) -> Option<&DictionaryProperty> {
        None
    }

    /// Visit with the kind-specific callback
    fn accept(&self, visitor: &mut dyn ClassVisitor);

    /// Attach the declaring class; called once by `ClassBuilder::build`
    #[doc(hidden)]
    fn bind(&self, class: &Arc<Class>);
}

/// Scalar property: one gated value slot per object
pub struct Property {
    core: PropertyCore,
    getter: Getter,
    setter: Option<Setter>,
    changed: Signal<SetEvent>,
    nonwritable: Signal<SetEvent>,
}

impl Property {
    /// Read-only property from a getter closure
    pub fn new<G>(name: impl Into<String>, type_info: TypeInfo, getter: G) -> Self
    where
        G: Fn(InstanceRef<'_>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            core: PropertyCore::new(name, type_info),
            getter: Box::new(getter),
            setter: None,
            changed: Signal::new(),
            nonwritable: Signal::new(),
        }
    }

    /// Add the write accessor
    pub fn with_setter<S>(mut self, setter: S) -> Self
    where
        S: Fn(InstanceMut<'_>, Value) -> Result<()> + Send + Sync + 'static,
    {
        self.setter = Some(Box::new(setter));
        self
    }

    /// Gate reads on a per-object predicate
    pub fn readable_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ObjectHandle) -> bool + Send + Sync + 'static,
    {
        self.core.set_readable(AccessGate::when(predicate));
        self
    }

    /// Gate writes on a per-object predicate
    pub fn writable_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ObjectHandle) -> bool + Send + Sync + 'static,
    {
        self.core.set_writable(AccessGate::when(predicate));
        self
    }

    /// Attach a metadata tag
    pub fn tag(mut self, name: impl Into<String>, value: Value) -> Self {
        self.core.tags_mut().insert(name, value);
        self
    }

    /// Signal fired before each accepted write
    pub fn changed(&self) -> &Signal<SetEvent> {
        &self.changed
    }

    /// Signal fired before each rejected (non-writable) write
    pub fn rejected(&self) -> &Signal<SetEvent> {
        &self.nonwritable
    }

    /// Connect to the changed signal
    pub fn connect_changed<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&SetEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.changed.connect(observer)
    }

    /// Connect to the non-writable signal
    pub fn connect_rejected<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&SetEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.nonwritable.connect(observer)
    }

    fn event(&self, object: &ObjectHandle, value: &Value) -> SetEvent {
        SetEvent {
            object: object.clone(),
            property: self.core.name().to_string(),
            value: value.clone(),
        }
    }
}

impl PropertyAccess for Property {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> Kind {
        self.core.type_info().kind()
    }

    fn type_info(&self) -> &TypeInfo {
        self.core.type_info()
    }

    fn tags(&self) -> &TagMap {
        self.core.tags()
    }

    fn readable(&self, object: &ObjectHandle) -> bool {
        self.core.readable_on(object)
    }

    fn writable(&self, object: &ObjectHandle) -> bool {
        self.setter.is_some() && self.core.writable_on(object)
    }

    fn get(&self, object: &ObjectHandle) -> Result<Value> {
        if !self.readable(object) {
            return Err(Error::ForbiddenRead {
                property: self.core.name().to_string(),
            });
        }
        let ptr = self.core.adjusted(object)?;
        (self.getter)(InstanceRef::new(ptr))
    }

    fn set(&self, object: &ObjectHandle, value: Value) -> Result<()> {
        if !self.writable(object) {
            self.nonwritable.emit(&self.event(object, &value))?;
            return Err(Error::ForbiddenWrite {
                property: self.core.name().to_string(),
            });
        }
        let value = conform(self.core.type_info(), value)?;
        self.changed.emit(&self.event(object, &value))?;

        let ptr = self.core.adjusted(object)?;
        let Some(setter) = self.setter.as_ref() else {
            return Err(Error::ForbiddenWrite {
                property: self.core.name().to_string(),
            });
        };
        setter(InstanceMut::new(ptr), value)
    }

    fn as_scalar(&self) -> Option<&Property> {
        Some(self)
    }

    fn accept(&self, visitor: &mut dyn ClassVisitor) {
        visitor.visit_property(self);
    }

    fn bind(&self, class: &Arc<Class>) {
        self.core.bind(class);
    }
}

impl std::fmt::Debug for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.core.name())
            .field("type_info", self.core.type_info())
            .field("writable", &self.setter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter {
        value: i64,
        locked: bool,
    }

    fn counter_class() -> Arc<Class> {
        ClassBuilder::new("Counter")
            .property(
                Property::new("value", TypeInfo::Int, |i: InstanceRef<'_>| {
                    Ok(Value::Int(unsafe { i.downcast_ref::<Counter>() }.value))
                })
                .with_setter(|i: InstanceMut<'_>, v| {
                    unsafe { i.downcast_mut::<Counter>() }.value = v.to_int()?;
                    Ok(())
                })
                .writable_if(|obj| {
                    obj.pointer()
                        .map(|p| !unsafe { p.cast::<Counter>().as_ref() }.locked)
                        .unwrap_or(false)
                }),
            )
            .property(Property::new("frozen", TypeInfo::Int, |_| Ok(Value::Int(9))))
            .build()
            .unwrap()
    }

    #[test]
    fn test_get_set_round_trip() {
        let class = counter_class();
        let mut counter = Counter {
            value: 3,
            locked: false,
        };
        let obj = ObjectHandle::of(&class, &mut counter);
        let prop = class.property("value").unwrap();

        assert_eq!(prop.get(&obj).unwrap(), Value::Int(3));
        prop.set(&obj, Value::from(5)).unwrap();
        assert_eq!(prop.get(&obj).unwrap(), Value::Int(5));
    }

    #[test]
    fn test_set_conforms_to_declared_kind() {
        let class = counter_class();
        let mut counter = Counter {
            value: 0,
            locked: false,
        };
        let obj = ObjectHandle::of(&class, &mut counter);
        let prop = class.property("value").unwrap();

        prop.set(&obj, Value::from("41")).unwrap();
        assert_eq!(prop.get(&obj).unwrap(), Value::Int(41));
        assert_eq!(
            prop.set(&obj, Value::from("not a number")).unwrap_err(),
            Error::BadType {
                from: Kind::String,
                to: Kind::Int
            }
        );
    }

    #[test]
    fn test_dynamic_write_gate() {
        let class = counter_class();
        let mut counter = Counter {
            value: 1,
            locked: true,
        };
        let obj = ObjectHandle::of(&class, &mut counter);
        let prop = class.property("value").unwrap();

        assert!(prop.readable(&obj));
        assert!(!prop.writable(&obj));
        assert_eq!(
            prop.set(&obj, Value::from(2)).unwrap_err(),
            Error::ForbiddenWrite {
                property: "value".to_string()
            }
        );
        assert_eq!(counter.value, 1);
    }

    #[test]
    fn test_missing_setter_means_not_writable() {
        let class = counter_class();
        let mut counter = Counter {
            value: 0,
            locked: false,
        };
        let obj = ObjectHandle::of(&class, &mut counter);
        let prop = class.property("frozen").unwrap();

        assert!(!prop.writable(&obj));
        assert!(matches!(
            prop.set(&obj, Value::from(1)),
            Err(Error::ForbiddenWrite { .. })
        ));
    }

    #[test]
    fn test_rejected_write_fires_nonwritable_once() {
        let class = counter_class();
        let mut counter = Counter {
            value: 1,
            locked: true,
        };
        let obj = ObjectHandle::of(&class, &mut counter);

        let fired = Arc::new(AtomicUsize::new(0));
        let observed = Arc::clone(&fired);
        let prop = class.property("value").unwrap();
        let scalar = class.scalar_property("value").unwrap();
        scalar.connect_rejected(move |event| {
            assert_eq!(event.property, "value");
            assert_eq!(event.value, Value::Int(7));
            observed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        });

        assert!(prop.set(&obj, Value::from(7)).is_err());
        assert_eq!(fired.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_changed_observer_vetoes_mutation() {
        let class = counter_class();
        let mut counter = Counter {
            value: 1,
            locked: false,
        };
        let obj = ObjectHandle::of(&class, &mut counter);

        let scalar = class.scalar_property("value").unwrap();
        scalar.connect_changed(|event| {
            if event.value == Value::Int(13) {
                Err(Error::ElementNotFound)
            } else {
                Ok(())
            }
        });

        let prop = class.property("value").unwrap();
        assert_eq!(prop.set(&obj, Value::from(13)), Err(Error::ElementNotFound));
        assert_eq!(prop.get(&obj).unwrap(), Value::Int(1));
        prop.set(&obj, Value::from(2)).unwrap();
        assert_eq!(prop.get(&obj).unwrap(), Value::Int(2));
    }
}
