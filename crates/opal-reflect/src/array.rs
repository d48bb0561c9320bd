//! Indexed-container properties
//!
//! An [`ArrayProperty`] exposes an ordered, index-addressed container.
//! Fixed-size arrays answer `dynamic() == false` and reject every
//! size-changing operation with [`Error::ForbiddenWrite`] regardless of
//! object state; dynamic arrays additionally support insert, remove and
//! resize. Bounds are `[0, size)` for element access and removal and
//! `[0, size]` for insertion (append allowed).

use std::sync::Arc;

use crate::class::{Class, ClassVisitor};
use crate::error::{Error, Result};
use crate::object::{InstanceMut, InstanceRef, ObjectHandle};
use crate::property::{conform, PropertyAccess, PropertyCore};
use crate::signal::{Signal, SlotId};
use crate::tags::TagMap;
use crate::typeinfo::{Kind, TypeInfo};
use crate::value::Value;

type SizeFn = Box<dyn Fn(InstanceRef<'_>) -> Result<usize> + Send + Sync>;
type GetFn = Box<dyn Fn(InstanceRef<'_>, usize) -> Result<Value> + Send + Sync>;
type SetFn = Box<dyn Fn(InstanceMut<'_>, usize, Value) -> Result<()> + Send + Sync>;
type InsertFn = Box<dyn Fn(InstanceMut<'_>, usize, Value) -> Result<()> + Send + Sync>;
type RemoveFn = Box<dyn Fn(InstanceMut<'_>, usize) -> Result<()> + Send + Sync>;
type ResizeFn = Box<dyn Fn(InstanceMut<'_>, usize) -> Result<()> + Send + Sync>;

/// Fired for indexed writes
#[derive(Debug)]
pub struct ArraySetEvent {
    /// Target object
    pub object: ObjectHandle,
    /// Property name
    pub property: String,
    /// Element index
    pub index: usize,
    /// Value being written
    pub value: Value,
}

/// Fired for insertions
#[derive(Debug)]
pub struct ArrayInsertEvent {
    /// Target object
    pub object: ObjectHandle,
    /// Property name
    pub property: String,
    /// Value being inserted
    pub value: Value,
}

/// Fired for removals
#[derive(Debug)]
pub struct ArrayRemoveEvent {
    /// Target object
    pub object: ObjectHandle,
    /// Property name
    pub property: String,
    /// Element index
    pub index: usize,
}

struct DynamicOps {
    insert: InsertFn,
    remove: RemoveFn,
    resize: ResizeFn,
}

/// Property over an index-addressed container
pub struct ArrayProperty {
    core: PropertyCore,
    element_type: TypeInfo,
    size_fn: SizeFn,
    get_fn: GetFn,
    set_fn: SetFn,
    dynamic: Option<DynamicOps>,
    changed: Signal<ArraySetEvent>,
    set_rejected: Signal<ArraySetEvent>,
    inserted: Signal<ArrayInsertEvent>,
    insert_rejected: Signal<ArrayInsertEvent>,
    removed: Signal<ArrayRemoveEvent>,
    remove_rejected: Signal<ArrayRemoveEvent>,
}

impl ArrayProperty {
    /// Fixed-size array property from its three mandatory accessors
    pub fn new<Sz, G, S>(
        name: impl Into<String>,
        element_type: TypeInfo,
        size: Sz,
        get: G,
        set: S,
    ) -> Self
    where
        Sz: Fn(InstanceRef<'_>) -> Result<usize> + Send + Sync + 'static,
        G: Fn(InstanceRef<'_>, usize) -> Result<Value> + Send + Sync + 'static,
        S: Fn(InstanceMut<'_>, usize, Value) -> Result<()> + Send + Sync + 'static,
    {
        let type_info = TypeInfo::array(element_type.clone());
        Self {
            core: PropertyCore::new(name, type_info),
            element_type,
            size_fn: Box::new(size),
            get_fn: Box::new(get),
            set_fn: Box::new(set),
            dynamic: None,
            changed: Signal::new(),
            set_rejected: Signal::new(),
            inserted: Signal::new(),
            insert_rejected: Signal::new(),
            removed: Signal::new(),
            remove_rejected: Signal::new(),
        }
    }

    /// Upgrade to a dynamic array by supplying the size-changing accessors
    pub fn dynamic<I, R, Rs>(mut self, insert: I, remove: R, resize: Rs) -> Self
    where
        I: Fn(InstanceMut<'_>, usize, Value) -> Result<()> + Send + Sync + 'static,
        R: Fn(InstanceMut<'_>, usize) -> Result<()> + Send + Sync + 'static,
        Rs: Fn(InstanceMut<'_>, usize) -> Result<()> + Send + Sync + 'static,
    {
        self.dynamic = Some(DynamicOps {
            insert: Box::new(insert),
            remove: Box::new(remove),
            resize: Box::new(resize),
        });
        self
    }

    /// Gate reads on a per-object predicate
    pub fn readable_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ObjectHandle) -> bool + Send + Sync + 'static,
    {
        self.core
            .set_readable(crate::property::AccessGate::when(predicate));
        self
    }

    /// Gate writes on a per-object predicate
    pub fn writable_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&ObjectHandle) -> bool + Send + Sync + 'static,
    {
        self.core
            .set_writable(crate::property::AccessGate::when(predicate));
        self
    }

    /// Attach a metadata tag
    pub fn tag(mut self, name: impl Into<String>, value: Value) -> Self {
        self.core.tags_mut().insert(name, value);
        self
    }

    /// Declared element type
    pub fn element_type(&self) -> &TypeInfo {
        &self.element_type
    }

    /// Whether the array can change size
    pub fn is_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    /// Number of elements
    pub fn size(&self, object: &ObjectHandle) -> Result<usize> {
        if !self.readable(object) {
            return Err(self.forbidden_read());
        }
        (self.size_fn)(InstanceRef::new(self.core.adjusted(object)?))
    }

    /// Element at an index
    pub fn element(&self, object: &ObjectHandle, index: usize) -> Result<Value> {
        if !self.readable(object) {
            return Err(self.forbidden_read());
        }
        let size = self.size(object)?;
        if index >= size {
            return Err(Error::OutOfRange { index, size });
        }
        (self.get_fn)(InstanceRef::new(self.core.adjusted(object)?), index)
    }

    /// Overwrite the element at an index
    pub fn set_element(&self, object: &ObjectHandle, index: usize, value: Value) -> Result<()> {
        if !self.writable(object) {
            self.set_rejected
                .emit(&self.set_event(object, index, &value))?;
            return Err(self.forbidden_write());
        }
        let size = self.size(object)?;
        if index >= size {
            return Err(Error::OutOfRange { index, size });
        }
        let value = conform(&self.element_type, value)?;
        self.changed.emit(&self.set_event(object, index, &value))?;
        (self.set_fn)(InstanceMut::new(self.core.adjusted(object)?), index, value)
    }

    /// Insert a new element before the given index; `before == size`
    /// appends
    pub fn insert(&self, object: &ObjectHandle, before: usize, value: Value) -> Result<()> {
        let Some(ops) = self.dynamic.as_ref() else {
            return Err(self.forbidden_write());
        };
        if !self.writable(object) {
            self.insert_rejected
                .emit(&self.insert_event(object, &value))?;
            return Err(self.forbidden_write());
        }
        let size = self.size(object)? + 1;
        if before >= size {
            return Err(Error::OutOfRange {
                index: before,
                size,
            });
        }
        let value = conform(&self.element_type, value)?;
        self.inserted.emit(&self.insert_event(object, &value))?;
        (ops.insert)(InstanceMut::new(self.core.adjusted(object)?), before, value)
    }

    /// Remove the element at an index
    pub fn remove(&self, object: &ObjectHandle, index: usize) -> Result<()> {
        let Some(ops) = self.dynamic.as_ref() else {
            return Err(self.forbidden_write());
        };
        if !self.writable(object) {
            self.remove_rejected
                .emit(&self.remove_event(object, index))?;
            return Err(self.forbidden_write());
        }
        let size = self.size(object)?;
        if index >= size {
            return Err(Error::OutOfRange { index, size });
        }
        self.removed.emit(&self.remove_event(object, index))?;
        (ops.remove)(InstanceMut::new(self.core.adjusted(object)?), index)
    }

    /// Change the number of elements
    pub fn resize(&self, object: &ObjectHandle, new_size: usize) -> Result<()> {
        let Some(ops) = self.dynamic.as_ref() else {
            return Err(self.forbidden_write());
        };
        if !self.writable(object) {
            return Err(self.forbidden_write());
        }
        (ops.resize)(InstanceMut::new(self.core.adjusted(object)?), new_size)
    }

    /// Signal fired before each accepted element write
    pub fn changed(&self) -> &Signal<ArraySetEvent> {
        &self.changed
    }

    /// Signal fired before each rejected element write
    pub fn set_rejected(&self) -> &Signal<ArraySetEvent> {
        &self.set_rejected
    }

    /// Signal fired before each accepted insertion
    pub fn inserted(&self) -> &Signal<ArrayInsertEvent> {
        &self.inserted
    }

    /// Signal fired before each rejected insertion
    pub fn insert_rejected(&self) -> &Signal<ArrayInsertEvent> {
        &self.insert_rejected
    }

    /// Signal fired before each accepted removal
    pub fn removed(&self) -> &Signal<ArrayRemoveEvent> {
        &self.removed
    }

    /// Signal fired before each rejected removal
    pub fn remove_rejected(&self) -> &Signal<ArrayRemoveEvent> {
        &self.remove_rejected
    }

    /// Connect to the element-changed signal
    pub fn connect_changed<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&ArraySetEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.changed.connect(observer)
    }

    /// Connect to the inserted signal
    pub fn connect_inserted<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&ArrayInsertEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.inserted.connect(observer)
    }

    /// Connect to the removed signal
    pub fn connect_removed<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&ArrayRemoveEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.removed.connect(observer)
    }

    fn set_event(&self, object: &ObjectHandle, index: usize, value: &Value) -> ArraySetEvent {
        ArraySetEvent {
            object: object.clone(),
            property: self.core.name().to_string(),
            index,
            value: value.clone(),
        }
    }

    fn insert_event(&self, object: &ObjectHandle, value: &Value) -> ArrayInsertEvent {
        ArrayInsertEvent {
            object: object.clone(),
            property: self.core.name().to_string(),
            value: value.clone(),
        }
    }

    fn remove_event(&self, object: &ObjectHandle, index: usize) -> ArrayRemoveEvent {
        ArrayRemoveEvent {
            object: object.clone(),
            property: self.core.name().to_string(),
            index,
        }
    }

    fn forbidden_read(&self) -> Error {
        Error::ForbiddenRead {
            property: self.core.name().to_string(),
        }
    }

    fn forbidden_write(&self) -> Error {
        Error::ForbiddenWrite {
            property: self.core.name().to_string(),
        }
    }
}

impl PropertyAccess for ArrayProperty {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> Kind {
        Kind::Array
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
        self.core.writable_on(object)
    }

    /// Scalar view of an array reads element 0
    fn get(&self, object: &ObjectHandle) -> Result<Value> {
        self.element(object, 0)
    }

    /// Scalar view of an array writes element 0
    fn set(&self, object: &ObjectHandle, value: Value) -> Result<()> {
        self.set_element(object, 0, value)
    }

    fn as_array(&self) -> Option<&ArrayProperty> {
        Some(self)
    }

    fn accept(&self, visitor: &mut dyn ClassVisitor) {
        visitor.visit_array(self);
    }

    fn bind(&self, class: &Arc<Class>) {
        self.core.bind(class);
    }
}

impl std::fmt::Debug for ArrayProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayProperty")
            .field("name", &self.core.name())
            .field("element_type", &self.element_type)
            .field("dynamic", &self.is_dynamic())
            .finish()
    }
}
