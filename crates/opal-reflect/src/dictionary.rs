//! Keyed-container properties
//!
//! A [`DictionaryProperty`] exposes an unordered, key-addressed container.
//! Lookups of a missing key fail [`Error::ElementNotFound`] — distinct
//! from the array's `OutOfRange`, reflecting keyed semantics. `set` has
//! upsert semantics; `remove` of a missing key is an error. The asymmetry
//! is deliberate and preserved from the original behavior.
//!
//! Iteration goes through [`DictionaryCursor`], a cursor over a snapshot
//! of the pairs taken when the cursor is created. Structural mutations
//! made while a cursor is alive are simply not visible to it.

use std::sync::Arc;

use crate::class::{Class, ClassVisitor};
use crate::error::{Error, Result};
use crate::object::{InstanceMut, InstanceRef, ObjectHandle};
use crate::property::{conform, AccessGate, PropertyAccess, PropertyCore};
use crate::signal::{Signal, SlotId};
use crate::tags::TagMap;
use crate::typeinfo::{Kind, TypeInfo};
use crate::value::Value;

type SizeFn = Box<dyn Fn(InstanceRef<'_>) -> Result<usize> + Send + Sync>;
type ExistsFn = Box<dyn Fn(InstanceRef<'_>, &Value) -> Result<bool> + Send + Sync>;
type GetFn = Box<dyn Fn(InstanceRef<'_>, &Value) -> Result<Value> + Send + Sync>;
type SetFn = Box<dyn Fn(InstanceMut<'_>, Value, Value) -> Result<()> + Send + Sync>;
type RemoveFn = Box<dyn Fn(InstanceMut<'_>, &Value) -> Result<()> + Send + Sync>;
type IterFn = Box<dyn Fn(InstanceRef<'_>) -> Result<DictionaryCursor> + Send + Sync>;

/// Fired for keyed writes
#[derive(Debug)]
pub struct DictionarySetEvent {
    /// Target object
    pub object: ObjectHandle,
    /// Property name
    pub property: String,
    /// Key being written
    pub key: Value,
    /// Value being written
    pub value: Value,
}

/// Fired for keyed removals
#[derive(Debug)]
pub struct DictionaryRemoveEvent {
    /// Target object
    pub object: ObjectHandle,
    /// Property name
    pub property: String,
    /// Key being removed
    pub key: Value,
}

/// Cursor over a snapshot of a dictionary's pairs
#[derive(Debug)]
pub struct DictionaryCursor {
    pairs: Vec<(Value, Value)>,
    position: usize,
}

impl DictionaryCursor {
    /// Cursor positioned on the first of the given pairs
    pub fn new(pairs: Vec<(Value, Value)>) -> Self {
        Self { pairs, position: 0 }
    }

    /// True while the cursor points at a pair
    pub fn valid(&self) -> bool {
        self.position < self.pairs.len()
    }

    /// Current key, if the cursor is valid
    pub fn key(&self) -> Option<&Value> {
        self.pairs.get(self.position).map(|(k, _)| k)
    }

    /// Current value, if the cursor is valid
    pub fn value(&self) -> Option<&Value> {
        self.pairs.get(self.position).map(|(_, v)| v)
    }

    /// Current pair, if the cursor is valid
    pub fn entry(&self) -> Option<(&Value, &Value)> {
        self.pairs.get(self.position).map(|(k, v)| (k, v))
    }

    /// Advance past the current pair
    pub fn next(&mut self) {
        if self.position < self.pairs.len() {
            self.position += 1;
        }
    }

    /// Current key, advancing the cursor
    pub fn next_key(&mut self) -> Option<Value> {
        let key = self.key().cloned();
        self.next();
        key
    }

    /// Current value, advancing the cursor
    pub fn next_value(&mut self) -> Option<Value> {
        let value = self.value().cloned();
        self.next();
        value
    }
}

/// Property over a key-addressed container
pub struct DictionaryProperty {
    core: PropertyCore,
    key_type: TypeInfo,
    element_type: TypeInfo,
    size_fn: SizeFn,
    exists_fn: ExistsFn,
    get_fn: GetFn,
    set_fn: SetFn,
    remove_fn: RemoveFn,
    iter_fn: IterFn,
    changed: Signal<DictionarySetEvent>,
    set_rejected: Signal<DictionarySetEvent>,
    removed: Signal<DictionaryRemoveEvent>,
    remove_rejected: Signal<DictionaryRemoveEvent>,
}

impl DictionaryProperty {
    /// Dictionary property from its six accessors
    #[allow(clippy::too_many_arguments)]
    pub fn new<Sz, E, G, S, R, I>(
        name: impl Into<String>,
        key_type: TypeInfo,
        element_type: TypeInfo,
        size: Sz,
        exists: E,
        get: G,
        set: S,
        remove: R,
        iterate: I,
    ) -> Self
    where
        Sz: Fn(InstanceRef<'_>) -> Result<usize> + Send + Sync + 'static,
        E: Fn(InstanceRef<'_>, &Value) -> Result<bool> + Send + Sync + 'static,
        G: Fn(InstanceRef<'_>, &Value) -> Result<Value> + Send + Sync + 'static,
        S: Fn(InstanceMut<'_>, Value, Value) -> Result<()> + Send + Sync + 'static,
        R: Fn(InstanceMut<'_>, &Value) -> Result<()> + Send + Sync + 'static,
        I: Fn(InstanceRef<'_>) -> Result<DictionaryCursor> + Send + Sync + 'static,
    {
        let type_info = TypeInfo::dictionary(key_type.clone(), element_type.clone());
        Self {
            core: PropertyCore::new(name, type_info),
            key_type,
            element_type,
            size_fn: Box::new(size),
            exists_fn: Box::new(exists),
            get_fn: Box::new(get),
            set_fn: Box::new(set),
            remove_fn: Box::new(remove),
            iter_fn: Box::new(iterate),
            changed: Signal::new(),
            set_rejected: Signal::new(),
            removed: Signal::new(),
            remove_rejected: Signal::new(),
        }
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

    /// Declared key type
    pub fn key_type(&self) -> &TypeInfo {
        &self.key_type
    }

    /// Declared element type
    pub fn element_type(&self) -> &TypeInfo {
        &self.element_type
    }

    /// Number of pairs
    pub fn size(&self, object: &ObjectHandle) -> Result<usize> {
        if !self.readable(object) {
            return Err(self.forbidden_read());
        }
        (self.size_fn)(InstanceRef::new(self.core.adjusted(object)?))
    }

    /// Check for a key without failing on absence
    pub fn exists(&self, object: &ObjectHandle, key: &Value) -> Result<bool> {
        if !self.readable(object) {
            return Err(self.forbidden_read());
        }
        let key = conform(&self.key_type, key.clone())?;
        (self.exists_fn)(InstanceRef::new(self.core.adjusted(object)?), &key)
    }

    /// Element under a key
    pub fn element(&self, object: &ObjectHandle, key: &Value) -> Result<Value> {
        if !self.exists(object, key)? {
            return Err(Error::ElementNotFound);
        }
        let key = conform(&self.key_type, key.clone())?;
        (self.get_fn)(InstanceRef::new(self.core.adjusted(object)?), &key)
    }

    /// Create or overwrite the element under a key
    pub fn set_element(&self, object: &ObjectHandle, key: Value, value: Value) -> Result<()> {
        if !self.writable(object) {
            self.set_rejected
                .emit(&self.set_event(object, &key, &value))?;
            return Err(self.forbidden_write());
        }
        let key = conform(&self.key_type, key)?;
        let value = conform(&self.element_type, value)?;
        self.changed.emit(&self.set_event(object, &key, &value))?;
        (self.set_fn)(InstanceMut::new(self.core.adjusted(object)?), key, value)
    }

    /// Remove the element under a key
    pub fn remove(&self, object: &ObjectHandle, key: &Value) -> Result<()> {
        if !self.exists(object, key)? {
            return Err(Error::ElementNotFound);
        }
        if !self.writable(object) {
            self.remove_rejected
                .emit(&self.remove_event(object, key))?;
            return Err(self.forbidden_write());
        }
        let key = conform(&self.key_type, key.clone())?;
        self.removed.emit(&self.remove_event(object, &key))?;
        (self.remove_fn)(InstanceMut::new(self.core.adjusted(object)?), &key)
    }

    /// Fresh cursor positioned on the first pair
    pub fn iterate(&self, object: &ObjectHandle) -> Result<DictionaryCursor> {
        if !self.readable(object) {
            return Err(self.forbidden_read());
        }
        (self.iter_fn)(InstanceRef::new(self.core.adjusted(object)?))
    }

    /// Signal fired before each accepted upsert
    pub fn changed(&self) -> &Signal<DictionarySetEvent> {
        &self.changed
    }

    /// Signal fired before each rejected upsert
    pub fn set_rejected(&self) -> &Signal<DictionarySetEvent> {
        &self.set_rejected
    }

    /// Signal fired before each accepted removal
    pub fn removed(&self) -> &Signal<DictionaryRemoveEvent> {
        &self.removed
    }

    /// Signal fired before each rejected removal
    pub fn remove_rejected(&self) -> &Signal<DictionaryRemoveEvent> {
        &self.remove_rejected
    }

    /// Connect to the upsert signal
    pub fn connect_changed<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&DictionarySetEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.changed.connect(observer)
    }

    /// Connect to the removal signal
    pub fn connect_removed<F>(&self, observer: F) -> SlotId
    where
        F: Fn(&DictionaryRemoveEvent) -> Result<()> + Send + Sync + 'static,
    {
        self.removed.connect(observer)
    }

    fn set_event(&self, object: &ObjectHandle, key: &Value, value: &Value) -> DictionarySetEvent {
        DictionarySetEvent {
            object: object.clone(),
            property: self.core.name().to_string(),
            key: key.clone(),
            value: value.clone(),
        }
    }

    fn remove_event(&self, object: &ObjectHandle, key: &Value) -> DictionaryRemoveEvent {
        DictionaryRemoveEvent {
            object: object.clone(),
            property: self.core.name().to_string(),
            key: key.clone(),
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

impl PropertyAccess for DictionaryProperty {
    fn name(&self) -> &str {
        self.core.name()
    }

    fn kind(&self) -> Kind {
        Kind::Dictionary
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

    /// A dictionary has no scalar view; reads answer the none value
    fn get(&self, _object: &ObjectHandle) -> Result<Value> {
        Ok(Value::None)
    }

    /// A dictionary has no scalar view; writes are ignored
    fn set(&self, _object: &ObjectHandle, _value: Value) -> Result<()> {
        Ok(())
    }

    fn as_dictionary(&self) -> Option<&DictionaryProperty> {
        Some(self)
    }

    fn accept(&self, visitor: &mut dyn ClassVisitor) {
        visitor.visit_dictionary(self);
    }

    fn bind(&self, class: &Arc<Class>) {
        self.core.bind(class);
    }
}

impl std::fmt::Debug for DictionaryProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryProperty")
            .field("name", &self.core.name())
            .field("key_type", &self.key_type)
            .field("element_type", &self.element_type)
            .finish()
    }
}
