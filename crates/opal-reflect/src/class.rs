//! Metaclasses
//!
//! A [`Class`] is the runtime descriptor of one registered type: its
//! property and function tables (own members plus everything inherited,
//! in declaration order), constructor list, base classes with their byte
//! offsets, and the destructor callback. Classes are built once with
//! [`ClassBuilder`] and frozen behind an `Arc`; there is no mutation path
//! after `build`, which is what makes read access safely shareable.
//!
//! Base classes are registered with the byte offset of the base subobject
//! inside the derived layout (`core::mem::offset_of!` at the binding
//! site). [`Class::apply_offset`] walks the base graph in both directions
//! so an instance address converts freely between related metaclasses —
//! upcasts and downcasts alike — without host RTTI.

use std::ptr::NonNull;
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap;

use crate::array::ArrayProperty;
use crate::constructor::Constructor;
use crate::dictionary::DictionaryProperty;
use crate::error::{Error, Result};
use crate::function::Function;
use crate::object::ObjectHandle;
use crate::property::{Property, PropertyAccess};
use crate::tags::TagMap;
use crate::typeinfo::Kind;
use crate::value::Value;

type DestructorFn = Box<dyn Fn(NonNull<u8>) + Send + Sync>;

/// Kind-specific callbacks for [`Class::visit`]
///
/// Properties are visited in declaration order, then functions. Every
/// callback has an empty default so visitors implement only what they
/// care about.
pub trait ClassVisitor {
    /// Scalar property
    fn visit_property(&mut self, _property: &Property) {}
    /// Array property
    fn visit_array(&mut self, _property: &ArrayProperty) {}
    /// Dictionary property
    fn visit_dictionary(&mut self, _property: &DictionaryProperty) {}
    /// Function
    fn visit_function(&mut self, _function: &Function) {}
}

struct BaseInfo {
    class: Arc<Class>,
    offset: isize,
}

/// Runtime descriptor of a registered type
pub struct Class {
    name: String,
    tags: TagMap,
    properties: Vec<Arc<dyn PropertyAccess>>,
    property_index: FxHashMap<String, usize>,
    own_properties: Vec<Arc<dyn PropertyAccess>>,
    own_property_index: FxHashMap<String, usize>,
    functions: Vec<Arc<Function>>,
    function_index: FxHashMap<String, usize>,
    own_functions: Vec<Arc<Function>>,
    own_function_index: FxHashMap<String, usize>,
    constructors: Vec<Constructor>,
    bases: Vec<BaseInfo>,
    destructor: Option<DestructorFn>,
    // Set once by ClassBuilder::build; lets construct hand out handles
    // that keep their metaclass alive.
    self_ref: OnceCell<Weak<Class>>,
}

impl Class {
    /// Class name, unique process-wide once registered
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declaration-time metadata
    pub fn tags(&self) -> &TagMap {
        &self.tags
    }

    /// Number of direct base classes
    pub fn base_count(&self) -> usize {
        self.bases.len()
    }

    /// Direct base class by position
    pub fn base(&self, index: usize) -> Result<&Arc<Class>> {
        self.bases
            .get(index)
            .map(|b| &b.class)
            .ok_or(Error::OutOfRange {
                index,
                size: self.bases.len(),
            })
    }

    /// Number of properties, inherited ones included
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Number of properties declared by this class itself
    pub fn own_property_count(&self) -> usize {
        self.own_properties.len()
    }

    /// Check for a property, inherited ones included
    pub fn has_property(&self, name: &str) -> bool {
        self.property_index.contains_key(name)
    }

    /// Check for a property declared by this class itself
    pub fn has_own_property(&self, name: &str) -> bool {
        self.own_property_index.contains_key(name)
    }

    /// Property by declaration index, inherited ones included
    pub fn property_at(&self, index: usize) -> Result<&dyn PropertyAccess> {
        self.properties
            .get(index)
            .map(|p| p.as_ref())
            .ok_or(Error::OutOfRange {
                index,
                size: self.properties.len(),
            })
    }

    /// Own property by declaration index
    pub fn own_property_at(&self, index: usize) -> Result<&dyn PropertyAccess> {
        self.own_properties
            .get(index)
            .map(|p| p.as_ref())
            .ok_or(Error::OutOfRange {
                index,
                size: self.own_properties.len(),
            })
    }

    /// Property by name, inherited ones included
    pub fn property(&self, name: &str) -> Result<&dyn PropertyAccess> {
        self.property_index
            .get(name)
            .map(|&i| self.properties[i].as_ref())
            .ok_or_else(|| Error::PropertyNotFound {
                name: name.to_string(),
                class: self.name.clone(),
            })
    }

    /// Own property by name
    pub fn own_property(&self, name: &str) -> Result<&dyn PropertyAccess> {
        self.own_property_index
            .get(name)
            .map(|&i| self.own_properties[i].as_ref())
            .ok_or_else(|| Error::PropertyNotFound {
                name: name.to_string(),
                class: self.name.clone(),
            })
    }

    /// Scalar leaf of a named property
    pub fn scalar_property(&self, name: &str) -> Result<&Property> {
        let property = self.property(name)?;
        property.as_scalar().ok_or(Error::BadType {
            from: property.kind(),
            to: Kind::Value,
        })
    }

    /// Array leaf of a named property
    pub fn array_property(&self, name: &str) -> Result<&ArrayProperty> {
        let property = self.property(name)?;
        property.as_array().ok_or(Error::BadType {
            from: property.kind(),
            to: Kind::Array,
        })
    }

    /// Dictionary leaf of a named property
    pub fn dictionary_property(&self, name: &str) -> Result<&DictionaryProperty> {
        let property = self.property(name)?;
        property.as_dictionary().ok_or(Error::BadType {
            from: property.kind(),
            to: Kind::Dictionary,
        })
    }

    /// Number of functions, inherited ones included
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Number of functions declared by this class itself
    pub fn own_function_count(&self) -> usize {
        self.own_functions.len()
    }

    /// Check for a function, inherited ones included
    pub fn has_function(&self, name: &str) -> bool {
        self.function_index.contains_key(name)
    }

    /// Function by declaration index, inherited ones included
    pub fn function_at(&self, index: usize) -> Result<&Function> {
        self.functions
            .get(index)
            .map(|f| f.as_ref())
            .ok_or(Error::OutOfRange {
                index,
                size: self.functions.len(),
            })
    }

    /// Function by name, inherited ones included
    pub fn function(&self, name: &str) -> Result<&Function> {
        self.function_index
            .get(name)
            .map(|&i| self.functions[i].as_ref())
            .ok_or_else(|| Error::FunctionNotFound {
                name: name.to_string(),
                class: self.name.clone(),
            })
    }

    /// Own function by name
    pub fn own_function(&self, name: &str) -> Result<&Function> {
        self.own_function_index
            .get(name)
            .map(|&i| self.own_functions[i].as_ref())
            .ok_or_else(|| Error::FunctionNotFound {
                name: name.to_string(),
                class: self.name.clone(),
            })
    }

    /// Number of registered constructors
    pub fn constructor_count(&self) -> usize {
        self.constructors.len()
    }

    /// Constructor by position
    pub fn constructor(&self, index: usize) -> Result<&Constructor> {
        self.constructors.get(index).ok_or(Error::OutOfRange {
            index,
            size: self.constructors.len(),
        })
    }

    /// Build a new instance from the first constructor matching the
    /// arguments
    ///
    /// Failing to match any constructor is a normal outcome and answers
    /// the nothing handle; only a matched factory that fails to allocate
    /// surfaces an error.
    pub fn construct(&self, args: &[Value]) -> Result<ObjectHandle> {
        for constructor in &self.constructors {
            if constructor.matches(args) {
                let ptr = constructor.create(args)?;
                let class = self
                    .self_ref
                    .get()
                    .and_then(Weak::upgrade)
                    .ok_or(Error::NullObject)?;
                return Ok(ObjectHandle::owned(&class, ptr));
            }
        }
        Ok(ObjectHandle::nothing())
    }

    /// Release an instance created by [`Class::construct`]
    ///
    /// The handle (and every copy of it) must not be used afterwards; no
    /// use-after-destroy detection exists. Destroying the nothing handle
    /// is a no-op.
    pub fn destroy(&self, object: &ObjectHandle) -> Result<()> {
        if object.is_nothing() {
            return Ok(());
        }
        let ptr = object.pointer()?;
        if let Some(destructor) = &self.destructor {
            destructor(ptr);
        }
        Ok(())
    }

    /// Visit every property in declaration order, then every function
    pub fn visit(&self, visitor: &mut dyn ClassVisitor) {
        for property in &self.properties {
            property.accept(visitor);
        }
        for function in &self.functions {
            visitor.visit_function(function);
        }
    }

    /// Adjust an instance address between this metaclass and a related one
    ///
    /// `target` is searched first as an ancestor of this class (positive
    /// offset), then as a descendant (negative offset, found by asking
    /// `target` for its offset to this class). Unrelated classes fail
    /// [`Error::ClassUnrelated`].
    pub fn apply_offset(&self, pointer: NonNull<u8>, target: &Arc<Class>) -> Result<NonNull<u8>> {
        if let Some(offset) = self.offset_to(target) {
            return adjust(pointer, offset);
        }
        if let Some(offset) = target.offset_to(self) {
            return adjust(pointer, -offset);
        }
        Err(Error::ClassUnrelated {
            from: self.name.clone(),
            to: target.name.clone(),
        })
    }

    /// Cumulative offset from this class to an ancestor, if related
    fn offset_to(&self, target: &Class) -> Option<isize> {
        if self.name == target.name {
            return Some(0);
        }
        self.bases
            .iter()
            .find_map(|base| base.class.offset_to(target).map(|o| o + base.offset))
    }
}

fn adjust(pointer: NonNull<u8>, offset: isize) -> Result<NonNull<u8>> {
    NonNull::new(pointer.as_ptr().wrapping_offset(offset)).ok_or(Error::NullObject)
}

impl PartialEq for Class {
    /// Two metaclasses are equal iff their names are
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Class {}

impl std::fmt::Debug for Class {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("properties", &self.properties.len())
            .field("functions", &self.functions.len())
            .field("bases", &self.bases.len())
            .finish()
    }
}

/// Append-only builder for a [`Class`]
///
/// Members are collected in declaration order; own members shadow
/// inherited ones of the same name regardless of the order `base` was
/// called in. `build` freezes everything into an `Arc<Class>` and binds
/// each own member to its declaring class.
pub struct ClassBuilder {
    name: String,
    tags: TagMap,
    properties: Vec<Arc<dyn PropertyAccess>>,
    property_index: FxHashMap<String, usize>,
    own_properties: Vec<Arc<dyn PropertyAccess>>,
    own_property_index: FxHashMap<String, usize>,
    functions: Vec<Arc<Function>>,
    function_index: FxHashMap<String, usize>,
    own_functions: Vec<Arc<Function>>,
    own_function_index: FxHashMap<String, usize>,
    constructors: Vec<Constructor>,
    bases: Vec<BaseInfo>,
    destructor: Option<DestructorFn>,
    defect: Option<Error>,
}

impl ClassBuilder {
    /// Start declaring a class
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tags: TagMap::new(),
            properties: Vec::new(),
            property_index: FxHashMap::default(),
            own_properties: Vec::new(),
            own_property_index: FxHashMap::default(),
            functions: Vec::new(),
            function_index: FxHashMap::default(),
            own_functions: Vec::new(),
            own_function_index: FxHashMap::default(),
            constructors: Vec::new(),
            bases: Vec::new(),
            destructor: None,
            defect: None,
        }
    }

    /// Attach a metadata tag to the class
    pub fn tag(mut self, name: impl Into<String>, value: Value) -> Self {
        self.tags.insert(name, value);
        self
    }

    /// Declare a scalar property
    pub fn property(mut self, property: Property) -> Self {
        self.add_property(Arc::new(property));
        self
    }

    /// Declare an array property
    pub fn array(mut self, property: ArrayProperty) -> Self {
        self.add_property(Arc::new(property));
        self
    }

    /// Declare a dictionary property
    pub fn dictionary(mut self, property: DictionaryProperty) -> Self {
        self.add_property(Arc::new(property));
        self
    }

    /// Declare a function
    pub fn function(mut self, function: Function) -> Self {
        let function = Arc::new(function);
        let name = function.name().to_string();
        if self.own_function_index.contains_key(&name) {
            self.flag_duplicate(&name);
            return self;
        }
        self.own_function_index
            .insert(name.clone(), self.own_functions.len());
        self.own_functions.push(Arc::clone(&function));
        match self.function_index.get(&name) {
            Some(&i) => self.functions[i] = function,
            None => {
                self.function_index.insert(name, self.functions.len());
                self.functions.push(function);
            }
        }
        self
    }

    /// Declare a constructor
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.constructors.push(constructor);
        self
    }

    /// Declare a base class at the byte offset of its subobject within
    /// the derived layout
    ///
    /// The base's members (its own and everything it inherited) become
    /// visible through this class unless shadowed by an own member.
    pub fn base(mut self, class: &Arc<Class>, offset: isize) -> Self {
        for property in &class.properties {
            let name = property.name().to_string();
            if !self.property_index.contains_key(&name) {
                self.property_index.insert(name, self.properties.len());
                self.properties.push(Arc::clone(property));
            }
        }
        for function in &class.functions {
            let name = function.name().to_string();
            if !self.function_index.contains_key(&name) {
                self.function_index.insert(name, self.functions.len());
                self.functions.push(Arc::clone(function));
            }
        }
        self.bases.push(BaseInfo {
            class: Arc::clone(class),
            offset,
        });
        self
    }

    /// Register the destructor callback invoked by [`Class::destroy`]
    pub fn destructor<F>(mut self, destructor: F) -> Self
    where
        F: Fn(NonNull<u8>) + Send + Sync + 'static,
    {
        self.destructor = Some(Box::new(destructor));
        self
    }

    /// Freeze into an immutable metaclass
    pub fn build(self) -> Result<Arc<Class>> {
        if let Some(defect) = self.defect {
            return Err(defect);
        }
        let class = Arc::new(Class {
            name: self.name,
            tags: self.tags,
            properties: self.properties,
            property_index: self.property_index,
            own_properties: self.own_properties,
            own_property_index: self.own_property_index,
            functions: self.functions,
            function_index: self.function_index,
            own_functions: self.own_functions,
            own_function_index: self.own_function_index,
            constructors: self.constructors,
            bases: self.bases,
            destructor: self.destructor,
            self_ref: OnceCell::new(),
        });
        let _ = class.self_ref.set(Arc::downgrade(&class));
        for property in &class.own_properties {
            property.bind(&class);
        }
        for function in &class.own_functions {
            function.bind(&class);
        }
        Ok(class)
    }

    fn add_property(&mut self, property: Arc<dyn PropertyAccess>) {
        let name = property.name().to_string();
        if self.own_property_index.contains_key(&name) {
            self.flag_duplicate(&name);
            return;
        }
        self.own_property_index
            .insert(name.clone(), self.own_properties.len());
        self.own_properties.push(Arc::clone(&property));
        match self.property_index.get(&name) {
            Some(&i) => self.properties[i] = property,
            None => {
                self.property_index.insert(name, self.properties.len());
                self.properties.push(property);
            }
        }
    }

    fn flag_duplicate(&mut self, name: &str) {
        if self.defect.is_none() {
            self.defect = Some(Error::DuplicateMember {
                class: self.name.clone(),
                name: name.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{drop_erased, into_erased, InstanceMut, InstanceRef};
    use crate::typeinfo::TypeInfo;
    use std::mem::offset_of;

    #[repr(C)]
    #[derive(Default)]
    struct Named {
        name: String,
    }

    #[repr(C)]
    #[derive(Default)]
    struct Labeled {
        label: i64,
    }

    #[repr(C)]
    #[derive(Default)]
    struct Widget {
        named: Named,
        labeled: Labeled,
        width: i64,
    }

    fn named_class() -> Arc<Class> {
        ClassBuilder::new("Named")
            .property(
                Property::new("name", TypeInfo::String, |i: InstanceRef<'_>| {
                    Ok(Value::from(unsafe { i.downcast_ref::<Named>() }.name.clone()))
                })
                .with_setter(|i: InstanceMut<'_>, v| {
                    unsafe { i.downcast_mut::<Named>() }.name = v.to_text()?;
                    Ok(())
                }),
            )
            .build()
            .unwrap()
    }

    fn labeled_class() -> Arc<Class> {
        ClassBuilder::new("Labeled")
            .property(
                Property::new("label", TypeInfo::Int, |i: InstanceRef<'_>| {
                    Ok(Value::Int(unsafe { i.downcast_ref::<Labeled>() }.label))
                })
                .with_setter(|i: InstanceMut<'_>, v| {
                    unsafe { i.downcast_mut::<Labeled>() }.label = v.to_int()?;
                    Ok(())
                }),
            )
            .build()
            .unwrap()
    }

    fn widget_class(named: &Arc<Class>, labeled: &Arc<Class>) -> Arc<Class> {
        ClassBuilder::new("Widget")
            .base(named, offset_of!(Widget, named) as isize)
            .base(labeled, offset_of!(Widget, labeled) as isize)
            .property(
                Property::new("width", TypeInfo::Int, |i: InstanceRef<'_>| {
                    Ok(Value::Int(unsafe { i.downcast_ref::<Widget>() }.width))
                })
                .with_setter(|i: InstanceMut<'_>, v| {
                    unsafe { i.downcast_mut::<Widget>() }.width = v.to_int()?;
                    Ok(())
                }),
            )
            .constructor(Constructor::new(vec![], |_| {
                Ok(into_erased(Box::new(Widget::default())))
            }))
            .destructor(|ptr| unsafe { drop_erased::<Widget>(ptr) })
            .build()
            .unwrap()
    }

    #[test]
    fn test_member_tables() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        assert_eq!(widget.property_count(), 3);
        assert_eq!(widget.own_property_count(), 1);
        assert!(widget.has_property("name"));
        assert!(!widget.has_own_property("name"));
        assert!(widget.has_own_property("width"));

        // Indexed access never fails below the count, and own names are
        // pairwise distinct.
        for i in 0..widget.property_count() {
            assert!(widget.property_at(i).is_ok());
        }
        assert!(matches!(
            widget.property_at(3),
            Err(Error::OutOfRange { index: 3, size: 3 })
        ));

        assert_eq!(
            widget.property("ghost").unwrap_err(),
            Error::PropertyNotFound {
                name: "ghost".to_string(),
                class: "Widget".to_string(),
            }
        );
    }

    #[test]
    fn test_base_access() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        assert_eq!(widget.base_count(), 2);
        assert_eq!(widget.base(0).unwrap().name(), "Named");
        assert_eq!(widget.base(1).unwrap().name(), "Labeled");
        assert!(matches!(
            widget.base(2),
            Err(Error::OutOfRange { index: 2, size: 2 })
        ));
    }

    #[test]
    fn test_inherited_property_through_nonzero_offset() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        let mut w = Widget::default();
        w.labeled.label = 7;
        let obj = ObjectHandle::of(&widget, &mut w);

        // "label" was declared on Labeled, which sits at a non-zero
        // offset inside Widget; the access adjusts the address.
        let label = widget.property("label").unwrap();
        assert_eq!(label.get(&obj).unwrap(), Value::Int(7));
        label.set(&obj, Value::from(9)).unwrap();
        assert_eq!(w.labeled.label, 9);
    }

    #[test]
    fn test_apply_offset_inverse() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        let offset = offset_of!(Widget, labeled);
        assert_ne!(offset, 0);

        let mut w = Widget::default();
        let base = NonNull::from(&mut w).cast::<u8>();

        let up = widget.apply_offset(base, &labeled).unwrap();
        assert_eq!(up.as_ptr() as usize, base.as_ptr() as usize + offset);

        let down = labeled.apply_offset(up, &widget).unwrap();
        assert_eq!(down, base);
    }

    #[test]
    fn test_apply_offset_unrelated() {
        let named = named_class();
        let labeled = labeled_class();

        let mut n = Named::default();
        let ptr = NonNull::from(&mut n).cast::<u8>();
        assert_eq!(
            named.apply_offset(ptr, &labeled).unwrap_err(),
            Error::ClassUnrelated {
                from: "Named".to_string(),
                to: "Labeled".to_string(),
            }
        );
    }

    #[test]
    fn test_construct_and_destroy() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        let obj = widget.construct(&[]).unwrap();
        assert!(!obj.is_nothing());
        assert!(obj.is_owned());
        assert_eq!(
            widget.property("width").unwrap().get(&obj).unwrap(),
            Value::Int(0)
        );
        widget.destroy(&obj).unwrap();
    }

    #[test]
    fn test_construct_mismatch_is_nothing() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        let obj = widget.construct(&[Value::from("unexpected")]).unwrap();
        assert!(obj.is_nothing());
        // Destroying the nothing handle is a no-op.
        widget.destroy(&obj).unwrap();
    }

    #[test]
    fn test_cast_between_related_handles() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        let mut w = Widget::default();
        w.labeled.label = 3;
        let obj = ObjectHandle::of(&widget, &mut w);

        let as_labeled = obj.cast(&labeled).unwrap();
        assert_eq!(
            labeled.property("label").unwrap().get(&as_labeled).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_own_member_shadows_inherited() {
        let named = named_class();
        let shadowing = ClassBuilder::new("Badge")
            .base(&named, 0)
            .property(Property::new("name", TypeInfo::String, |_| {
                Ok(Value::from("badge"))
            }))
            .build()
            .unwrap();

        assert_eq!(shadowing.property_count(), 1);
        let mut n = Named::default();
        let obj = ObjectHandle::of(&shadowing, &mut n);
        assert_eq!(
            shadowing.property("name").unwrap().get(&obj).unwrap(),
            Value::from("badge")
        );
    }

    #[test]
    fn test_duplicate_own_member_is_rejected() {
        let result = ClassBuilder::new("Broken")
            .property(Property::new("x", TypeInfo::Int, |_| Ok(Value::Int(0))))
            .property(Property::new("x", TypeInfo::Int, |_| Ok(Value::Int(1))))
            .build();
        assert_eq!(
            result.unwrap_err(),
            Error::DuplicateMember {
                class: "Broken".to_string(),
                name: "x".to_string(),
            }
        );
    }

    #[test]
    fn test_visit_order() {
        let named = named_class();
        let labeled = labeled_class();
        let widget = widget_class(&named, &labeled);

        struct Collector {
            names: Vec<String>,
        }

        impl ClassVisitor for Collector {
            fn visit_property(&mut self, property: &Property) {
                self.names.push(property.name().to_string());
            }
        }

        let mut collector = Collector { names: Vec::new() };
        widget.visit(&mut collector);
        assert_eq!(collector.names, vec!["name", "label", "width"]);
    }

    #[test]
    fn test_class_equality_by_name() {
        let a = ClassBuilder::new("Same").build().unwrap();
        let b = ClassBuilder::new("Same").build().unwrap();
        let c = ClassBuilder::new("Other").build().unwrap();
        assert_eq!(*a, *b);
        assert_ne!(*a, *c);
    }
}
