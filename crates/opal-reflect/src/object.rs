//! Type-erased object handles
//!
//! An [`ObjectHandle`] identifies one live instance of a registered class:
//! the metaclass, the instance address, and whether the handle owns the
//! allocation (created by [`Class::construct`](crate::Class::construct)) or
//! merely borrows it. Handles are freely copyable; destroying through
//! [`Class::destroy`](crate::Class::destroy) and then using any copy is
//! undefined behavior by documented caller discipline.
//!
//! [`InstanceRef`]/[`InstanceMut`] are what accessor closures receive: the
//! instance address already adjusted to the declaring class layout. Their
//! `downcast` methods are the single unsafe boundary between the erased
//! core and concrete bindings.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::Arc;

use crate::class::Class;
use crate::error::{Error, Result};

/// Shared read access to an instance, adjusted to the declaring class
#[derive(Clone, Copy)]
pub struct InstanceRef<'a> {
    ptr: NonNull<u8>,
    marker: PhantomData<&'a u8>,
}

impl<'a> InstanceRef<'a> {
    pub(crate) fn new(ptr: NonNull<u8>) -> Self {
        Self {
            ptr,
            marker: PhantomData,
        }
    }

    /// Reinterpret the instance as `&T`
    ///
    /// # Safety
    ///
    /// `T` must be the concrete type the declaring class was registered
    /// for, and the instance must still be alive.
    pub unsafe fn downcast_ref<T>(self) -> &'a T {
        unsafe { &*self.ptr.cast::<T>().as_ptr() }
    }
}

/// Exclusive access to an instance, adjusted to the declaring class
pub struct InstanceMut<'a> {
    ptr: NonNull<u8>,
    marker: PhantomData<&'a mut u8>,
}

impl<'a> InstanceMut<'a> {
    pub(crate) fn new(ptr: NonNull<u8>) -> Self {
        Self {
            ptr,
            marker: PhantomData,
        }
    }

    /// Reinterpret the instance as `&mut T`
    ///
    /// # Safety
    ///
    /// Same contract as [`InstanceRef::downcast_ref`], plus exclusivity:
    /// no other reference to the instance may be live.
    pub unsafe fn downcast_mut<T>(self) -> &'a mut T {
        unsafe { &mut *self.ptr.cast::<T>().as_ptr() }
    }
}

/// Leak a boxed instance into an erased address
///
/// Used by constructor factories; the matching release path is
/// [`drop_erased`] from the class destructor.
pub fn into_erased<T>(instance: Box<T>) -> NonNull<u8> {
    NonNull::from(Box::leak(instance)).cast()
}

/// Reclaim and drop an instance previously erased with [`into_erased`]
///
/// # Safety
///
/// `ptr` must come from [`into_erased`] with the same `T`, and must not be
/// used afterwards.
pub unsafe fn drop_erased<T>(ptr: NonNull<u8>) {
    unsafe { drop(Box::from_raw(ptr.cast::<T>().as_ptr())) }
}

#[derive(Clone)]
struct HandleInner {
    class: Arc<Class>,
    data: NonNull<u8>,
    owned: bool,
}

/// Type-erased reference to an instance of a registered class
///
/// The `nothing` sentinel stands in for "no object" wherever construction
/// fails softly; it compares equal only to itself and every data access on
/// it fails with [`Error::NullObject`].
#[derive(Clone)]
pub struct ObjectHandle {
    inner: Option<HandleInner>,
}

impl ObjectHandle {
    /// The "no object" sentinel
    pub fn nothing() -> Self {
        Self { inner: None }
    }

    /// Borrow an externally-owned instance address
    pub fn borrowed(class: &Arc<Class>, data: NonNull<u8>) -> Self {
        Self {
            inner: Some(HandleInner {
                class: Arc::clone(class),
                data,
                owned: false,
            }),
        }
    }

    /// Adopt an instance allocated by a constructor factory
    pub fn owned(class: &Arc<Class>, data: NonNull<u8>) -> Self {
        Self {
            inner: Some(HandleInner {
                class: Arc::clone(class),
                data,
                owned: true,
            }),
        }
    }

    /// Borrow a concrete instance
    pub fn of<T>(class: &Arc<Class>, instance: &mut T) -> Self {
        Self::borrowed(class, NonNull::from(instance).cast())
    }

    /// True for the nothing sentinel
    pub fn is_nothing(&self) -> bool {
        self.inner.is_none()
    }

    /// True if the handle owns its allocation
    pub fn is_owned(&self) -> bool {
        self.inner.as_ref().is_some_and(|h| h.owned)
    }

    /// Metaclass of the referenced instance
    pub fn class(&self) -> Result<&Arc<Class>> {
        self.inner
            .as_ref()
            .map(|h| &h.class)
            .ok_or(Error::NullObject)
    }

    /// Instance address
    pub fn pointer(&self) -> Result<NonNull<u8>> {
        self.inner.as_ref().map(|h| h.data).ok_or(Error::NullObject)
    }

    /// Re-target the handle at a base or derived metaclass
    ///
    /// The address is adjusted through
    /// [`Class::apply_offset`](crate::Class::apply_offset); the result is a
    /// borrowed handle regardless of this handle's ownership.
    pub fn cast(&self, target: &Arc<Class>) -> Result<ObjectHandle> {
        let inner = self.inner.as_ref().ok_or(Error::NullObject)?;
        let adjusted = inner.class.apply_offset(inner.data, target)?;
        Ok(ObjectHandle::borrowed(target, adjusted))
    }
}

// Safety: a handle is an address plus descriptor references; moving or
// sharing one carries no access of its own. Dereferencing happens through
// the accessor layer, where the single-threaded-per-instance discipline
// applies.
unsafe impl Send for ObjectHandle {}
unsafe impl Sync for ObjectHandle {}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => a.class.name() == b.class.name() && a.data == b.data,
            _ => false,
        }
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            None => write!(f, "ObjectHandle::nothing"),
            Some(h) => write!(
                f,
                "ObjectHandle({} @ {:p}{})",
                h.class.name(),
                h.data.as_ptr(),
                if h.owned { ", owned" } else { "" }
            ),
        }
    }
}
