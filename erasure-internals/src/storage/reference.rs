use core::{convert::Infallible, marker::PhantomData, ptr::NonNull};

use crate::{
    interface::{Interface, Nil},
    storage::{CopyableStorage, ExclusiveStorage, Merged, Storage, StorageCategory},
    util::Erased,
    vtable::VTable,
};

/// A non-owning handle to a borrowed `&'a T`.
///
/// The handle is never empty and never destroys its referent. It can be
/// copied freely, like the reference it stands for.
#[derive(Debug, Clone, Copy)]
pub struct RefStorage<'a> {
    /// The referent.
    object: NonNull<Erased>,
    /// Ties the handle to the borrow.
    _borrow: PhantomData<&'a ()>,
}

impl<'a> RefStorage<'a> {
    /// Returns a handle to `object`.
    #[inline]
    pub fn new<T: 'static>(object: &'a T) -> Self {
        Self {
            object: NonNull::from(object).cast::<Erased>(),
            _borrow: PhantomData,
        }
    }

    /// Points the handle at `object`. The caller rebinds the vtable.
    #[inline]
    pub fn rebind<T: 'static>(&mut self, object: &'a T) {
        *self = Self::new(object);
    }
}

/// A non-owning handle to a borrowed `&'a mut T`.
///
/// Like the reference it stands for, the handle is exclusive: `&mut self`
/// methods can be called through it, and it cannot be copied.
#[derive(Debug)]
pub struct MutRefStorage<'a> {
    /// The referent.
    object: NonNull<Erased>,
    /// Ties the handle to the exclusive borrow.
    _borrow: PhantomData<&'a mut ()>,
}

impl<'a> MutRefStorage<'a> {
    /// Returns a handle to `object`.
    #[inline]
    pub fn new<T: 'static>(object: &'a mut T) -> Self {
        Self {
            object: NonNull::from(object).cast::<Erased>(),
            _borrow: PhantomData,
        }
    }

    /// Points the handle at `object`. The caller rebinds the vtable.
    #[inline]
    pub fn rebind<T: 'static>(&mut self, object: &'a mut T) {
        *self = Self::new(object);
    }
}

// SAFETY:
// 1. `down_cast` returns the referent the handle was created with
// 2. No operation is ever requested, since the interface has no manage method
// 3. Nothing is stored inline, and no creation path consults the constants
unsafe impl Storage for RefStorage<'_> {
    type Interface = Nil;
    type Error = Infallible;

    const CATEGORY: StorageCategory = StorageCategory::Reference;
    const INLINE_SIZE: usize = usize::MAX;
    const INLINE_ALIGN: usize = usize::MAX;
    const FALLIBLE: bool = false;

    #[inline]
    unsafe fn down_cast<T: 'static>(this: NonNull<Self>) -> NonNull<T> {
        // SAFETY:
        // 1. `this` points to a live handle, as guaranteed by the caller
        let this = unsafe { this.as_ref() };
        this.object.cast::<T>()
    }

    #[inline]
    unsafe fn destroy<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, _this: &mut Self) {
        vtable.reset();
    }
}

// SAFETY:
// 1. `down_cast` returns the referent the handle was created with
// 2. No operation is ever requested, since the interface has no manage method
// 3. Nothing is stored inline, and no creation path consults the constants
unsafe impl Storage for MutRefStorage<'_> {
    type Interface = Nil;
    type Error = Infallible;

    const CATEGORY: StorageCategory = StorageCategory::Reference;
    const INLINE_SIZE: usize = usize::MAX;
    const INLINE_ALIGN: usize = usize::MAX;
    const FALLIBLE: bool = false;

    #[inline]
    unsafe fn down_cast<T: 'static>(this: NonNull<Self>) -> NonNull<T> {
        // SAFETY:
        // 1. `this` points to a live handle, as guaranteed by the caller
        let this = unsafe { this.as_ref() };
        this.object.cast::<T>()
    }

    #[inline]
    unsafe fn destroy<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, _this: &mut Self) {
        vtable.reset();
    }
}

impl CopyableStorage for RefStorage<'_> {
    #[inline]
    unsafe fn copy_construct<I: Interface, V: VTable<Merged<I, Self>>>(
        _vtable: &V,
        source: &Self,
    ) -> Self {
        *source
    }
}

impl ExclusiveStorage for MutRefStorage<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_point_at_the_referent() {
        let value = 5u32;
        let handle = RefStorage::new(&value);
        // SAFETY: the handle refers to a `u32`
        let object = unsafe { RefStorage::down_cast::<u32>(NonNull::from(&handle)) };
        assert_eq!(object.as_ptr().cast_const(), &raw const value);

        let mut other = 6u32;
        let handle = MutRefStorage::new(&mut other);
        // SAFETY: the handle refers to a `u32`
        let mut object = unsafe { MutRefStorage::down_cast::<u32>(NonNull::from(&handle)) };
        // SAFETY: the handle holds the only borrow of `other`
        unsafe { *object.as_mut() += 1 };
        assert_eq!(other, 7);
    }

    #[test]
    fn test_layout() {
        assert_eq!(size_of::<RefStorage<'_>>(), size_of::<usize>());
        assert_eq!(size_of::<Option<MutRefStorage<'_>>>(), size_of::<usize>());
        static_assertions::assert_not_impl_any!(RefStorage<'static>: Send, Sync);
        static_assertions::assert_not_impl_any!(MutRefStorage<'static>: Send, Sync, Clone);
    }
}
