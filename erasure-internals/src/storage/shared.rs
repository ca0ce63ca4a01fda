use core::{convert::Infallible, ptr::NonNull};

use crate::{
    interface::Interface,
    storage::{
        Admits, CopyableStorage, ManagedInterface, Merged, MovableStorage, Operation,
        OwningStorage, Storage, StorageCategory, managed_destroy, managed_move, manage_fn,
        trace_heap,
    },
    util::Erased,
    vtable::VTable,
};

/// Reference-counted storage: the object always lives in a
/// [`triomphe::Arc`], and copies of the storage share it.
///
/// The object is dropped when the last storage sharing it is destroyed.
/// Because it may be shared, only `&self` methods can be called on it.
#[repr(C)]
pub struct SharedStorage {
    /// The pointer returned by [`triomphe::Arc::into_raw`], or null.
    pointer: *const u8,
}

impl SharedStorage {
    /// Returns a pointer to the `Arc` pointer of the storage at `this`.
    #[inline]
    fn pointer_slot(this: NonNull<Self>) -> NonNull<*const u8> {
        // `repr(C)` puts the pointer at offset 0.
        this.cast::<*const u8>()
    }

    /// Returns the number of storages sharing the `T` held at `this`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `this` holds a `T`.
    #[inline]
    pub unsafe fn strong_count<T: 'static>(this: &Self) -> usize {
        let ptr = this.pointer.cast::<T>();
        // SAFETY:
        // 1. The pointer came from `Arc::<T>::into_raw`, as guaranteed by the
        //    caller
        let arc_borrow = unsafe { triomphe::ArcBorrow::from_ptr(ptr) };
        triomphe::ArcBorrow::strong_count(&arc_borrow)
    }
}

// SAFETY:
// 1. `init` publishes `Arc::into_raw`, which points at the object, and
//    `down_cast` returns that pointer
// 2. `manage` adjusts the reference count exactly as each operation requires
// 3. `INLINE_SIZE` is zero and `INLINE_ALIGN` rules out every type
unsafe impl Storage for SharedStorage {
    type Interface = ManagedInterface<Self>;
    type Error = Infallible;

    const CATEGORY: StorageCategory = StorageCategory::Copyable;
    const INLINE_SIZE: usize = 0;
    const INLINE_ALIGN: usize = 0;
    const FALLIBLE: bool = false;

    #[inline]
    unsafe fn down_cast<T: 'static>(this: NonNull<Self>) -> NonNull<T> {
        // SAFETY:
        // 1. `this` points to a live storage
        let pointer = unsafe { Self::pointer_slot(this).read() };
        // SAFETY:
        // 1. The storage holds a `T`, so the pointer came from
        //    `Arc::into_raw` and is non-null
        unsafe { NonNull::new_unchecked(pointer.cast::<T>().cast_mut()) }
    }

    #[inline]
    unsafe fn destroy<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, this: &mut Self) {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe {
            managed_destroy::<Self, I, V>(vtable, this);
        }
    }

    unsafe fn manage<T: 'static>(target: NonNull<Erased>, operation: Operation) {
        let target = Self::pointer_slot(target.cast::<Self>());
        match operation {
            Operation::Destroy => {
                // SAFETY:
                // 1. The target holds a live `T`, as guaranteed by the caller
                let pointer = unsafe { target.replace(core::ptr::null()) };
                // SAFETY:
                // 1. The pointer came from `Arc::<T>::into_raw` and this
                //    storage's share is given up here
                let arc = unsafe { triomphe::Arc::from_raw(pointer.cast::<T>()) };
                core::mem::drop(arc);
            }
            Operation::Move(source) => {
                let source = Self::pointer_slot(source.cast::<Self>());
                // SAFETY:
                // 1. The source holds a live `T`, as guaranteed by the caller
                let pointer = unsafe { source.replace(core::ptr::null()) };
                // SAFETY:
                // 1. The target is a live storage that holds nothing
                unsafe {
                    target.write(pointer);
                }
            }
            Operation::Clone(source) => {
                let source = Self::pointer_slot(source.cast::<Self>());
                // SAFETY:
                // 1. The source holds a live `T`, as guaranteed by the caller
                let pointer = unsafe { source.read() };
                // SAFETY:
                // 1. The pointer came from `Arc::<T>::into_raw`, and the `Arc`
                //    is kept alive by the source
                let arc_borrow = unsafe { triomphe::ArcBorrow::from_ptr(pointer.cast::<T>()) };
                let arc = arc_borrow.clone_arc();
                // SAFETY:
                // 1. The target is a live storage that holds nothing
                unsafe {
                    target.write(triomphe::Arc::into_raw(arc).cast::<u8>());
                }
            }
            Operation::Release => unreachable!("shared storage is not consumable"),
        }
    }
}

impl OwningStorage for SharedStorage {
    #[inline]
    fn new() -> Self {
        Self {
            pointer: core::ptr::null(),
        }
    }
}

// SAFETY:
// 1. The pointer to the new `Arc`'s object is what `down_cast` returns
unsafe impl<T: 'static> Admits<T> for SharedStorage {
    #[inline]
    fn init<F: FnOnce() -> T>(&mut self, f: F) -> Result<(), Infallible> {
        let arc = triomphe::Arc::new(f());
        trace_heap::<T>("share");
        self.pointer = triomphe::Arc::into_raw(arc).cast::<u8>();
        Ok(())
    }
}

impl MovableStorage for SharedStorage {
    #[inline]
    unsafe fn move_construct<I: Interface, V: VTable<Merged<I, Self>>>(
        source_vtable: &mut V,
        dest: &mut Self,
        source: &mut Self,
    ) {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe {
            managed_move::<Self, I, V>(source_vtable, dest, source);
        }
    }
}

impl CopyableStorage for SharedStorage {
    #[inline]
    unsafe fn copy_construct<I: Interface, V: VTable<Merged<I, Self>>>(
        vtable: &V,
        source: &Self,
    ) -> Self {
        let mut copy = Self::new();
        if let Some(manage) = manage_fn::<Self, I, V>(vtable) {
            let source = NonNull::from(source).cast::<Erased>();
            // SAFETY:
            // 1. `copy` is a live storage
            // 2. `source` holds the matching `T` and `copy` holds nothing, as
            //    guaranteed by the caller
            unsafe {
                manage(NonNull::from(&mut copy).cast::<Erased>(), Operation::Clone(source));
            }
        }
        copy
    }
}
