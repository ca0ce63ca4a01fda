use core::{convert::Infallible, ptr::NonNull};

use elain::{Align, Alignment};

use crate::{
    interface::Interface,
    storage::{
        Admits, ConsumableStorage, DEFAULT_INLINE_ALIGN, DEFAULT_INLINE_SIZE, ExclusiveStorage,
        ManagedInterface, Merged, MovableStorage, Operation, OwningStorage, Storage,
        StorageCategory, buffer::Buffer, creation_is_inline, managed_destroy, managed_move,
        managed_release,
    },
    util::Erased,
    vtable::VTable,
};

/// A fixed buffer of `SIZE` bytes aligned to `ALIGN`, holding the object in
/// place.
///
/// Only types that fit can be stored. Storing a larger or more strictly
/// aligned type fails to compile.
#[repr(transparent)]
pub struct InlineStorage<
    const SIZE: usize = DEFAULT_INLINE_SIZE,
    const ALIGN: usize = DEFAULT_INLINE_ALIGN,
> where
    Align<ALIGN>: Alignment,
{
    /// The object's bytes.
    buffer: Buffer<SIZE, ALIGN>,
}

impl<const SIZE: usize, const ALIGN: usize> InlineStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    /// Returns a pointer to the object's bytes, without creating a reference.
    #[inline]
    fn slot(this: NonNull<Self>) -> NonNull<u8> {
        // `repr(transparent)`: the storage is its buffer.
        Buffer::start(this.cast::<Buffer<SIZE, ALIGN>>())
    }
}

// SAFETY:
// 1. `init` writes the object at the start of the buffer, and `down_cast`
//    returns that address
// 2. `manage` drops or relocates the object in place and allocates nothing
// 3. `INLINE_SIZE` and `INLINE_ALIGN` are the buffer's size and alignment
unsafe impl<const SIZE: usize, const ALIGN: usize> Storage for InlineStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    type Interface = ManagedInterface<Self>;
    type Error = Infallible;

    const CATEGORY: StorageCategory = StorageCategory::MoveOnly;
    const INLINE_SIZE: usize = SIZE;
    const INLINE_ALIGN: usize = ALIGN;
    const FALLIBLE: bool = false;

    #[inline]
    unsafe fn down_cast<T: 'static>(this: NonNull<Self>) -> NonNull<T> {
        Self::slot(this).cast::<T>()
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
        let target = Self::slot(target.cast::<Self>()).cast::<T>();
        match operation {
            Operation::Destroy => {
                // SAFETY:
                // 1. The target holds a live `T`, as guaranteed by the caller
                unsafe {
                    target.drop_in_place();
                }
            }
            Operation::Move(source) => {
                let source = Self::slot(source.cast::<Self>()).cast::<T>();
                // SAFETY:
                // 1. The source holds a live `T` that is not used again, as
                //    guaranteed by the caller
                let object = unsafe { source.read() };
                // SAFETY:
                // 1. The target buffer is valid and aligned for `T`, and holds
                //    nothing, as guaranteed by the caller
                unsafe {
                    target.write(object);
                }
            }
            // Nothing to free: the bytes belong to the storage.
            Operation::Release => {}
            Operation::Clone(_) => unreachable!("inline storage is not copyable"),
        }
    }
}

impl<const SIZE: usize, const ALIGN: usize> OwningStorage for InlineStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    #[inline]
    fn new() -> Self {
        Self {
            buffer: Buffer::new(),
        }
    }
}

// SAFETY:
// 1. The object is written where `down_cast` looks for it
unsafe impl<T: 'static, const SIZE: usize, const ALIGN: usize> Admits<T> for InlineStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    #[inline]
    fn init<F: FnOnce() -> T>(&mut self, f: F) -> Result<(), Infallible> {
        const {
            assert!(
                creation_is_inline::<Self, T>(),
                "the type does not fit in this inline storage"
            );
        }
        let slot = Self::slot(NonNull::from(self)).cast::<T>();
        // SAFETY:
        // 1. The const assertion above guarantees the buffer is large enough
        //    and aligned for `T`
        unsafe {
            slot.write(f());
        }
        Ok(())
    }
}

impl<const SIZE: usize, const ALIGN: usize> ExclusiveStorage for InlineStorage<SIZE, ALIGN> where
    Align<ALIGN>: Alignment
{
}

impl<const SIZE: usize, const ALIGN: usize> MovableStorage for InlineStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
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

impl<const SIZE: usize, const ALIGN: usize> ConsumableStorage for InlineStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    #[inline]
    unsafe fn release<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, this: &mut Self) {
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. Guaranteed by the caller
        unsafe {
            managed_release::<Self, I, V>(vtable, this);
        }
    }
}
