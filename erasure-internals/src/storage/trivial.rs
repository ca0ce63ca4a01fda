use core::{convert::Infallible, ptr::NonNull};

use elain::{Align, Alignment};

use crate::{
    interface::{Interface, Nil},
    storage::{
        Admits, ConsumableStorage, CopyableStorage, DEFAULT_INLINE_ALIGN, DEFAULT_INLINE_SIZE,
        ExclusiveStorage, Merged, MovableStorage, OwningStorage, Storage, StorageCategory,
        buffer::Buffer, creation_is_inline,
    },
    vtable::VTable,
};

/// An inline buffer for `Copy` types.
///
/// Nothing held here needs dropping, so the storage adds no lifecycle method
/// to the vtable: destroying only clears the vtable, and copies and moves
/// duplicate the bytes.
#[repr(transparent)]
pub struct TrivialStorage<
    const SIZE: usize = DEFAULT_INLINE_SIZE,
    const ALIGN: usize = DEFAULT_INLINE_ALIGN,
> where
    Align<ALIGN>: Alignment,
{
    /// The object's bytes.
    buffer: Buffer<SIZE, ALIGN>,
}

// SAFETY:
// 1. `init` writes the object at the start of the buffer, and `down_cast`
//    returns that address
// 2. No operation is ever requested, since the interface has no manage method
// 3. `INLINE_SIZE` and `INLINE_ALIGN` are the buffer's size and alignment
unsafe impl<const SIZE: usize, const ALIGN: usize> Storage for TrivialStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    type Interface = Nil;
    type Error = Infallible;

    const CATEGORY: StorageCategory = StorageCategory::Trivial;
    const INLINE_SIZE: usize = SIZE;
    const INLINE_ALIGN: usize = ALIGN;
    const FALLIBLE: bool = false;

    #[inline]
    unsafe fn down_cast<T: 'static>(this: NonNull<Self>) -> NonNull<T> {
        Buffer::start(this.cast::<Buffer<SIZE, ALIGN>>()).cast::<T>()
    }

    #[inline]
    unsafe fn destroy<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, _this: &mut Self) {
        vtable.reset();
    }
}

impl<const SIZE: usize, const ALIGN: usize> OwningStorage for TrivialStorage<SIZE, ALIGN>
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
unsafe impl<T, const SIZE: usize, const ALIGN: usize> Admits<T> for TrivialStorage<SIZE, ALIGN>
where
    T: Copy + 'static,
    Align<ALIGN>: Alignment,
{
    #[inline]
    fn init<F: FnOnce() -> T>(&mut self, f: F) -> Result<(), Infallible> {
        const {
            assert!(
                creation_is_inline::<Self, T>(),
                "the type does not fit in this trivial storage"
            );
        }
        let slot = Buffer::start(NonNull::from(&mut self.buffer)).cast::<T>();
        // SAFETY:
        // 1. The const assertion above guarantees the buffer is large enough
        //    and aligned for `T`
        unsafe {
            slot.write(f());
        }
        Ok(())
    }
}

impl<const SIZE: usize, const ALIGN: usize> ExclusiveStorage for TrivialStorage<SIZE, ALIGN> where
    Align<ALIGN>: Alignment
{
}

impl<const SIZE: usize, const ALIGN: usize> MovableStorage for TrivialStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    #[inline]
    unsafe fn move_construct<I: Interface, V: VTable<Merged<I, Self>>>(
        source_vtable: &mut V,
        dest: &mut Self,
        source: &mut Self,
    ) {
        dest.buffer = source.buffer.duplicate();
        source_vtable.reset();
    }
}

impl<const SIZE: usize, const ALIGN: usize> ConsumableStorage for TrivialStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    #[inline]
    unsafe fn release<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, _this: &mut Self) {
        vtable.reset();
    }
}

impl<const SIZE: usize, const ALIGN: usize> CopyableStorage for TrivialStorage<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    #[inline]
    unsafe fn copy_construct<I: Interface, V: VTable<Merged<I, Self>>>(
        _vtable: &V,
        source: &Self,
    ) -> Self {
        Self {
            buffer: source.buffer.duplicate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vtable::InlineTable;

    type Small = TrivialStorage<8, 8>;

    #[test]
    fn test_no_lifecycle_method() {
        assert_eq!(size_of::<InlineTable<Merged<Nil, Small>>>(), 1);
        assert_eq!(size_of::<Small>(), 8);
    }

    #[test]
    fn test_copy_duplicates_bytes() {
        let source = Small::create(|| (3u16, 4u16)).unwrap_or_else(|e| match e {});
        let vtable = InlineTable::<Merged<Nil, Small>>::create_for::<Small, (u16, u16)>();
        // SAFETY: the vtable describes the storage
        let copy = unsafe { Small::copy_construct::<Nil, _>(&vtable, &source) };
        // SAFETY: the copy holds a `(u16, u16)`
        let value = unsafe { Small::down_cast::<(u16, u16)>(NonNull::from(&copy)) };
        // SAFETY: `(u16, u16)` is `Copy`
        assert_eq!(unsafe { value.read() }, (3, 4));
    }
}
