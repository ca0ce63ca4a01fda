use core::{marker::PhantomData, mem::ManuallyDrop, ptr::NonNull};

use elain::{Align, Alignment};

use crate::{
    allocator::{Allocator, Global, allocate_one, deallocate_one},
    interface::Interface,
    storage::{
        Admits, ConsumableStorage, DEFAULT_INLINE_ALIGN, DEFAULT_INLINE_SIZE, ExclusiveStorage,
        HybridCategory, ManagedInterface, Merged, MoveOnly, MovableStorage, Operation,
        OwningStorage, Storage, StorageCategory, buffer::Buffer, creation_is_inline,
        managed_destroy, managed_move, managed_release, trace_heap,
    },
    util::Erased,
    vtable::VTable,
};

/// Either the inline bytes or the pointer to an out-of-line object.
///
/// There is no discriminant: which field is active follows from the held
/// type through [`creation_is_inline`].
#[repr(C)]
union Slot<const SIZE: usize, const ALIGN: usize>
where
    Align<ALIGN>: Alignment,
{
    /// Active for types that do not fit.
    pointer: *mut u8,
    /// Active for types that fit.
    buffer: ManuallyDrop<Buffer<SIZE, ALIGN>>,
}

/// Small-buffer storage: objects that fit in `SIZE` bytes aligned to `ALIGN`
/// are held in place, larger ones get exactly one allocation from `A`.
///
/// `C` is the category marker, [`MoveOnly`] or
/// [`Immovable`](crate::storage::Immovable). Creation can only fail when the
/// object goes out of line and `A` is fallible.
#[repr(C)]
pub struct HybridStorage<
    C = MoveOnly,
    const SIZE: usize = DEFAULT_INLINE_SIZE,
    const ALIGN: usize = DEFAULT_INLINE_ALIGN,
    A = Global,
> where
    Align<ALIGN>: Alignment,
{
    /// Comes first, so the storage's address is the slot's address.
    slot: Slot<SIZE, ALIGN>,
    /// Frees the out-of-line object. Blocks from one instance are freed by
    /// another after a move, so instances must be interchangeable.
    allocator: A,
    /// The category marker.
    _category: PhantomData<fn() -> C>,
}

impl<C, const SIZE: usize, const ALIGN: usize, A> HybridStorage<C, SIZE, ALIGN, A>
where
    C: HybridCategory,
    A: Allocator,
    Align<ALIGN>: Alignment,
{
    /// Returns a pointer to the heap pointer of the storage at `this`.
    #[inline]
    fn pointer_slot(this: NonNull<Self>) -> NonNull<*mut u8> {
        // `repr(C)` on both the storage and the union puts the pointer at
        // offset 0.
        this.cast::<*mut u8>()
    }

    /// Frees the out-of-line block of a `T`, without dropping it.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The storage at `this` owns an out-of-line block for a `T`.
    /// 2. The block is not used afterwards.
    #[inline]
    unsafe fn free<T: 'static>(this: NonNull<Self>) {
        // SAFETY:
        // 1. Guaranteed by the caller
        let object = unsafe { Self::down_cast::<T>(this) };
        trace_heap::<T>("deallocate");
        // SAFETY:
        // 1. `this` points to a live storage
        let allocator = unsafe { &this.as_ref().allocator };
        // SAFETY:
        // 1. The block came from `allocate_one::<T, A>` in `init`, possibly on
        //    another instance of `A`
        // 2. Guaranteed by the caller
        unsafe {
            deallocate_one::<T, A>(allocator, object);
        }
    }
}

// SAFETY:
// 1. `init`, `down_cast` and `manage` choose the same slot field through
//    `creation_is_inline`, and the out-of-line pointer is non-null
// 2. `manage` drops, relocates and frees exactly as each operation requires
// 3. `INLINE_SIZE` and `INLINE_ALIGN` are the buffer's size and alignment
unsafe impl<C, const SIZE: usize, const ALIGN: usize, A> Storage
    for HybridStorage<C, SIZE, ALIGN, A>
where
    C: HybridCategory,
    A: Allocator,
    Align<ALIGN>: Alignment,
{
    type Interface = ManagedInterface<Self>;
    type Error = A::Error;

    const CATEGORY: StorageCategory = C::CATEGORY;
    const INLINE_SIZE: usize = SIZE;
    const INLINE_ALIGN: usize = ALIGN;
    const FALLIBLE: bool = A::FALLIBLE;

    #[inline]
    unsafe fn down_cast<T: 'static>(this: NonNull<Self>) -> NonNull<T> {
        if creation_is_inline::<Self, T>() {
            this.cast::<T>()
        } else {
            // SAFETY:
            // 1. A `T` that does not fit is held out of line, so the pointer
            //    field is active
            let pointer = unsafe { Self::pointer_slot(this).read() };
            // SAFETY:
            // 1. `init` only stores pointers returned by `allocate_one`
            unsafe { NonNull::new_unchecked(pointer.cast::<T>()) }
        }
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
        let target = target.cast::<Self>();
        let inline = creation_is_inline::<Self, T>();
        match operation {
            Operation::Destroy => {
                // SAFETY:
                // 1. The target holds a live `T`, as guaranteed by the caller
                let object = unsafe { Self::down_cast::<T>(target) };
                // SAFETY:
                // 1. The object is live and dropped exactly once
                unsafe {
                    object.drop_in_place();
                }
                if !inline {
                    // SAFETY:
                    // 1. The target owns the out-of-line block of the object
                    // 2. The object was dropped just above
                    unsafe {
                        Self::free::<T>(target);
                    }
                }
            }
            Operation::Move(source) => {
                debug_assert_ne!(
                    C::CATEGORY,
                    StorageCategory::Immovable,
                    "immovable storage asked to relocate its object"
                );
                let source = source.cast::<Self>();
                if inline {
                    // SAFETY:
                    // 1. The source holds a live `T`, as guaranteed by the
                    //    caller
                    let object = unsafe { Self::down_cast::<T>(source) };
                    // SAFETY:
                    // 1. The object is live and is not used again through the
                    //    source
                    let object = unsafe { object.read() };
                    // SAFETY:
                    // 1. The target slot is valid and aligned for an inline
                    //    `T`, and holds nothing
                    unsafe {
                        target.cast::<T>().write(object);
                    }
                } else {
                    // SAFETY:
                    // 1. The source holds an out-of-line `T`, so its pointer
                    //    field is active
                    let pointer =
                        unsafe { Self::pointer_slot(source).replace(core::ptr::null_mut()) };
                    // SAFETY:
                    // 1. The target is a live storage that holds nothing
                    unsafe {
                        Self::pointer_slot(target).write(pointer);
                    }
                }
            }
            Operation::Release => {
                if !inline {
                    // SAFETY:
                    // 1. The target owns the out-of-line block of the object
                    // 2. The object was moved out, as guaranteed by the caller
                    unsafe {
                        Self::free::<T>(target);
                    }
                }
            }
            Operation::Clone(_) => unreachable!("hybrid storage is not copyable"),
        }
    }
}

impl<C, const SIZE: usize, const ALIGN: usize, A> OwningStorage for HybridStorage<C, SIZE, ALIGN, A>
where
    C: HybridCategory,
    A: Allocator,
    Align<ALIGN>: Alignment,
{
    #[inline]
    fn new() -> Self {
        Self {
            slot: Slot {
                buffer: ManuallyDrop::new(Buffer::new()),
            },
            allocator: A::default(),
            _category: PhantomData,
        }
    }
}

// SAFETY:
// 1. Inline objects are written at the storage's address and out-of-line ones
//    are published through the pointer field, matching `down_cast`
unsafe impl<T, C, const SIZE: usize, const ALIGN: usize, A> Admits<T>
    for HybridStorage<C, SIZE, ALIGN, A>
where
    T: 'static,
    C: HybridCategory,
    A: Allocator,
    Align<ALIGN>: Alignment,
{
    fn init<F: FnOnce() -> T>(&mut self, f: F) -> Result<(), A::Error> {
        if creation_is_inline::<Self, T>() {
            let slot = NonNull::from(self).cast::<T>();
            // SAFETY:
            // 1. `T` fits the buffer in size and alignment
            unsafe {
                slot.write(f());
            }
        } else {
            let pointer = allocate_one::<T, A>(&self.allocator)?;
            trace_heap::<T>("allocate");
            // SAFETY:
            // 1. The block is fresh, sized and aligned for `T`
            unsafe {
                pointer.write(f());
            }
            self.slot.pointer = pointer.as_ptr().cast::<u8>();
        }
        Ok(())
    }
}

impl<C, const SIZE: usize, const ALIGN: usize, A> ExclusiveStorage
    for HybridStorage<C, SIZE, ALIGN, A>
where
    C: HybridCategory,
    A: Allocator,
    Align<ALIGN>: Alignment,
{
}

impl<const SIZE: usize, const ALIGN: usize, A> MovableStorage
    for HybridStorage<MoveOnly, SIZE, ALIGN, A>
where
    A: Allocator,
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

impl<const SIZE: usize, const ALIGN: usize, A> ConsumableStorage
    for HybridStorage<MoveOnly, SIZE, ALIGN, A>
where
    A: Allocator,
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

#[cfg(test)]
mod tests {
    use alloc::{rc::Rc, string::String};
    use core::{alloc::Layout, cell::Cell};

    use super::*;
    use crate::{
        allocator::{AllocError, FallibleGlobal},
        interface::Nil,
        storage::Immovable,
        vtable::StaticTable,
    };

    type Small = HybridStorage<MoveOnly, 16, 8>;
    type Table = StaticTable<Merged<Nil, Small>>;

    #[derive(Default)]
    struct Refusing;

    // SAFETY: never hands out memory
    unsafe impl Allocator for Refusing {
        type Error = AllocError;
        const FALLIBLE: bool = true;

        fn allocate(&self, _layout: Layout) -> Result<NonNull<u8>, AllocError> {
            Err(AllocError)
        }

        unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
            unreachable!("nothing was allocated");
        }
    }

    struct Probe(Rc<Cell<usize>>, [u64; 4]);

    impl Drop for Probe {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    fn address<S, T: 'static>(storage: &S) -> usize
    where
        S: Storage,
    {
        // SAFETY: only called on storages holding a `T`
        unsafe { S::down_cast::<T>(NonNull::from(storage)).as_ptr() as usize }
    }

    #[test]
    fn test_layout() {
        assert_eq!(size_of::<Small>(), 16);
        assert_eq!(size_of::<HybridStorage<MoveOnly, 0, 1>>(), size_of::<usize>());
        assert_eq!(size_of::<HybridStorage>(), DEFAULT_INLINE_SIZE);
        static_assertions::assert_not_impl_any!(HybridStorage: Send, Sync);
        static_assertions::assert_impl_all!(Small: MovableStorage, ConsumableStorage);
        static_assertions::assert_not_impl_any!(
            HybridStorage<Immovable>: MovableStorage,
            ConsumableStorage
        );
    }

    #[test]
    fn test_placement() {
        let small = Small::create(|| 7u64).unwrap_or_else(|e| match e {});
        assert_eq!(address::<_, u64>(&small), (&raw const small) as usize);
        // SAFETY: holds a `u64`
        let value = unsafe { Small::down_cast::<u64>(NonNull::from(&small)) };
        // SAFETY: a `u64` is `Copy`
        assert_eq!(unsafe { value.read() }, 7);

        let mut big = Small::create(|| String::from("out of line")).unwrap_or_else(|e| match e {});
        assert_ne!(address::<_, String>(&big), (&raw const big) as usize);

        let mut vtable = Table::create_for::<Small, String>();
        // SAFETY: the vtable describes the storage
        unsafe { Small::destroy::<Nil, _>(&mut vtable, &mut big) };
        assert!(vtable.is_empty());
    }

    #[test]
    fn test_failed_allocation_never_runs_the_constructor() {
        type Failing = HybridStorage<MoveOnly, 8, 8, Refusing>;

        let ran = Cell::new(false);
        let result = Failing::create(|| {
            ran.set(true);
            [0u8; 32]
        });
        assert_eq!(result.err(), Some(AllocError));
        assert!(!ran.get());

        // Inline objects never reach the allocator.
        assert!(Failing::create(|| 1u32).is_ok());
    }

    #[test]
    fn test_move_transfers_the_heap_block() {
        let drops = Rc::new(Cell::new(0));
        let mut source = Small::create({
            let drops = drops.clone();
            || Probe(drops, [0; 4])
        })
        .unwrap_or_else(|e| match e {});
        let before = address::<_, Probe>(&source);
        let mut source_vtable = Table::create_for::<Small, Probe>();
        let mut dest = Small::new();
        let mut dest_vtable = source_vtable;

        // SAFETY: the source vtable describes the source, the destination is
        // empty
        unsafe { Small::move_construct::<Nil, _>(&mut source_vtable, &mut dest, &mut source) };
        assert!(source_vtable.is_empty());
        assert_eq!(address::<_, Probe>(&dest), before);
        assert_eq!(drops.get(), 0);

        // SAFETY: the destination holds the probe
        unsafe { Small::destroy::<Nil, _>(&mut dest_vtable, &mut dest) };
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_release_frees_without_dropping() {
        type Fallible = HybridStorage<MoveOnly, 16, 8, FallibleGlobal>;

        let drops = Rc::new(Cell::new(0));
        let mut storage = Fallible::create({
            let drops = drops.clone();
            || Probe(drops, [0; 4])
        })
        .unwrap();
        let mut vtable = StaticTable::<Merged<Nil, Fallible>>::create_for::<Fallible, Probe>();

        // SAFETY: the storage holds a probe
        let probe = unsafe { Fallible::down_cast::<Probe>(NonNull::from(&storage)) };
        // SAFETY: moved out once, the storage is released right after
        let probe = unsafe { probe.read() };
        // SAFETY: the probe was moved out above
        unsafe { Fallible::release::<Nil, _>(&mut vtable, &mut storage) };
        assert!(vtable.is_empty());
        assert_eq!(drops.get(), 0);
        drop(probe);
        assert_eq!(drops.get(), 1);
    }
}
