//! The allocator capability used by out-of-line storage.
//!
//! Storage strategies never talk to the heap directly. They hold an
//! [`Allocator`] by value and go through [`allocate_one`] and
//! [`deallocate_one`], which handle layouts and zero-sized types in one
//! place.
//!
//! Whether an allocator can fail is a compile-time property
//! ([`Allocator::FALLIBLE`]). Storage uses it to decide whether creating a
//! given type has a failure channel at all; an infallible allocator uses
//! [`Infallible`] as its error type and never returns an error.

use core::{alloc::Layout, convert::Infallible, fmt, ptr::NonNull};

/// The error returned by a fallible allocator that could not satisfy a
/// request.
///
/// It carries no further detail: the only thing the engine reports about a
/// failed creation is that memory ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AllocError;

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")
    }
}

impl core::error::Error for AllocError {}

/// A source of raw memory blocks.
///
/// Allocators are embedded by value in the storage that uses them and are
/// created with [`Default`] when the storage is created, so stateless
/// allocators cost nothing. A block allocated by one instance may be freed by
/// another instance of the same type, because ownership of a heap object moves
/// together with the pointer when an `Any` is moved.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// 1. A block returned by [`allocate`](Self::allocate) is valid for reads and
///    writes of `layout.size()` bytes and aligned to `layout.align()`.
/// 2. The block stays valid until it is passed to
///    [`deallocate`](Self::deallocate) on any instance of the same type.
/// 3. If [`FALLIBLE`](Self::FALLIBLE) is `false`, `allocate` never returns an
///    error.
pub unsafe trait Allocator: Default + 'static {
    /// The error reported when an allocation fails.
    type Error;

    /// Whether [`allocate`](Self::allocate) can return an error.
    const FALLIBLE: bool;

    /// Allocates a block for `layout`.
    ///
    /// `layout` never has a size of zero when called through
    /// [`allocate_one`].
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, Self::Error>;

    /// Frees a block previously returned by [`allocate`](Self::allocate).
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `ptr` was returned by `allocate` on an instance of this type, called
    ///    with this same `layout`.
    /// 2. The block has not been freed already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Allocates uninitialized memory for a single `T`.
///
/// Zero-sized types never reach the allocator; they get a dangling, well
/// aligned pointer instead.
#[inline]
pub fn allocate_one<T, A: Allocator>(allocator: &A) -> Result<NonNull<T>, A::Error> {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return Ok(NonNull::dangling());
    }
    let ptr = allocator.allocate(layout)?;
    Ok(ptr.cast::<T>())
}

/// Frees memory obtained from [`allocate_one`] without dropping its contents.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `ptr` was returned by `allocate_one::<T, A>` on an instance of `A`.
/// 2. The memory has not been freed already.
#[inline]
pub unsafe fn deallocate_one<T, A: Allocator>(allocator: &A, ptr: NonNull<T>) {
    let layout = Layout::new::<T>();
    if layout.size() == 0 {
        return;
    }
    // SAFETY:
    // 1. Guaranteed by the caller, and `allocate_one` used this same layout
    // 2. Guaranteed by the caller
    unsafe {
        allocator.deallocate(ptr.cast::<u8>(), layout);
    }
}

/// The global heap, treating exhaustion as fatal.
///
/// A failed allocation calls [`handle_alloc_error`], so creation through this
/// allocator has no failure channel.
///
/// [`handle_alloc_error`]: alloc::alloc::handle_alloc_error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Global;

// SAFETY:
// 1. Blocks come straight from the global allocator with the requested layout
// 2. They are only released by `deallocate`, which is the global allocator
// 3. A null result diverges through `handle_alloc_error`
unsafe impl Allocator for Global {
    type Error = Infallible;

    const FALLIBLE: bool = false;

    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, Infallible> {
        // SAFETY:
        // 1. `allocate_one` never forwards zero-sized layouts
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        match NonNull::new(ptr) {
            Some(ptr) => Ok(ptr),
            None => alloc::alloc::handle_alloc_error(layout),
        }
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY:
        // 1. The block was allocated by the global allocator with `layout`, as
        //    guaranteed by the caller
        unsafe {
            alloc::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

/// The global heap, reporting exhaustion as [`AllocError`].
///
/// Storage that uses this allocator makes creation of out-of-line types
/// fallible; those types must then be created through the `Result`-returning
/// entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FallibleGlobal;

// SAFETY:
// 1. Blocks come straight from the global allocator with the requested layout
// 2. They are only released by `deallocate`, which is the global allocator
// 3. `FALLIBLE` is `true`, so returning errors is permitted
unsafe impl Allocator for FallibleGlobal {
    type Error = AllocError;

    const FALLIBLE: bool = true;

    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        // SAFETY:
        // 1. `allocate_one` never forwards zero-sized layouts
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY:
        // 1. The block was allocated by the global allocator with `layout`, as
        //    guaranteed by the caller
        unsafe {
            alloc::alloc::dealloc(ptr.as_ptr(), layout);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[repr(align(64))]
    struct OverAligned;

    #[test]
    fn test_allocate_one_round_trip() {
        let ptr = allocate_one::<u64, _>(&Global).unwrap_or_else(|e| match e {});
        assert_eq!(ptr.as_ptr() as usize % align_of::<u64>(), 0);
        // SAFETY: freshly allocated, properly aligned and sized for `u64`
        unsafe { ptr.write(0xdead_beef) };
        // SAFETY: initialized just above
        assert_eq!(unsafe { ptr.read() }, 0xdead_beef);
        // SAFETY: allocated above by the same allocator type
        unsafe { deallocate_one(&Global, ptr) };
    }

    #[test]
    fn test_zero_sized_types_skip_the_allocator() {
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

        let ptr = allocate_one::<OverAligned, _>(&Refusing).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 64, 0);
        // SAFETY: obtained from `allocate_one` for the same type
        unsafe { deallocate_one(&Refusing, ptr) };

        assert_eq!(allocate_one::<u8, _>(&Refusing), Err(AllocError));
    }

    #[test]
    fn test_fallible_global_allocates() {
        let ptr = allocate_one::<[u32; 4], _>(&FallibleGlobal).unwrap();
        // SAFETY: allocated above by the same allocator type
        unsafe { deallocate_one(&FallibleGlobal, ptr) };
    }

    #[test]
    fn test_alloc_error_display() {
        assert_eq!(AllocError.to_string(), "memory allocation failed");
        assert!(!Global::FALLIBLE);
        assert!(FallibleGlobal::FALLIBLE);
    }
}
