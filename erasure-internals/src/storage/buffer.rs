use core::{marker::PhantomData, mem::MaybeUninit, ptr::NonNull};

use elain::{Align, Alignment};

/// `SIZE` uninitialized bytes aligned to `ALIGN`.
///
/// The raw-pointer marker keeps every storage built on a buffer `!Send` and
/// `!Sync`, whatever it holds.
#[repr(C)]
pub(crate) struct Buffer<const SIZE: usize, const ALIGN: usize>
where
    Align<ALIGN>: Alignment,
{
    /// Raises the alignment of the struct to `ALIGN`.
    _align: [Align<ALIGN>; 0],
    /// The bytes. They come first, since `_align` is zero-sized.
    bytes: [MaybeUninit<u8>; SIZE],
    /// Opts out of `Send` and `Sync`.
    _not_send: PhantomData<*mut ()>,
}

impl<const SIZE: usize, const ALIGN: usize> Buffer<SIZE, ALIGN>
where
    Align<ALIGN>: Alignment,
{
    /// Returns an uninitialized buffer.
    #[inline]
    pub(crate) const fn new() -> Self {
        Self {
            _align: [],
            bytes: [MaybeUninit::uninit(); SIZE],
            _not_send: PhantomData,
        }
    }

    /// Returns a pointer to the first byte of the buffer at `this`, without
    /// creating a reference.
    #[inline]
    pub(crate) fn start(this: NonNull<Self>) -> NonNull<u8> {
        this.cast::<u8>()
    }

    /// Returns a bitwise copy of the buffer.
    ///
    /// Copying the bytes of a trivially copyable object duplicates the
    /// object. For anything else the copy must be treated as inert.
    #[inline]
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            _align: [],
            bytes: self.bytes,
            _not_send: PhantomData,
        }
    }
}
