//! Shorthands for the common storage choices.
//!
//! Each alias fixes the storage of an [`Any`] and keeps the default vtable
//! policy.

use crate::{
    Any,
    storage::{
        DEFAULT_INLINE_ALIGN, DEFAULT_INLINE_SIZE, HybridStorage, InlineStorage, MoveOnly,
        MutRefStorage, RefStorage, SharedStorage, TrivialStorage,
    },
};

/// Always holds the value in place, in `SIZE` bytes aligned to `ALIGN`.
///
/// Values that do not fit are rejected at compile time.
pub type AnyInline<
    I,
    const SIZE: usize = DEFAULT_INLINE_SIZE,
    const ALIGN: usize = DEFAULT_INLINE_ALIGN,
> = Any<I, InlineStorage<SIZE, ALIGN>>;

/// Holds small values in place and boxes the others.
///
/// `C` is [`MoveOnly`] or [`Immovable`](crate::storage::Immovable).
pub type AnyHybrid<I, C = MoveOnly> = Any<I, HybridStorage<C>>;

/// Always boxes the value, except for zero-sized types with an alignment
/// of one.
pub type AnyUnique<I> = Any<I, HybridStorage<MoveOnly, 0, 1>>;

/// Boxes the value behind a reference count. Clones share it.
pub type AnyShared<I> = Any<I, SharedStorage>;

/// Holds a `Copy` value in place. Clones copy it.
pub type AnyTrivial<I> = Any<I, TrivialStorage>;

/// Borrows the value.
pub type AnyRef<'a, I> = Any<I, RefStorage<'a>>;

/// Borrows the value mutably.
pub type AnyMut<'a, I> = Any<I, MutRefStorage<'a>>;
