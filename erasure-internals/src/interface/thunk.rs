//! Erased thunks: the functions stored in a vtable.
//!
//! A thunk receives an untyped pointer to a storage, recovers the concrete
//! object through [`Storage::down_cast`] and forwards to the user's
//! implementation of the method. Which forwarding function is used is decided
//! by the method's receiver kind, through the blanket impls of [`Thunk`].

use core::ptr::NonNull;

use crate::{
    interface::{Call, CallMut, CallOnce, ErasedFn, Internal, Method, Mut, Owned, Ref},
    storage::{Manage, Storage},
    util::Erased,
};

/// The erased thunk for the method `M`, implemented by `Self` held in the
/// storage `S`, for the receiver kind `R`.
///
/// `R` is always `M::Receiver`. Keeping it as a separate parameter lets each
/// receiver kind have its own blanket impl without overlapping.
pub trait Thunk<M: Method, S, R> {
    /// The thunk.
    const THUNK: ErasedFn<M>;
}

impl<M, S, T> Thunk<M, S, Ref> for T
where
    M: Method,
    S: Storage,
    T: Call<M>,
{
    const THUNK: ErasedFn<M> = call_ref::<M, S, T>;
}

impl<M, S, T> Thunk<M, S, Mut> for T
where
    M: Method,
    S: Storage,
    T: CallMut<M>,
{
    const THUNK: ErasedFn<M> = call_mut::<M, S, T>;
}

impl<M, S, T> Thunk<M, S, Owned> for T
where
    M: Method,
    S: Storage,
    T: CallOnce<M>,
{
    const THUNK: ErasedFn<M> = call_owned::<M, S, T>;
}

impl<S, T> Thunk<Manage<S>, S, Internal> for T
where
    S: Storage + 'static,
    T: 'static,
{
    const THUNK: ErasedFn<Manage<S>> = S::manage::<T>;
}

/// Forwards a shared-receiver call to `T`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `storage` points to a live `S` that currently holds a `T`.
/// 2. No mutable reference to that `T` exists for the duration of the call.
unsafe fn call_ref<M, S, T>(storage: NonNull<Erased>, args: M::Args) -> M::Output
where
    M: Method,
    S: Storage,
    T: Call<M>,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let object = unsafe { S::down_cast::<T>(storage.cast::<S>()) };
    // SAFETY:
    // 1. `down_cast` returns a pointer to the live `T`
    // 2. Guaranteed by the caller
    let object = unsafe { object.as_ref() };
    object.call(args)
}

/// Forwards a mutable-receiver call to `T`.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `storage` points to a live `S` that currently holds a `T`.
/// 2. No other reference to that `T` exists for the duration of the call.
unsafe fn call_mut<M, S, T>(storage: NonNull<Erased>, args: M::Args) -> M::Output
where
    M: Method,
    S: Storage,
    T: CallMut<M>,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let mut object = unsafe { S::down_cast::<T>(storage.cast::<S>()) };
    // SAFETY:
    // 1. `down_cast` returns a pointer to the live `T`
    // 2. Guaranteed by the caller
    let object = unsafe { object.as_mut() };
    object.call_mut(args)
}

/// Moves `T` out of the storage and forwards an owned-receiver call to it.
///
/// After this returns the storage no longer holds a live object. Only its
/// memory remains, and it must be freed with `Operation::Release`, never
/// destroyed.
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `storage` points to a live `S` that currently holds a `T`.
/// 2. No other reference to that `T` exists.
/// 3. The storage is treated as holding no object afterwards.
unsafe fn call_owned<M, S, T>(storage: NonNull<Erased>, args: M::Args) -> M::Output
where
    M: Method,
    S: Storage,
    T: CallOnce<M>,
{
    // SAFETY:
    // 1. Guaranteed by the caller
    let object = unsafe { S::down_cast::<T>(storage.cast::<S>()) };
    // SAFETY:
    // 1. `down_cast` returns a pointer to the live `T`
    // 2. Guaranteed by the caller
    // 3. Guaranteed by the caller, so the bitwise copy is never dropped twice
    let object = unsafe { object.read() };
    object.call_once(args)
}
