//! Method tags, receivers and the traits concrete types implement to support
//! a method.
//!
//! A [`Method`] is a zero-sized tag type. It names one operation and fixes its
//! shape: how the erased value is received ([`Ref`], [`Mut`] or [`Owned`]), the
//! argument tuple and the output. A concrete type supports the method by
//! implementing [`Call`], [`CallMut`] or [`CallOnce`] for the tag, matching the
//! receiver.
//!
//! Tags are collected into ordered lists by the [`list`] module and turned into
//! erased thunks by the [`thunk`] module.

use core::ptr::NonNull;

use crate::util::Erased;

pub mod list;
pub mod thunk;

pub use list::{Bind, Cons, Contains, Here, Interface, Left, Link, Merge, Nil, Right, Row, There};
pub use thunk::Thunk;

/// A type-erased method implementation.
///
/// The first argument is an untyped pointer to the storage holding the
/// object, not to the object itself: the thunk recovers the object through
/// the storage's `down_cast`.
pub type ErasedFn<M> =
    unsafe fn(NonNull<Erased>, <M as Method>::Args) -> <M as Method>::Output;

/// A tag naming one operation of an interface.
///
/// Tags are usually declared with the `method!` macro of the `erasure` crate.
pub trait Method: 'static {
    /// How the erased value is received: [`Ref`], [`Mut`] or [`Owned`].
    type Receiver: Receiver;
    /// The argument tuple, excluding the receiver.
    type Args: 'static;
    /// The return type.
    type Output: 'static;
}

mod sealed {
    /// Restricts [`Receiver`](super::Receiver) to the markers in this module.
    pub trait Sealed {}
}

/// The ways an erased value can be received by a method.
pub trait Receiver: sealed::Sealed + 'static {}

/// The method borrows the value: `fn(&self, ..)`.
#[derive(Debug)]
pub enum Ref {}

/// The method borrows the value mutably: `fn(&mut self, ..)`.
#[derive(Debug)]
pub enum Mut {}

/// The method consumes the value: `fn(self, ..)`.
#[derive(Debug)]
pub enum Owned {}

/// The method is used by the storage itself and cannot be called through an
/// `Any`.
#[derive(Debug)]
pub enum Internal {}

impl sealed::Sealed for Ref {}
impl sealed::Sealed for Mut {}
impl sealed::Sealed for Owned {}
impl sealed::Sealed for Internal {}
impl Receiver for Ref {}
impl Receiver for Mut {}
impl Receiver for Owned {}
impl Receiver for Internal {}

/// Implements the method `M` for a shared receiver.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement the method `{M}`",
    label = "missing `Call<{M}>` implementation"
)]
pub trait Call<M: Method>: 'static {
    /// Runs the method.
    fn call(&self, args: M::Args) -> M::Output;
}

/// Implements the method `M` for a mutable receiver.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement the method `{M}`",
    label = "missing `CallMut<{M}>` implementation"
)]
pub trait CallMut<M: Method>: 'static {
    /// Runs the method.
    fn call_mut(&mut self, args: M::Args) -> M::Output;
}

/// Implements the method `M` for an owned receiver.
#[diagnostic::on_unimplemented(
    message = "`{Self}` does not implement the method `{M}`",
    label = "missing `CallOnce<{M}>` implementation"
)]
pub trait CallOnce<M: Method>: Sized + 'static {
    /// Runs the method, consuming the value.
    fn call_once(self, args: M::Args) -> M::Output;
}
