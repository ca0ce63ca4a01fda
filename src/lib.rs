#![cfg_attr(not(doc), no_std)]
#![deny(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    clippy::as_ptr_cast_mut,
    clippy::ptr_as_ptr,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]
// Extra checks on nightly
#![cfg_attr(nightly_extra_checks, feature(rustdoc_missing_doc_code_examples))]
#![cfg_attr(nightly_extra_checks, forbid(rustdoc::missing_doc_code_examples))]
// Make docs.rs generate better docs
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Type-erased containers with pluggable storage and tag-dispatched
//! interfaces.
//!
//! ## Overview
//!
//! An [`Any`] holds one value of any type that implements a chosen
//! *interface*: a list of methods. Calls go through a table of function
//! pointers built at compile time for the concrete type, so the container
//! works without trait objects, without `dyn`-compatibility rules, and
//! without boxing when the value is small.
//!
//! Methods are named by zero-sized *tag* types rather than by trait methods.
//! A concrete type supports a method by implementing [`Call`], [`CallMut`] or
//! [`CallOnce`] for its tag. Any number of unrelated types can implement the
//! same tags, and a single interface can mix borrowed, mutable and consuming
//! methods.
//!
//! ## Quick Example
//!
//! ```
//! use erasure::prelude::*;
//!
//! method! {
//!     pub struct Greet: fn(&self, &'static str) -> String;
//! }
//!
//! struct English;
//! struct Loud(u8);
//!
//! impl Call<Greet> for English {
//!     fn call(&self, (name,): (&'static str,)) -> String {
//!         format!("Hello, {name}")
//!     }
//! }
//!
//! impl Call<Greet> for Loud {
//!     fn call(&self, (name,): (&'static str,)) -> String {
//!         format!("HELLO, {name}{}", "!".repeat(self.0.into()))
//!     }
//! }
//!
//! let mut greeter: Any<interface![Greet]> = Any::new(English);
//! assert_eq!(greeter.call::<Greet, _>(("Ada",)), "Hello, Ada");
//!
//! greeter.emplace(Loud(2));
//! assert_eq!(greeter.call::<Greet, _>(("Ada",)), "HELLO, Ada!!");
//! ```
//!
//! ## Core Concepts
//!
//! An [`Any<I, S, P>`](Any) has three type parameters:
//!
//! - The **interface** `I` lists the callable methods. It is spelled with
//!   [`interface!`], and its tags are declared with [`method!`].
//! - The **storage** `S` decides where the value lives, and with it which
//!   container operations exist. See the [`storage`] module for the table of
//!   categories and capabilities.
//! - The **vtable policy** `P` decides whether the method table is copied
//!   into the container ([`InlineVTable`]), referenced from static memory
//!   ([`OutOfLineVTable`]), or chosen by interface length
//!   ([`MaybeInlineVTable`], the default).
//!
//! The aliases [`AnyInline`], [`AnyHybrid`], [`AnyUnique`], [`AnyShared`],
//! [`AnyTrivial`], [`AnyRef`] and [`AnyMut`] fix the storage for the common
//! cases.
//!
//! ## Fallible Creation
//!
//! Storages that box values use an [`Allocator`]. With a fallible allocator,
//! creating a container holding a large value can fail. Such containers are
//! created with [`Any::create`] and refilled with [`Any::try_emplace`], which
//! return the allocator's error. The infallible [`Any::new`] and
//! [`Any::emplace`] are rejected at compile time whenever the storage and
//! the value's type make failure possible:
//!
//! ```
//! use erasure::{allocator::FallibleGlobal, prelude::*, storage::{HybridStorage, MoveOnly}};
//!
//! type Checked = Any<interface![], HybridStorage<MoveOnly, 16, 8, FallibleGlobal>>;
//!
//! assert!(!Checked::creation_is_fallible::<u64>());
//! assert!(Checked::creation_is_fallible::<[u64; 8]>());
//!
//! let small = Checked::new(1u64);
//! let large = Checked::create([0u64; 8]).expect("out of memory");
//! # let _ = (small, large);
//! ```
//!
//! ## Features
//!
//! - `std`: enables the standard library support of the reference-counting
//!   crate used by [`SharedStorage`].
//! - `tracing`: emits `trace` events through the [`tracing`] crate whenever
//!   a storage allocates or frees an out of line value.
//!
//! [`Call`]: interface::Call
//! [`CallMut`]: interface::CallMut
//! [`CallOnce`]: interface::CallOnce
//! [`InlineVTable`]: vtable::InlineVTable
//! [`OutOfLineVTable`]: vtable::OutOfLineVTable
//! [`MaybeInlineVTable`]: vtable::MaybeInlineVTable
//! [`Allocator`]: allocator::Allocator
//! [`SharedStorage`]: storage::SharedStorage
//! [`tracing`]: https://docs.rs/tracing

extern crate alloc;
#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod aliases;
mod any;
pub mod prelude;

pub use erasure_internals::{allocator, interface, storage, vtable};

pub use self::{
    aliases::{AnyHybrid, AnyInline, AnyMut, AnyRef, AnyShared, AnyTrivial, AnyUnique},
    any::Any,
};

// Not public API. Referenced by macro-generated code.
#[doc(hidden)]
pub mod __private {
    #[doc(hidden)]
    pub use erasure_internals::interface::{Cons, Method, Mut, Nil, Owned, Ref};
}
