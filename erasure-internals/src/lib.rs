#![no_std]
#![forbid(
    missing_docs,
    clippy::alloc_instead_of_core,
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::missing_safety_doc,
    clippy::missing_docs_in_private_items,
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    unused_doc_comments
)]
#![allow(rustdoc::private_intra_doc_links)]
//! Internal implementation crate for [`erasure`].
//!
//! # Overview
//!
//! This crate contains the low-level, type-erased building blocks that power
//! the [`erasure`] container: raw storage strategies, interface descriptions,
//! erased thunks and the vtables that hold them.
//!
//! **This crate is an implementation detail.** No semantic versioning guarantees
//! are provided. Users should depend on the [`erasure`] crate, not this one.
//!
//! # Architecture
//!
//! The pieces are layered, leaves first:
//!
//! - **[`allocator`]**: The allocator capability used by out-of-line storage
//!   - [`Allocator`]: allocate and deallocate raw blocks, fallibly or not
//!   - [`Global`] / [`FallibleGlobal`]: the global heap, aborting or reporting
//!     [`AllocError`] on exhaustion
//!
//! - **[`interface`]**: Method tags and ordered method lists
//!   - [`Method`]: a tag naming one operation with a receiver kind, an argument
//!     tuple and an output
//!   - [`Cons`] / [`Nil`] / [`Merge`]: type-level method lists
//!   - [`Bind`]: builds the constant table of erased thunks for one concrete
//!     type under one storage
//!
//! - **[`storage`]**: Where the erased object's bytes live
//!   - [`InlineStorage`], [`HybridStorage`], [`SharedStorage`],
//!     [`TrivialStorage`], [`RefStorage`], [`MutRefStorage`]
//!   - [`Operation`]: the lifecycle requests served by the single internal
//!     [`Manage`] method
//!
//! - **[`vtable`]**: Holding a bound table
//!   - [`InlineTable`]: the table stored by value
//!   - [`StaticTable`]: a pointer to a constant table
//!   - [`VTablePolicy`]: chooses between them per interface
//!
//! # Safety Strategy
//!
//! Type erasure requires that the thunks in a vtable always match the concrete
//! type held by the storage next to it. This crate keeps that manageable
//! through:
//!
//! - **Monomorphized constant tables**: a table is only ever produced by
//!   [`VTable::create_for`], which pairs every thunk with one storage type `S`
//!   and one concrete type `T` at compile time
//! - **No runtime placement flag**: every storage decides inline versus out of
//!   line with the same `const fn` predicate in `init`, `down_cast` and the
//!   manage thunk, so the three can never disagree
//! - **Documented contracts**: every `unsafe fn` lists the caller obligations
//!   it relies on, and every `unsafe` block says which of them it discharges
//!
//! [`erasure`]: ../erasure/index.html
//! [`Allocator`]: allocator::Allocator
//! [`Global`]: allocator::Global
//! [`FallibleGlobal`]: allocator::FallibleGlobal
//! [`AllocError`]: allocator::AllocError
//! [`Method`]: interface::Method
//! [`Cons`]: interface::Cons
//! [`Nil`]: interface::Nil
//! [`Merge`]: interface::Merge
//! [`Bind`]: interface::Bind
//! [`InlineStorage`]: storage::InlineStorage
//! [`HybridStorage`]: storage::HybridStorage
//! [`SharedStorage`]: storage::SharedStorage
//! [`TrivialStorage`]: storage::TrivialStorage
//! [`RefStorage`]: storage::RefStorage
//! [`MutRefStorage`]: storage::MutRefStorage
//! [`Operation`]: storage::Operation
//! [`Manage`]: storage::Manage
//! [`InlineTable`]: vtable::InlineTable
//! [`StaticTable`]: vtable::StaticTable
//! [`VTablePolicy`]: vtable::VTablePolicy
//! [`VTable::create_for`]: vtable::VTable::create_for

extern crate alloc;

pub mod allocator;
pub mod interface;
pub mod storage;
mod util;
pub mod vtable;

pub use util::Erased;
