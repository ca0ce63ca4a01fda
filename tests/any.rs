//! Integration tests for the `Any` container across every storage.
//!
//! The suite covers:
//!
//! ## Dispatch
//! - `test_inline_storage`: values held in place, replaced by other types
//! - `test_reference_storages`: borrowed values through `AnyRef` and `AnyMut`
//! - `test_policies_agree`: identical results under every vtable policy
//! - `test_inline_and_boxed_agree`: the same number held in place and out of
//!   line answers every method alike
//! - `test_call_once_frees_block`: an owned-receiver call moves the value out
//!   and frees its block without a second drop
//!
//! ## Lifecycle
//! - `test_hybrid_allocations`: one allocation for a large value, one
//!   deallocation on reset, none for a small value
//! - `test_unique_always_boxes`: a zero-sized buffer boxes every sized value
//! - `test_take_and_move_from`: moves leave the source empty and keep the
//!   value's identity
//! - `test_shared_drop_once`: clones share a value dropped exactly once
//! - `test_immovable_emplace`: an immovable container replacing its value
//! - `test_panicking_drop_runs_once`: a value whose `Drop` panics leaves its
//!   container empty and is never dropped again
//!
//! ## Failure
//! - `test_fallible_create`: a refusing allocator reports its error and never
//!   runs the constructor
//! - `test_failed_emplace_keeps_value`: a failed replacement leaves the old
//!   value in place
//!
//! ## Layout
//! - `test_layout`: sizes and auto traits

use core::{alloc::Layout, cell::Cell, convert::Infallible, ptr::NonNull};
use std::panic::{self, AssertUnwindSafe};

use erasure::{
    allocator::{Allocator, Global},
    prelude::*,
    storage::{HybridStorage, Immovable, InlineStorage, MoveOnly, StorageCategory},
    vtable::{InlineVTable, MaybeInlineVTable, OutOfLineVTable, VTablePolicy},
};
use static_assertions::assert_not_impl_any;

method! {
    /// Adds the argument to the value's number.
    struct X: fn(&self, i32) -> i32;
    /// Adds two to the value's number and returns it.
    struct Y: fn(&mut self) -> i32;
    /// Consumes the value, returning its number.
    struct Consume: fn(self) -> i32;
}

type Xy = interface![X, Y];

std::thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static DEALLOCATIONS: Cell<usize> = const { Cell::new(0) };
    static DROPS: Cell<usize> = const { Cell::new(0) };
}

fn allocations() -> usize {
    ALLOCATIONS.with(Cell::get)
}

fn deallocations() -> usize {
    DEALLOCATIONS.with(Cell::get)
}

fn drops() -> usize {
    DROPS.with(Cell::get)
}

struct A {
    x: i32,
}

struct B {
    x: i32,
}

/// Too large for the default inline buffer, and counts its drops.
struct Big {
    x: i32,
    _padding: [u64; 8],
}

impl Big {
    fn new(x: i32) -> Self {
        Self { x, _padding: [0; 8] }
    }
}

impl Drop for Big {
    fn drop(&mut self) {
        DROPS.with(|drops| drops.set(drops.get() + 1));
    }
}

macro_rules! impl_xy {
    ($($ty:ty),*) => {
        $(
            impl Call<X> for $ty {
                fn call(&self, (y,): (i32,)) -> i32 {
                    self.x + y
                }
            }

            impl CallMut<Y> for $ty {
                fn call_mut(&mut self, (): ()) -> i32 {
                    self.x += 2;
                    self.x
                }
            }

            impl CallOnce<Consume> for $ty {
                fn call_once(self, (): ()) -> i32 {
                    self.x
                }
            }
        )*
    };
}

impl_xy!(A, B, Big);

/// Counts its drops.
struct Tracer;

impl Drop for Tracer {
    fn drop(&mut self) {
        DROPS.with(|drops| drops.set(drops.get() + 1));
    }
}

/// Panics when dropped. Its tracer is still dropped during the unwind.
struct Fragile<const N: usize> {
    _tracer: Tracer,
    _padding: [u64; N],
}

impl<const N: usize> Fragile<N> {
    fn new() -> Self {
        Self {
            _tracer: Tracer,
            _padding: [0; N],
        }
    }
}

impl<const N: usize> Drop for Fragile<N> {
    fn drop(&mut self) {
        panic!("fragile value dropped");
    }
}

/// The global heap, counting calls.
#[derive(Debug, Default)]
struct Counting;

// SAFETY:
// 1. Every request is forwarded to the global heap
unsafe impl Allocator for Counting {
    type Error = Infallible;

    const FALLIBLE: bool = false;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, Infallible> {
        ALLOCATIONS.with(|count| count.set(count.get() + 1));
        Global.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        DEALLOCATIONS.with(|count| count.set(count.get() + 1));
        // SAFETY: the block came from `Global` with this layout
        unsafe { Global.deallocate(ptr, layout) }
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("allocator refused a block of {size} bytes")]
struct Refused {
    size: usize,
}

/// An allocator that refuses every request.
#[derive(Debug, Default)]
struct Refusing;

// SAFETY:
// 1. No block is ever handed out
unsafe impl Allocator for Refusing {
    type Error = Refused;

    const FALLIBLE: bool = true;

    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, Refused> {
        Err(Refused {
            size: layout.size(),
        })
    }

    unsafe fn deallocate(&self, _ptr: NonNull<u8>, _layout: Layout) {
        unreachable!("no block was ever allocated");
    }
}

type Counted = HybridStorage<MoveOnly, 16, 8, Counting>;
type Strict = HybridStorage<MoveOnly, 16, 8, Refusing>;

#[test]
fn test_inline_storage() {
    let mut any: AnyInline<Xy> = Any::new(A { x: 4 });
    assert_eq!(any.call::<X, _>((1,)), 5);
    assert_eq!(any.call_mut::<Y, _>(()), 6);
    assert_eq!(any.call::<X, _>((1,)), 7);

    any.emplace(B { x: 5 });
    assert_eq!(any.call::<X, _>((0,)), 5);
    assert_eq!(AnyInline::<Xy>::storage_category(), StorageCategory::MoveOnly);
}

#[test]
fn test_reference_storages() {
    let a = A { x: 4 };
    let b = B { x: 5 };
    let mut any: AnyRef<'_, interface![X]> = Any::from_ref(&a);
    let copy = any.clone();
    assert_eq!(any.call::<X, _>((10,)), 14);
    any.rebind(&b);
    assert_eq!(any.call::<X, _>((10,)), 15);
    assert_eq!(copy.call::<X, _>((10,)), 14);

    let mut target = A { x: 0 };
    {
        let mut any: AnyMut<'_, Xy> = Any::from_mut(&mut target);
        assert_eq!(any.call_mut::<Y, _>(()), 2);
        assert_eq!(any.call_mut::<Y, _>(()), 4);
    }
    assert_eq!(target.x, 4);
}

fn run_all<P: VTablePolicy>() -> (i32, i32, i32) {
    let mut small: Any<interface![X, Y, Consume], HybridStorage, P> = Any::new(A { x: 4 });
    let mut large: Any<interface![X, Y, Consume], HybridStorage, P> = Any::new(Big::new(5));
    let first = small.call::<X, _>((1,));
    let second = large.call_mut::<Y, _>(());
    (first, second, large.call_once::<Consume, _>(()))
}

#[test]
fn test_policies_agree() {
    let expected = (5, 7, 7);
    assert_eq!(run_all::<InlineVTable>(), expected);
    assert_eq!(run_all::<OutOfLineVTable>(), expected);
    assert_eq!(run_all::<MaybeInlineVTable<0>>(), expected);
    assert_eq!(run_all::<MaybeInlineVTable<16>>(), expected);
}

#[test]
fn test_inline_and_boxed_agree() {
    let allocated = allocations();
    let mut inline: Any<Xy, Counted> = Any::new(A { x: 4 });
    assert_eq!(allocations(), allocated);
    let mut boxed: Any<Xy, Counted> = Any::new(Big::new(4));
    assert_eq!(allocations(), allocated + 1);

    assert_eq!(inline.call::<X, _>((1,)), boxed.call::<X, _>((1,)));
    assert_eq!(inline.call_mut::<Y, _>(()), boxed.call_mut::<Y, _>(()));
    assert_eq!(inline.call::<X, _>((0,)), 6);
    assert_eq!(boxed.call::<X, _>((0,)), 6);
}

#[test]
fn test_call_once_frees_block() {
    let (allocated, freed, dropped) = (allocations(), deallocations(), drops());
    let any: Any<interface![Consume], Counted> = Any::new(Big::new(9));
    assert_eq!(allocations(), allocated + 1);
    assert_eq!(any.call_once::<Consume, _>(()), 9);
    assert_eq!(deallocations(), freed + 1);
    assert_eq!(drops(), dropped + 1);
}

#[test]
fn test_hybrid_allocations() {
    let (allocated, freed) = (allocations(), deallocations());
    let mut any: Any<Xy, Counted> = Any::new(A { x: 4 });
    assert!(Any::<Xy, Counted>::creation_is_inline::<A>());
    assert_eq!(allocations(), allocated);

    any.emplace(Big::new(1));
    assert_eq!(allocations(), allocated + 1);
    assert_eq!(any.call::<X, _>((1,)), 2);

    any.reset();
    assert_eq!(deallocations(), freed + 1);
    any.reset();
    assert_eq!(deallocations(), freed + 1);
    assert!(!any.has_value());
}

#[test]
fn test_unique_always_boxes() {
    type Unique = Any<Xy, HybridStorage<MoveOnly, 0, 1, Counting>>;

    assert!(!Unique::creation_is_inline::<A>());
    assert!(Unique::creation_is_inline::<()>());

    let allocated = allocations();
    let any = Unique::new(A { x: 4 });
    assert_eq!(allocations(), allocated + 1);
    assert_eq!(any.call::<X, _>((0,)), 4);

    let default: AnyUnique<Xy> = Any::new(B { x: 5 });
    assert_eq!(default.call::<X, _>((0,)), 5);
}

#[test]
fn test_take_and_move_from() {
    let (allocated, dropped) = (allocations(), drops());
    let mut source: Any<Xy, Counted> = Any::new(Big::new(3));
    let mut target = source.take();
    assert!(!source.has_value());
    assert_eq!(target.call::<X, _>((0,)), 3);
    assert_eq!(allocations(), allocated + 1);

    let mut other: Any<Xy, Counted> = Any::new(B { x: 5 });
    other.move_from(&mut target);
    assert!(!target.has_value());
    assert_eq!(other.call::<X, _>((0,)), 3);
    assert_eq!(drops(), dropped);

    drop(other);
    assert_eq!(drops(), dropped + 1);
}

#[test]
fn test_shared_drop_once() {
    let dropped = drops();
    let any: AnyShared<interface![X]> = Any::new(Big::new(8));
    let copies = [any.clone(), any.clone()];
    drop(any);
    for copy in &copies {
        assert_eq!(copy.call::<X, _>((1,)), 9);
    }
    assert_eq!(drops(), dropped);
    drop(copies);
    assert_eq!(drops(), dropped + 1);
}

#[test]
fn test_immovable_emplace() {
    let dropped = drops();
    let mut any: AnyHybrid<Xy, Immovable> = Any::new(A { x: 4 });
    assert_eq!(any.call_mut::<Y, _>(()), 6);
    any.emplace(Big::new(10));
    assert_eq!(any.call::<X, _>((5,)), 15);
    any.emplace(B { x: 5 });
    assert_eq!(drops(), dropped + 1);
    assert_eq!(
        AnyHybrid::<Xy, Immovable>::storage_category(),
        StorageCategory::Immovable
    );
}

#[test]
fn test_panicking_drop_runs_once() {
    let dropped = drops();

    let mut inline: AnyInline<interface![], 16, 8> = Any::new(Fragile::<0>::new());
    assert!(panic::catch_unwind(AssertUnwindSafe(|| inline.reset())).is_err());
    assert_eq!(drops(), dropped + 1);
    assert!(!inline.has_value());
    drop(inline);
    assert_eq!(drops(), dropped + 1);

    let mut boxed: Any<interface![], Counted> = Any::new(Fragile::<8>::new());
    assert!(!Any::<interface![], Counted>::creation_is_inline::<Fragile<8>>());
    assert!(panic::catch_unwind(AssertUnwindSafe(|| boxed.reset())).is_err());
    assert!(!boxed.has_value());
    drop(boxed);
    assert_eq!(drops(), dropped + 2);

    let shared: AnyShared<interface![]> = Any::new(Fragile::<0>::new());
    let mut copy = shared.clone();
    drop(shared);
    assert_eq!(drops(), dropped + 2);
    assert!(panic::catch_unwind(AssertUnwindSafe(|| copy.reset())).is_err());
    assert!(!copy.has_value());
    drop(copy);
    assert_eq!(drops(), dropped + 3);
}

#[test]
fn test_fallible_create() {
    let constructed = Cell::new(false);
    let result = Any::<Xy, Strict>::create_with(|| {
        constructed.set(true);
        Big::new(1)
    });
    assert_eq!(result.err(), Some(Refused { size: size_of::<Big>() }));
    assert!(!constructed.get());

    assert!(Any::<Xy, Strict>::creation_is_fallible::<Big>());
    assert!(!Any::<Xy, Strict>::creation_is_fallible::<A>());
    let small = Any::<Xy, Strict>::new(A { x: 4 });
    assert_eq!(small.call::<X, _>((0,)), 4);
}

#[test]
fn test_failed_emplace_keeps_value() {
    let dropped = drops();
    let mut any: Any<Xy, Strict> = Any::new(A { x: 4 });
    let error = any.try_emplace(Big::new(2)).unwrap_err();
    assert_eq!(
        error.to_string(),
        format!("allocator refused a block of {} bytes", size_of::<Big>())
    );
    // The rejected value was dropped, the held one is untouched.
    assert_eq!(drops(), dropped + 1);
    assert!(any.has_value());
    assert_eq!(any.call::<X, _>((1,)), 5);

    any.try_emplace(B { x: 5 }).unwrap();
    assert_eq!(any.call::<X, _>((1,)), 6);
}

#[test]
fn test_layout() {
    assert_not_impl_any!(Any<Xy>: Send, Sync);
    assert_not_impl_any!(AnyShared<Xy>: Send, Sync);
    assert_not_impl_any!(AnyRef<'static, Xy>: Send, Sync);

    // One storage pointer and one thunk.
    assert_eq!(size_of::<AnyRef<'static, interface![X]>>(), 2 * size_of::<usize>());
    // A static table costs one pointer whatever the interface length.
    assert_eq!(
        size_of::<Any<Xy, InlineStorage<8, 8>, OutOfLineVTable>>(),
        size_of::<usize>() + 8
    );
    // Manage plus two user methods, stored by value.
    assert_eq!(
        size_of::<Any<Xy, InlineStorage<8, 8>, InlineVTable>>(),
        3 * size_of::<usize>() + 8
    );
}
