//! Vtables: holding the table of erased thunks bound for one concrete type.
//!
//! A vtable is either empty, meaning its container holds no value, or bound to
//! exactly one concrete type through [`VTable::create_for`]. Two shapes are
//! provided:
//!
//! - [`InlineTable`] copies the table into the container. Dispatch is a
//!   single load, at the cost of one pointer of container size per method.
//! - [`StaticTable`] stores one pointer to a constant table shared by every
//!   container bound to the same type.
//!
//! A [`VTablePolicy`] chooses the shape for each interface.
//! [`MaybeInlineVTable`] picks the inline shape for short interfaces and the
//! static one for longer interfaces, counting at the type level through the
//! [`nat`] module.

use crate::interface::{Bind, Contains, ErasedFn, Interface, Method};

mod inline;
pub mod nat;
mod static_table;

pub use inline::InlineTable;
pub use static_table::StaticTable;

use nat::{Answer, Limit, Nat, ToNat};

/// A table of erased thunks for the interface `I`, possibly empty.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// 1. [`empty`](Self::empty) returns a value for which
///    [`is_empty`](Self::is_empty) is `true` and [`get`](Self::get) returns
///    `None`.
/// 2. [`create_for::<S, T>`](Self::create_for) returns a value for which
///    `is_empty` is `false` and `get::<M, _>` returns the thunk
///    `<I as Bind<S, T>>` provides for `M`.
/// 3. Copies of a vtable behave exactly like the original.
pub unsafe trait VTable<I: Interface>: Copy + 'static {
    /// Returns a vtable with no binding.
    fn empty() -> Self;

    /// Returns whether the vtable has no binding.
    fn is_empty(&self) -> bool;

    /// Clears the binding.
    ///
    /// This does not destroy anything. The caller is responsible for the
    /// object the binding described.
    #[inline]
    fn reset(&mut self) {
        *self = Self::empty();
    }

    /// Returns the thunk for `M`, or `None` if the vtable is empty.
    fn get<M: Method, Idx>(&self) -> Option<ErasedFn<M>>
    where
        I: Contains<M, Idx>;

    /// Returns the thunk for `M` without checking for a binding.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The vtable is not empty.
    #[inline]
    unsafe fn get_unchecked<M: Method, Idx>(&self) -> ErasedFn<M>
    where
        I: Contains<M, Idx>,
    {
        debug_assert!(!self.is_empty(), "thunk lookup on an empty vtable");
        match self.get::<M, Idx>() {
            Some(thunk) => thunk,
            // SAFETY:
            // 1. The vtable is bound, as guaranteed by the caller, so `get`
            //    returned `Some`
            None => unsafe { core::hint::unreachable_unchecked() },
        }
    }

    /// Returns a vtable bound to `T` held in the storage `S`.
    fn create_for<S, T>() -> Self
    where
        I: Bind<S, T>;
}

/// Chooses the vtable shape for every interface.
pub trait VTablePolicy: 'static {
    /// The vtable used for the interface `I`.
    type Of<I: Interface>: VTable<I>;
}

/// Always stores the table by value.
#[derive(Debug)]
pub enum InlineVTable {}

/// Always stores a pointer to a constant table.
#[derive(Debug)]
pub enum OutOfLineVTable {}

/// Stores the table by value when the interface has at most `LIMIT` methods,
/// and a pointer to a constant table otherwise.
///
/// The count includes the methods a storage adds for itself. `LIMIT` can be
/// anything from 0 to 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MaybeInlineVTable<const LIMIT: usize>;

impl VTablePolicy for InlineVTable {
    type Of<I: Interface> = InlineTable<I>;
}

impl VTablePolicy for OutOfLineVTable {
    type Of<I: Interface> = StaticTable<I>;
}

impl<const LIMIT: usize> VTablePolicy for MaybeInlineVTable<LIMIT>
where
    Limit<LIMIT>: ToNat,
{
    type Of<I: Interface> =
        <<I::Len as Nat>::Leq<<Limit<LIMIT> as ToNat>::Nat> as Answer>::Pick<I>;
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_type_eq_all;

    use super::*;
    use crate::interface::{Cons, Nil, Ref};

    struct A;
    struct B;
    struct C;

    impl Method for A {
        type Receiver = Ref;
        type Args = ();
        type Output = ();
    }

    impl Method for B {
        type Receiver = Ref;
        type Args = ();
        type Output = ();
    }

    impl Method for C {
        type Receiver = Ref;
        type Args = ();
        type Output = ();
    }

    type Short = Cons<A, Cons<B, Nil>>;
    type Long = Cons<A, Cons<B, Cons<C, Nil>>>;

    #[test]
    fn test_maybe_inline_selection() {
        assert_type_eq_all!(<MaybeInlineVTable<2> as VTablePolicy>::Of<Short>, InlineTable<Short>);
        assert_type_eq_all!(<MaybeInlineVTable<2> as VTablePolicy>::Of<Long>, StaticTable<Long>);
        assert_type_eq_all!(<MaybeInlineVTable<0> as VTablePolicy>::Of<Nil>, InlineTable<Nil>);
        assert_type_eq_all!(<MaybeInlineVTable<0> as VTablePolicy>::Of<Short>, StaticTable<Short>);
    }

    #[test]
    fn test_shapes_sizes() {
        // Function pointers are non-null, so emptiness costs no space.
        assert_eq!(size_of::<InlineTable<Short>>(), 2 * size_of::<usize>());
        assert_eq!(size_of::<InlineTable<Long>>(), 3 * size_of::<usize>());
        assert_eq!(size_of::<StaticTable<Long>>(), size_of::<usize>());
    }
}
