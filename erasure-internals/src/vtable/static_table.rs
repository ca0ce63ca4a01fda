use core::fmt;

use crate::{
    interface::{Bind, Contains, ErasedFn, Interface, Method},
    vtable::VTable,
};

/// A vtable holding a single pointer to a constant table of thunks.
///
/// The constant is built once per storage and concrete type, so every
/// container bound to the same pair shares it.
pub struct StaticTable<I: Interface> {
    /// The bound table, or `None` when empty.
    chain: Option<&'static I::Chain>,
}

impl<I: Interface> Clone for StaticTable<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: Interface> Copy for StaticTable<I> {}

impl<I: Interface> fmt::Debug for StaticTable<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTable")
            .field("bound", &self.chain.is_some())
            .finish()
    }
}

// SAFETY:
// 1. `empty` stores `None`, so `is_empty` is true and `get` returns `None`
// 2. `create_for` points at `I::CHAIN` for `(S, T)`, and `get` reads from it
// 3. Copies point at the same constant
unsafe impl<I: Interface> VTable<I> for StaticTable<I> {
    #[inline]
    fn empty() -> Self {
        Self { chain: None }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.chain.is_none()
    }

    #[inline]
    fn get<M: Method, Idx>(&self) -> Option<ErasedFn<M>>
    where
        I: Contains<M, Idx>,
    {
        self.chain.map(<I as Contains<M, Idx>>::lookup_chain)
    }

    #[inline]
    fn create_for<S, T>() -> Self
    where
        I: Bind<S, T>,
    {
        Self {
            chain: Some(<I as Bind<S, T>>::CHAIN),
        }
    }
}
