use core::fmt;

use crate::{
    interface::{Bind, Contains, ErasedFn, Interface, Method},
    vtable::VTable,
};

/// A vtable holding its table of thunks by value.
pub struct InlineTable<I: Interface> {
    /// The bound table, or `None` when empty.
    table: Option<I::Table>,
}

impl<I: Interface> Clone for InlineTable<I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: Interface> Copy for InlineTable<I> {}

impl<I: Interface> fmt::Debug for InlineTable<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InlineTable")
            .field("bound", &self.table.is_some())
            .finish()
    }
}

// SAFETY:
// 1. `empty` stores `None`, so `is_empty` is true and `get` returns `None`
// 2. `create_for` stores `I::TABLE` for `(S, T)`, and `get` reads from it
// 3. The table is plain data, so copies are identical
unsafe impl<I: Interface> VTable<I> for InlineTable<I> {
    #[inline]
    fn empty() -> Self {
        Self { table: None }
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.table.is_none()
    }

    #[inline]
    fn get<M: Method, Idx>(&self) -> Option<ErasedFn<M>>
    where
        I: Contains<M, Idx>,
    {
        self.table.as_ref().map(<I as Contains<M, Idx>>::lookup)
    }

    #[inline]
    fn create_for<S, T>() -> Self
    where
        I: Bind<S, T>,
    {
        Self {
            table: Some(<I as Bind<S, T>>::TABLE),
        }
    }
}
