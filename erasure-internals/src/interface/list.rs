//! Type-level method lists and their tables.
//!
//! An interface is an ordered list built from [`Cons`] and [`Nil`]. Two lists
//! can be joined with [`Merge`], which is how a storage's internal methods ride
//! in the same vtable as the user's methods.
//!
//! Every interface describes two table layouts:
//!
//! - [`Interface::Table`]: a flat, by-value nesting of [`Row`]s. This is what
//!   an inline vtable copies into each container.
//! - [`Interface::Chain`]: a nesting of [`Link`]s where every tail is a
//!   `&'static` reference. A chain is made only of function pointers and
//!   references, so it can be placed in a constant and shared by every
//!   container bound to the same type.
//!
//! Lookup is resolved at compile time through [`Contains`]. The position of a
//! method in the list is an index type ([`Here`], [`There`], [`Left`],
//! [`Right`]) that the compiler infers, so a lookup is a fixed sequence of
//! field accesses with no runtime search.

use core::marker::PhantomData;

use crate::{
    interface::{ErasedFn, Method, thunk::Thunk},
    vtable::nat::{Nat, Succ, Zero},
};

/// An ordered list of methods.
pub trait Interface: 'static {
    /// The by-value table of erased thunks.
    type Table: Copy + 'static;
    /// The linked table of erased thunks, suitable for a constant.
    type Chain: 'static;
    /// The number of methods, as a type-level natural.
    type Len: Nat;
}

/// The empty interface.
#[derive(Debug)]
pub enum Nil {}

/// An interface starting with the method `M`, followed by `Tail`.
pub struct Cons<M, Tail>(PhantomData<fn() -> (M, Tail)>);

/// The interface holding every method of `A` followed by every method of `B`.
pub struct Merge<A, B>(PhantomData<fn() -> (A, B)>);

impl Interface for Nil {
    type Table = ();
    type Chain = ();
    type Len = Zero;
}

impl<M: Method, Tail: Interface> Interface for Cons<M, Tail> {
    type Table = Row<M, Tail::Table>;
    type Chain = Link<M, Tail::Chain>;
    type Len = Succ<Tail::Len>;
}

impl<A: Interface, B: Interface> Interface for Merge<A, B> {
    type Table = (A::Table, B::Table);
    type Chain = (&'static A::Chain, &'static B::Chain);
    type Len = <A::Len as Nat>::Add<B::Len>;
}

/// One entry of a by-value table.
pub struct Row<M: Method, Rest> {
    /// The thunk for `M`.
    head: ErasedFn<M>,
    /// The entries for the remaining methods.
    rest: Rest,
}

impl<M: Method, Rest: Copy> Clone for Row<M, Rest> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Method, Rest: Copy> Copy for Row<M, Rest> {}

/// One entry of a constant, linked table.
pub struct Link<M: Method, Rest: 'static> {
    /// The thunk for `M`.
    head: ErasedFn<M>,
    /// The entries for the remaining methods.
    rest: &'static Rest,
}

/// The index of a method at the head of a [`Cons`].
#[derive(Debug)]
pub enum Here {}

/// The index of a method found at index `I` of a [`Cons`]'s tail.
pub struct There<I>(PhantomData<fn() -> I>);

/// The index of a method found at index `I` of a [`Merge`]'s first half.
pub struct Left<I>(PhantomData<fn() -> I>);

/// The index of a method found at index `I` of a [`Merge`]'s second half.
pub struct Right<I>(PhantomData<fn() -> I>);

/// Compile-time lookup of the method `M` at position `Index`.
///
/// `Index` is almost always inferred. A method listed twice would make it
/// ambiguous, so duplicated tags cannot be called.
pub trait Contains<M: Method, Index>: Interface {
    /// Reads the thunk for `M` out of a by-value table.
    fn lookup(table: &Self::Table) -> ErasedFn<M>;

    /// Reads the thunk for `M` out of a linked table.
    fn lookup_chain(chain: &Self::Chain) -> ErasedFn<M>;
}

impl<M: Method, Tail: Interface> Contains<M, Here> for Cons<M, Tail> {
    #[inline]
    fn lookup(table: &Row<M, Tail::Table>) -> ErasedFn<M> {
        table.head
    }

    #[inline]
    fn lookup_chain(chain: &Link<M, Tail::Chain>) -> ErasedFn<M> {
        chain.head
    }
}

impl<M, H, Tail, I> Contains<M, There<I>> for Cons<H, Tail>
where
    M: Method,
    H: Method,
    Tail: Contains<M, I>,
{
    #[inline]
    fn lookup(table: &Row<H, Tail::Table>) -> ErasedFn<M> {
        Tail::lookup(&table.rest)
    }

    #[inline]
    fn lookup_chain(chain: &Link<H, Tail::Chain>) -> ErasedFn<M> {
        Tail::lookup_chain(chain.rest)
    }
}

impl<M, A, B, I> Contains<M, Left<I>> for Merge<A, B>
where
    M: Method,
    A: Contains<M, I>,
    B: Interface,
{
    #[inline]
    fn lookup(table: &(A::Table, B::Table)) -> ErasedFn<M> {
        A::lookup(&table.0)
    }

    #[inline]
    fn lookup_chain(chain: &(&'static A::Chain, &'static B::Chain)) -> ErasedFn<M> {
        A::lookup_chain(chain.0)
    }
}

impl<M, A, B, I> Contains<M, Right<I>> for Merge<A, B>
where
    M: Method,
    A: Interface,
    B: Contains<M, I>,
{
    #[inline]
    fn lookup(table: &(A::Table, B::Table)) -> ErasedFn<M> {
        B::lookup(&table.1)
    }

    #[inline]
    fn lookup_chain(chain: &(&'static A::Chain, &'static B::Chain)) -> ErasedFn<M> {
        B::lookup_chain(chain.1)
    }
}

/// The tables of erased thunks for the concrete type `T` held in the storage
/// `S`.
///
/// Both tables are compile-time constants, built once per `(S, T)` pair and
/// never per container.
pub trait Bind<S, T>: Interface {
    /// The by-value table.
    const TABLE: Self::Table;
    /// The linked table, placed in static memory.
    const CHAIN: &'static Self::Chain;
}

impl<S, T> Bind<S, T> for Nil {
    const TABLE: () = ();
    const CHAIN: &'static () = &();
}

impl<S, T, M, Tail> Bind<S, T> for Cons<M, Tail>
where
    M: Method,
    Tail: Bind<S, T>,
    T: Thunk<M, S, M::Receiver>,
{
    const TABLE: Row<M, Tail::Table> = Row {
        head: <T as Thunk<M, S, M::Receiver>>::THUNK,
        rest: Tail::TABLE,
    };
    const CHAIN: &'static Link<M, Tail::Chain> = &Link {
        head: <T as Thunk<M, S, M::Receiver>>::THUNK,
        rest: Tail::CHAIN,
    };
}

impl<S, T, A, B> Bind<S, T> for Merge<A, B>
where
    A: Bind<S, T>,
    B: Bind<S, T>,
{
    const TABLE: (A::Table, B::Table) = (A::TABLE, B::TABLE);
    const CHAIN: &'static (&'static A::Chain, &'static B::Chain) = &(A::CHAIN, B::CHAIN);
}
