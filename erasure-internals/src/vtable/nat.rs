//! Type-level naturals used to pick a vtable shape by interface length.
//!
//! Const generic expressions cannot be used to choose a type on stable Rust,
//! so interface lengths are counted with Peano naturals ([`Zero`] and
//! [`Succ`]) and compared with associated types. The comparison yields an
//! [`Answer`], which picks the vtable shape.

use core::marker::PhantomData;

use crate::{
    interface::Interface,
    vtable::{InlineTable, StaticTable, VTable},
};

/// A type-level natural number.
pub trait Nat: 'static {
    /// `Self + N`.
    type Add<N: Nat>: Nat;
    /// Whether `Self <= N`.
    type Leq<N: Nat>: Answer;
    /// Whether `Self > N`.
    type Gt<N: Nat>: Answer;
}

/// Zero.
#[derive(Debug)]
pub enum Zero {}

/// `K + 1`.
pub struct Succ<K>(PhantomData<fn() -> K>);

impl Nat for Zero {
    type Add<N: Nat> = N;
    type Leq<N: Nat> = Yes;
    type Gt<N: Nat> = No;
}

impl<K: Nat> Nat for Succ<K> {
    type Add<N: Nat> = Succ<K::Add<N>>;
    // K + 1 <= N exactly when N > K.
    type Leq<N: Nat> = N::Gt<K>;
    // K + 1 > N exactly when N <= K.
    type Gt<N: Nat> = N::Leq<K>;
}

/// The result of a type-level comparison, choosing a vtable shape.
pub trait Answer: 'static {
    /// [`InlineTable`] for [`Yes`], [`StaticTable`] for [`No`].
    type Pick<I: Interface>: VTable<I>;
}

/// A comparison that holds.
#[derive(Debug)]
pub enum Yes {}

/// A comparison that does not hold.
#[derive(Debug)]
pub enum No {}

impl Answer for Yes {
    type Pick<I: Interface> = InlineTable<I>;
}

impl Answer for No {
    type Pick<I: Interface> = StaticTable<I>;
}

/// Bridges a `usize` const parameter to a [`Nat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Limit<const N: usize>;

/// Implemented by every [`Limit`] that has a [`Nat`] counterpart.
pub trait ToNat {
    /// The natural equal to the limit.
    type Nat: Nat;
}

impl ToNat for Limit<0> {
    type Nat = Zero;
}

/// Implements [`ToNat`] for each `Limit<n>` in terms of `Limit<n - 1>`.
macro_rules! impl_to_nat {
    ($($n:literal => $prev:literal),* $(,)?) => {
        $(
            impl ToNat for Limit<$n> {
                type Nat = Succ<<Limit<$prev> as ToNat>::Nat>;
            }
        )*
    };
}

impl_to_nat!(
    1 => 0, 2 => 1, 3 => 2, 4 => 3, 5 => 4, 6 => 5, 7 => 6, 8 => 7,
    9 => 8, 10 => 9, 11 => 10, 12 => 11, 13 => 12, 14 => 13, 15 => 14, 16 => 15,
);
