/// Declares method tags.
///
/// Each declaration names a zero-sized tag type and gives the method's
/// signature. The receiver decides which trait a concrete type implements to
/// support the method:
///
/// | Receiver    | Trait                                  | Called with        |
/// |-------------|----------------------------------------|--------------------|
/// | `&self`     | [`Call`](crate::interface::Call)         | [`Any::call`]      |
/// | `&mut self` | [`CallMut`](crate::interface::CallMut)   | [`Any::call_mut`]  |
/// | `self`      | [`CallOnce`](crate::interface::CallOnce) | [`Any::call_once`] |
///
/// The arguments are passed as a tuple, so a method taking one `i32` receives
/// `(i32,)` and a method taking nothing receives `()`.
///
/// [`Any::call`]: crate::Any::call
/// [`Any::call_mut`]: crate::Any::call_mut
/// [`Any::call_once`]: crate::Any::call_once
///
/// # Examples
///
/// ```
/// use erasure::prelude::*;
///
/// method! {
///     /// Adds the argument to the value.
///     pub struct Add: fn(&self, i32) -> i32;
///     pub struct Bump: fn(&mut self);
/// }
///
/// struct Counter(i32);
///
/// impl Call<Add> for Counter {
///     fn call(&self, (y,): (i32,)) -> i32 {
///         self.0 + y
///     }
/// }
///
/// impl CallMut<Bump> for Counter {
///     fn call_mut(&mut self, (): ()) {
///         self.0 += 1;
///     }
/// }
///
/// let mut any: Any<interface![Add, Bump]> = Any::new(Counter(1));
/// any.call_mut::<Bump, _>(());
/// assert_eq!(any.call::<Add, _>((10,)), 12);
/// ```
#[macro_export]
macro_rules! method {
    () => {};
    (@output) => { () };
    (@output $out:ty) => { $out };
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident : fn(&mut self $(, $arg:ty)*) $(-> $out:ty)?;
        $($rest:tt)*
    ) => {
        $crate::__declare_method!(
            $(#[$attr])* $vis $name, $crate::__private::Mut, ($($arg,)*), $crate::method!(@output $($out)?)
        );
        $crate::method! { $($rest)* }
    };
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident : fn(&self $(, $arg:ty)*) $(-> $out:ty)?;
        $($rest:tt)*
    ) => {
        $crate::__declare_method!(
            $(#[$attr])* $vis $name, $crate::__private::Ref, ($($arg,)*), $crate::method!(@output $($out)?)
        );
        $crate::method! { $($rest)* }
    };
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident : fn(self $(, $arg:ty)*) $(-> $out:ty)?;
        $($rest:tt)*
    ) => {
        $crate::__declare_method!(
            $(#[$attr])* $vis $name, $crate::__private::Owned, ($($arg,)*), $crate::method!(@output $($out)?)
        );
        $crate::method! { $($rest)* }
    };
}

/// Declares one tag type and its `Method` impl.
#[doc(hidden)]
#[macro_export]
macro_rules! __declare_method {
    ($(#[$attr:meta])* $vis:vis $name:ident, $receiver:ty, $args:ty, $output:ty) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name;

        impl $crate::__private::Method for $name {
            type Receiver = $receiver;
            type Args = $args;
            type Output = $output;
        }
    };
}

/// Spells an interface type from a list of method tags.
///
/// `interface![A, B, C]` is the list `Cons<A, Cons<B, Cons<C, Nil>>>`, and
/// `interface![]` is the empty interface. A tag may appear at most once.
///
/// # Examples
///
/// ```
/// use erasure::{
///     interface::{Cons, Nil},
///     prelude::*,
/// };
/// # use static_assertions::assert_type_eq_all;
///
/// method! {
///     struct Size: fn(&self) -> usize;
///     struct Clear: fn(&mut self);
/// }
///
/// assert_type_eq_all!(interface![Size, Clear], Cons<Size, Cons<Clear, Nil>>);
/// assert_type_eq_all!(interface![], Nil);
/// ```
#[macro_export]
macro_rules! interface {
    () => {
        $crate::__private::Nil
    };
    ($head:ty $(, $tail:ty)* $(,)?) => {
        $crate::__private::Cons<$head, $crate::interface![$($tail),*]>
    };
}
