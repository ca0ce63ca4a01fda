use erasure_internals::{
    interface::{Bind, Interface},
    storage::{Merged, MutRefStorage, RefStorage},
    vtable::VTablePolicy,
};

use super::bound_vtable;
use crate::Any;

impl<'a, I, P> Any<I, RefStorage<'a>, P>
where
    I: Interface,
    P: VTablePolicy,
{
    /// Creates a container borrowing `object`.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// method! {
    ///     struct Name: fn(&self) -> &'static str;
    /// }
    ///
    /// impl Call<Name> for bool {
    ///     fn call(&self, (): ()) -> &'static str {
    ///         if *self { "yes" } else { "no" }
    ///     }
    /// }
    ///
    /// let answer = true;
    /// let any: AnyRef<'_, interface![Name]> = Any::from_ref(&answer);
    /// let copy = any.clone();
    /// assert_eq!(copy.call::<Name, _>(()), "yes");
    /// ```
    #[must_use]
    pub fn from_ref<T>(object: &'a T) -> Self
    where
        T: 'static,
        Merged<I, RefStorage<'a>>: Bind<RefStorage<'a>, T>,
    {
        // SAFETY:
        // 1. The vtable is bound and the storage refers to an object
        // 2. The vtable is bound for `T`, the type of the referent
        unsafe {
            Self::from_parts(
                bound_vtable::<I, RefStorage<'a>, P, T>(),
                RefStorage::new(object),
            )
        }
    }

    /// Points the container at `object`, which may be of another type.
    pub fn rebind<T>(&mut self, object: &'a T)
    where
        T: 'static,
        Merged<I, RefStorage<'a>>: Bind<RefStorage<'a>, T>,
    {
        // SAFETY:
        // 1. The storage and the vtable are rebound together for `T`
        let (vtable, storage) = unsafe { self.parts_mut() };
        storage.rebind(object);
        *vtable = bound_vtable::<I, RefStorage<'a>, P, T>();
    }
}

impl<'a, I, P> Any<I, MutRefStorage<'a>, P>
where
    I: Interface,
    P: VTablePolicy,
{
    /// Creates a container exclusively borrowing `object`.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// method! {
    ///     struct Bump: fn(&mut self);
    /// }
    ///
    /// impl CallMut<Bump> for u32 {
    ///     fn call_mut(&mut self, (): ()) {
    ///         *self += 1;
    ///     }
    /// }
    ///
    /// let mut counter = 1u32;
    /// let mut any: AnyMut<'_, interface![Bump]> = Any::from_mut(&mut counter);
    /// any.call_mut::<Bump, _>(());
    /// drop(any);
    /// assert_eq!(counter, 2);
    /// ```
    #[must_use]
    pub fn from_mut<T>(object: &'a mut T) -> Self
    where
        T: 'static,
        Merged<I, MutRefStorage<'a>>: Bind<MutRefStorage<'a>, T>,
    {
        // SAFETY:
        // 1. The vtable is bound and the storage refers to an object
        // 2. The vtable is bound for `T`, the type of the referent
        unsafe {
            Self::from_parts(
                bound_vtable::<I, MutRefStorage<'a>, P, T>(),
                MutRefStorage::new(object),
            )
        }
    }

    /// Points the container at `object`, which may be of another type.
    pub fn rebind<T>(&mut self, object: &'a mut T)
    where
        T: 'static,
        Merged<I, MutRefStorage<'a>>: Bind<MutRefStorage<'a>, T>,
    {
        // SAFETY:
        // 1. The storage and the vtable are rebound together for `T`
        let (vtable, storage) = unsafe { self.parts_mut() };
        storage.rebind(object);
        *vtable = bound_vtable::<I, MutRefStorage<'a>, P, T>();
    }
}

#[cfg(test)]
mod tests {
    use erasure_internals::interface::{Call, CallMut};

    use crate::{AnyMut, AnyRef, interface, method};

    method! {
        struct Get: fn(&self) -> u64;
        struct Set: fn(&mut self, u64);
    }

    impl Call<Get> for u64 {
        fn call(&self, (): ()) -> u64 {
            *self
        }
    }

    impl Call<Get> for u8 {
        fn call(&self, (): ()) -> u64 {
            u64::from(*self)
        }
    }

    impl CallMut<Set> for u64 {
        fn call_mut(&mut self, (value,): (u64,)) {
            *self = value;
        }
    }

    impl CallMut<Set> for u8 {
        fn call_mut(&mut self, (value,): (u64,)) {
            *self = value as u8;
        }
    }

    #[test]
    fn test_shared_reference_rebind() {
        let wide = 70_000u64;
        let narrow = 7u8;
        let mut any: AnyRef<'_, interface![Get]> = AnyRef::from_ref(&wide);
        let copy = any.clone();
        any.rebind(&narrow);
        assert_eq!(any.call::<Get, _>(()), 7);
        assert_eq!(copy.call::<Get, _>(()), 70_000);
    }

    #[test]
    fn test_mutable_reference_writes_through() {
        let mut wide = 1u64;
        let mut narrow = 1u8;
        {
            let mut any: AnyMut<'_, interface![Get, Set]> = AnyMut::from_mut(&mut wide);
            any.call_mut::<Set, _>((300,));
            assert_eq!(any.call::<Get, _>(()), 300);
            any.rebind(&mut narrow);
            any.call_mut::<Set, _>((9,));
        }
        assert_eq!(wide, 300);
        assert_eq!(narrow, 9);
    }
}
