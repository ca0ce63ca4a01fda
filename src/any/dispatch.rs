use erasure_internals::{
    interface::{Contains, Interface, Method, Mut, Owned, Ref, Right},
    storage::{ConsumableStorage, ExclusiveStorage, Storage},
    vtable::{VTable, VTablePolicy},
};

use super::empty_dispatch;
use crate::Any;

impl<I, S, P> Any<I, S, P>
where
    I: Interface,
    S: Storage,
    P: VTablePolicy,
{
    /// Calls the `&self` method `M` on the held object.
    ///
    /// The second type parameter is the method's position in the interface
    /// and is always left to inference.
    ///
    /// # Panics
    ///
    /// Panics if the container is empty.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// method! {
    ///     struct Double: fn(&self, i32) -> i32;
    /// }
    ///
    /// impl Call<Double> for i32 {
    ///     fn call(&self, (x,): (i32,)) -> i32 {
    ///         2 * x + self
    ///     }
    /// }
    ///
    /// let any: Any<interface![Double]> = Any::new(1);
    /// assert_eq!(any.call::<Double, _>((20,)), 41);
    /// ```
    #[track_caller]
    pub fn call<M, Idx>(&self, args: M::Args) -> M::Output
    where
        M: Method<Receiver = Ref>,
        I: Contains<M, Idx>,
    {
        let Some(thunk) = self.vtable().get::<M, Right<Idx>>() else {
            empty_dispatch()
        };
        // SAFETY:
        // 1. The vtable is bound, so the storage holds the `T` the thunk was
        //    made for, and a shared receiver only reads through the pointer
        unsafe { thunk(self.storage_ptr(), args) }
    }

    /// Calls the `&self` method `M` without checking that the container
    /// holds an object.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. The container is not empty.
    #[track_caller]
    pub unsafe fn call_unchecked<M, Idx>(&self, args: M::Args) -> M::Output
    where
        M: Method<Receiver = Ref>,
        I: Contains<M, Idx>,
    {
        // SAFETY:
        // 1. The container holds an object, as guaranteed by the caller, so
        //    the vtable is bound
        let thunk = unsafe { self.vtable().get_unchecked::<M, Right<Idx>>() };
        // SAFETY:
        // 1. The storage holds the `T` the thunk was made for, and a shared
        //    receiver only reads through the pointer
        unsafe { thunk(self.storage_ptr(), args) }
    }
}

impl<I, S, P> Any<I, S, P>
where
    I: Interface,
    S: ExclusiveStorage,
    P: VTablePolicy,
{
    /// Calls the `&mut self` method `M` on the held object.
    ///
    /// # Panics
    ///
    /// Panics if the container is empty.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// method! {
    ///     struct Push: fn(&mut self, u8);
    /// }
    ///
    /// impl CallMut<Push> for Vec<u8> {
    ///     fn call_mut(&mut self, (byte,): (u8,)) {
    ///         self.push(byte);
    ///     }
    /// }
    ///
    /// let mut any: Any<interface![Push]> = Any::new(Vec::new());
    /// any.call_mut::<Push, _>((1,));
    /// ```
    #[track_caller]
    pub fn call_mut<M, Idx>(&mut self, args: M::Args) -> M::Output
    where
        M: Method<Receiver = Mut>,
        I: Contains<M, Idx>,
    {
        let Some(thunk) = self.vtable().get::<M, Right<Idx>>() else {
            empty_dispatch()
        };
        // SAFETY:
        // 1. The vtable is bound, so the storage holds the `T` the thunk was
        //    made for, and the storage is exclusive, so `&mut self` is the only
        //    access to the object
        unsafe { thunk(self.storage_ptr_mut(), args) }
    }
}

impl<I, S, P> Any<I, S, P>
where
    I: Interface,
    S: ConsumableStorage,
    P: VTablePolicy,
{
    /// Calls the `self` method `M`, moving the held object out of the
    /// container.
    ///
    /// The container's memory is released without dropping the object a
    /// second time, even if the method panics.
    ///
    /// # Panics
    ///
    /// Panics if the container is empty.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// method! {
    ///     struct IntoLen: fn(self) -> usize;
    /// }
    ///
    /// impl CallOnce<IntoLen> for String {
    ///     fn call_once(self, (): ()) -> usize {
    ///         self.len()
    ///     }
    /// }
    ///
    /// let any: Any<interface![IntoLen]> = Any::new(String::from("four"));
    /// assert_eq!(any.call_once::<IntoLen, _>(()), 4);
    /// ```
    #[track_caller]
    pub fn call_once<M, Idx>(mut self, args: M::Args) -> M::Output
    where
        M: Method<Receiver = Owned>,
        I: Contains<M, Idx>,
    {
        let Some(thunk) = self.vtable().get::<M, Right<Idx>>() else {
            empty_dispatch()
        };
        let guard = ReleaseGuard { any: &mut self };
        let target = guard.any.storage_ptr_mut();
        // SAFETY:
        // 1. The vtable is bound, so the storage holds the `T` the thunk was
        //    made for, and `self` is owned, so the object can be moved out
        // 2. The guard releases the storage without dropping the moved object
        unsafe { thunk(target, args) }
    }
}

/// Releases the storage of a container whose object was moved out by an
/// owned-receiver call.
struct ReleaseGuard<'a, I, S, P>
where
    I: Interface,
    S: ConsumableStorage,
    P: VTablePolicy,
{
    /// The container whose object is being consumed.
    any: &'a mut Any<I, S, P>,
}

impl<I, S, P> Drop for ReleaseGuard<'_, I, S, P>
where
    I: Interface,
    S: ConsumableStorage,
    P: VTablePolicy,
{
    fn drop(&mut self) {
        // SAFETY:
        // 1. `release` leaves the vtable empty and the storage holding nothing
        let (vtable, storage) = unsafe { self.any.parts_mut() };
        // SAFETY:
        // 1. The vtable is still bound to the consumed object's type
        // 2. The thunk moved the object out before the guard is dropped
        unsafe {
            S::release::<I, _>(vtable, storage);
        }
    }
}
