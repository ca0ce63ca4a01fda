use erasure_internals::{
    interface::{Bind, Interface},
    storage::{
        Admits, CopyableStorage, Merged, MovableStorage, OwningStorage, creation_is_fallible,
    },
    vtable::{VTable, VTablePolicy},
};

use super::{bound_vtable, empty_vtable};
use crate::Any;

/// Constructors and state of containers that own their object.
impl<I, S, P> Any<I, S, P>
where
    I: Interface,
    S: OwningStorage,
    P: VTablePolicy,
{
    /// Creates an empty container.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// let any: Any<interface![]> = Any::empty();
    /// assert!(!any.has_value());
    /// ```
    #[must_use]
    pub fn empty() -> Self {
        // SAFETY:
        // 1. The vtable is empty and the storage holds nothing
        // 2. The vtable is not bound
        unsafe { Self::from_parts(empty_vtable::<I, S, P>(), S::new()) }
    }

    /// Returns whether the container holds an object.
    #[must_use]
    pub fn has_value(&self) -> bool {
        !self.vtable().is_empty()
    }

    /// Destroys the held object, if any, leaving the container empty.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// let mut any: Any<interface![]> = Any::new(String::from("dropped"));
    /// any.reset();
    /// assert!(!any.has_value());
    /// ```
    pub fn reset(&mut self) {
        // SAFETY:
        // 1. `destroy` leaves the vtable empty and the storage holding nothing
        let (vtable, storage) = unsafe { self.parts_mut() };
        // SAFETY:
        // 1. The vtable describes the storage, by the invariants of `Any`
        unsafe {
            S::destroy::<I, _>(vtable, storage);
        }
    }

    /// Creates a container holding `value`.
    ///
    /// This is only available when storing a `T` cannot fail; it is rejected
    /// at compile time otherwise. Use [`Any::create`] for fallible storages.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// let any: Any<interface![]> = Any::new([0u64; 8]);
    /// assert!(any.has_value());
    /// ```
    #[must_use]
    pub fn new<T>(value: T) -> Self
    where
        T: 'static,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        Self::new_with(|| value)
    }

    /// Creates a container holding the value returned by `f`.
    ///
    /// The value is constructed directly in the storage where possible.
    #[must_use]
    pub fn new_with<T, F>(f: F) -> Self
    where
        T: 'static,
        F: FnOnce() -> T,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        const {
            assert!(
                !creation_is_fallible::<S, T>(),
                "storing this type can fail, use `Any::create` instead"
            );
        }
        match Self::create_with(f) {
            Ok(this) => this,
            Err(_) => unreachable!("infallible creation failed"),
        }
    }

    /// Creates a container holding `value`, reporting allocation failure.
    ///
    /// On failure `value` is dropped.
    pub fn create<T>(value: T) -> Result<Self, S::Error>
    where
        T: 'static,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        Self::create_with(|| value)
    }

    /// Creates a container holding the value returned by `f`, reporting
    /// allocation failure.
    ///
    /// On failure `f` is never called.
    pub fn create_with<T, F>(f: F) -> Result<Self, S::Error>
    where
        T: 'static,
        F: FnOnce() -> T,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        let storage = S::create(f)?;
        // SAFETY:
        // 1. The vtable is bound and the storage holds an object
        // 2. The vtable is bound for `T`, which `create` stored
        Ok(unsafe { Self::from_parts(bound_vtable::<I, S, P, T>(), storage) })
    }

    /// Replaces the held object, if any, with `value`.
    ///
    /// Like [`Any::new`], this is rejected at compile time when storing a `T`
    /// can fail.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// let mut any: Any<interface![]> = Any::empty();
    /// any.emplace(1u8);
    /// any.emplace("text");
    /// assert!(any.has_value());
    /// ```
    pub fn emplace<T>(&mut self, value: T)
    where
        T: 'static,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        self.emplace_with(|| value);
    }

    /// Replaces the held object, if any, with the value returned by `f`.
    pub fn emplace_with<T, F>(&mut self, f: F)
    where
        T: 'static,
        F: FnOnce() -> T,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        const {
            assert!(
                !creation_is_fallible::<S, T>(),
                "storing this type can fail, use `Any::try_emplace` instead"
            );
        }
        if self.try_emplace_with(f).is_err() {
            unreachable!("infallible creation failed");
        }
    }

    /// Replaces the held object, if any, with `value`, reporting allocation
    /// failure.
    ///
    /// The new object is stored before the old one is destroyed, so on
    /// failure the container is left unchanged.
    pub fn try_emplace<T>(&mut self, value: T) -> Result<(), S::Error>
    where
        T: 'static,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        self.try_emplace_with(|| value)
    }

    /// Replaces the held object, if any, with the value returned by `f`,
    /// reporting allocation failure.
    ///
    /// On failure `f` is never called and the container is left unchanged.
    pub fn try_emplace_with<T, F>(&mut self, f: F) -> Result<(), S::Error>
    where
        T: 'static,
        F: FnOnce() -> T,
        S: Admits<T>,
        Merged<I, S>: Bind<S, T>,
    {
        let replacement = S::create(f)?;
        self.reset();
        // SAFETY:
        // 1. The container is empty, and the vtable and storage are replaced
        //    together by a bound vtable and the storage holding its `T`
        let (vtable, storage) = unsafe { self.parts_mut() };
        *storage = replacement;
        *vtable = bound_vtable::<I, S, P, T>();
        Ok(())
    }
}

impl<I, S, P> Default for Any<I, S, P>
where
    I: Interface,
    S: OwningStorage,
    P: VTablePolicy,
{
    fn default() -> Self {
        Self::empty()
    }
}

/// Explicit moves.
impl<I, S, P> Any<I, S, P>
where
    I: Interface,
    S: MovableStorage,
    P: VTablePolicy,
{
    /// Moves the held object into a new container, leaving `self` empty.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// let mut source: Any<interface![]> = Any::new(vec![1, 2, 3]);
    /// let target = source.take();
    /// assert!(target.has_value());
    /// assert!(!source.has_value());
    /// ```
    #[must_use]
    pub fn take(&mut self) -> Self {
        let mut target = Self::empty();
        target.move_from(self);
        target
    }

    /// Destroys the held object, if any, then moves the object of `source`
    /// into `self`, leaving `source` empty.
    pub fn move_from(&mut self, source: &mut Self) {
        // SAFETY:
        // 1. `move_assign` leaves `self` described by its vtable
        let (dest_vtable, dest) = unsafe { self.parts_mut() };
        // SAFETY:
        // 1. `move_assign` leaves `source` empty, with an empty vtable
        let (source_vtable, source) = unsafe { source.parts_mut() };
        // SAFETY:
        // 1. Each vtable describes its storage, by the invariants of `Any`
        unsafe {
            S::move_assign::<I, _>(dest_vtable, dest, source_vtable, source);
        }
    }
}

impl<I, S, P> Clone for Any<I, S, P>
where
    I: Interface,
    S: CopyableStorage,
    P: VTablePolicy,
{
    fn clone(&self) -> Self {
        // SAFETY:
        // 1. The vtable describes the storage, by the invariants of `Any`
        let storage = unsafe { S::copy_construct::<I, _>(self.vtable(), self.storage()) };
        // SAFETY:
        // 1. The copy holds an object exactly when the source does
        // 2. The copy holds the same type as the source
        unsafe { Self::from_parts(*self.vtable(), storage) }
    }

    fn clone_from(&mut self, source: &Self) {
        // SAFETY:
        // 1. `copy_assign` leaves `self` described by its vtable
        let (dest_vtable, dest) = unsafe { self.parts_mut() };
        // SAFETY:
        // 1. Each vtable describes its storage, by the invariants of `Any`
        unsafe {
            S::copy_assign::<I, _>(dest_vtable, dest, source.vtable(), source.storage());
        }
    }
}

#[cfg(test)]
mod tests {
    use core::cell::Cell;

    use super::*;
    use crate::{
        Any, interface,
        storage::{HybridStorage, InlineStorage, SharedStorage, TrivialStorage},
    };

    std::thread_local! {
        static DROPS: Cell<usize> = const { Cell::new(0) };
    }

    struct Tracked<const N: usize>([u8; N]);

    impl<const N: usize> Drop for Tracked<N> {
        fn drop(&mut self) {
            DROPS.with(|drops| drops.set(drops.get() + 1));
        }
    }

    fn drops() -> usize {
        DROPS.with(Cell::get)
    }

    #[test]
    fn test_empty_and_default() {
        let any: Any<interface![]> = Any::default();
        assert!(!any.has_value());
        let any: Any<interface![], InlineStorage> = Any::empty();
        assert!(!any.has_value());
    }

    #[test]
    fn test_reset_drops_once() {
        let before = drops();
        let mut any: Any<interface![]> = Any::new(Tracked([0; 64]));
        any.reset();
        assert_eq!(drops(), before + 1);
        any.reset();
        drop(any);
        assert_eq!(drops(), before + 1);
    }

    #[test]
    fn test_emplace_destroys_previous() {
        let before = drops();
        let mut any: Any<interface![], InlineStorage<16, 8>> = Any::new(Tracked([0; 4]));
        any.emplace(Tracked([0; 16]));
        assert_eq!(drops(), before + 1);
        any.emplace(5u64);
        assert_eq!(drops(), before + 2);
        assert!(any.has_value());
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let before = drops();
        let mut source: Any<interface![], HybridStorage> = Any::new(Tracked([0; 3]));
        let target = source.take();
        assert!(!source.has_value());
        assert!(target.has_value());
        assert_eq!(drops(), before);
        drop(source);
        assert_eq!(drops(), before);
        drop(target);
        assert_eq!(drops(), before + 1);
    }

    #[test]
    fn test_move_from_replaces() {
        let before = drops();
        let mut dest: Any<interface![]> = Any::new(Tracked([0; 100]));
        let mut source: Any<interface![]> = Any::new(Tracked([0; 1]));
        dest.move_from(&mut source);
        assert_eq!(drops(), before + 1);
        assert!(dest.has_value());
        assert!(!source.has_value());

        let mut empty: Any<interface![]> = Any::empty();
        dest.move_from(&mut empty);
        assert_eq!(drops(), before + 2);
        assert!(!dest.has_value());
    }

    #[test]
    fn test_shared_clones_share() {
        let before = drops();
        let any: Any<interface![], SharedStorage> = Any::new(Tracked([0; 2]));
        let mut copy = any.clone();
        drop(any);
        assert_eq!(drops(), before);

        let mut other: Any<interface![], SharedStorage> = Any::empty();
        other.clone_from(&copy);
        copy.reset();
        assert_eq!(drops(), before);
        drop(other);
        assert_eq!(drops(), before + 1);
    }

    #[test]
    fn test_trivial_clone() {
        let any: Any<interface![], TrivialStorage> = Any::new((1u32, 2u32));
        let copy = any.clone();
        assert!(copy.has_value());
        let empty: Any<interface![], TrivialStorage> = Any::empty();
        assert!(!empty.clone().has_value());
    }
}
