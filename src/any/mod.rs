use core::fmt;

use erasure_internals::{
    interface::{Bind, Interface},
    storage::{self, Merged, Storage, StorageCategory},
    vtable::{VTable, VTablePolicy},
};

mod create;
mod dispatch;
mod reference;

/// The vtable type of an [`Any`].
pub(crate) type VTableOf<I, S, P> = <P as VTablePolicy>::Of<Merged<I, S>>;

/// Returns the empty vtable of an `Any<I, S, P>`.
fn empty_vtable<I, S, P>() -> VTableOf<I, S, P>
where
    I: Interface,
    S: Storage,
    P: VTablePolicy,
{
    <VTableOf<I, S, P> as VTable<Merged<I, S>>>::empty()
}

/// Returns the vtable of an `Any<I, S, P>` bound for `T`.
fn bound_vtable<I, S, P, T>() -> VTableOf<I, S, P>
where
    I: Interface,
    S: Storage,
    P: VTablePolicy,
    Merged<I, S>: Bind<S, T>,
{
    <VTableOf<I, S, P> as VTable<Merged<I, S>>>::create_for::<S, T>()
}

/// Keeps `vtable` and `storage` private to the accessors below, so every
/// write that could break the bound-iff-holding pairing is an `unsafe` call.
///
/// FIXME: fold back into the parent module with `unsafe` fields once those
/// are stable (rust-lang/rust#132922).
mod limit_field_access {
    use core::ptr::NonNull;

    use erasure_internals::{
        Erased,
        interface::Interface,
        storage::Storage,
        vtable::{MaybeInlineVTable, VTablePolicy},
    };

    use super::VTableOf;
    use crate::storage::HybridStorage;

    /// A container holding a value of any type that implements the interface
    /// `I`, with the concrete type erased.
    ///
    /// # Type Parameters
    ///
    /// - **Interface (`I`)**: the methods callable on the held value, usually
    ///   spelled with [`interface!`]
    /// - **Storage (`S`)**: where the value's bytes live, and with it which
    ///   operations the container supports (see [`StorageCategory`])
    ///   - [`HybridStorage`]: in place when small, boxed otherwise (default)
    ///   - [`InlineStorage`]: always in place
    ///   - [`SharedStorage`]: reference counted, copies share the value
    ///   - [`TrivialStorage`]: in place, for `Copy` values
    ///   - [`RefStorage`] / [`MutRefStorage`]: a borrowed value
    /// - **VTable policy (`P`)**: whether the method table is copied into the
    ///   container or referenced from static memory
    ///
    /// # Common Usage
    ///
    /// ```
    /// use erasure::prelude::*;
    ///
    /// method! {
    ///     pub struct Describe: fn(&self) -> String;
    /// }
    ///
    /// impl Call<Describe> for u8 {
    ///     fn call(&self, (): ()) -> String {
    ///         format!("the byte {self}")
    ///     }
    /// }
    ///
    /// impl Call<Describe> for Vec<u8> {
    ///     fn call(&self, (): ()) -> String {
    ///         format!("{} bytes", self.len())
    ///     }
    /// }
    ///
    /// let mut any: Any<interface![Describe]> = Any::new(7u8);
    /// assert_eq!(any.call::<Describe, _>(()), "the byte 7");
    ///
    /// any.emplace(vec![1u8, 2, 3]);
    /// assert_eq!(any.call::<Describe, _>(()), "3 bytes");
    /// ```
    ///
    /// [`interface!`]: crate::interface!
    /// [`StorageCategory`]: crate::storage::StorageCategory
    /// [`InlineStorage`]: crate::storage::InlineStorage
    /// [`SharedStorage`]: crate::storage::SharedStorage
    /// [`TrivialStorage`]: crate::storage::TrivialStorage
    /// [`RefStorage`]: crate::storage::RefStorage
    /// [`MutRefStorage`]: crate::storage::MutRefStorage
    pub struct Any<I, S = HybridStorage, P = MaybeInlineVTable<3>>
    where
        I: Interface,
        S: Storage,
        P: VTablePolicy,
    {
        /// # Safety
        ///
        /// The following safety invariants are guaranteed to be upheld as long
        /// as this struct exists:
        ///
        /// 1. The vtable is empty exactly when `storage` holds no object.
        /// 2. If the vtable was bound for `T` with `create_for::<S, T>`, then
        ///    `storage` holds a live `T`.
        vtable: VTableOf<I, S, P>,
        /// See the safety invariants of `vtable`.
        storage: S,
    }

    impl<I, S, P> Any<I, S, P>
    where
        I: Interface,
        S: Storage,
        P: VTablePolicy,
    {
        /// Creates a new [`Any`] from a vtable and a storage.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. The vtable is empty exactly when `storage` holds no object.
        /// 2. If the vtable was bound for `T`, then `storage` holds a live
        ///    `T`.
        #[must_use]
        pub(crate) unsafe fn from_parts(vtable: VTableOf<I, S, P>, storage: S) -> Self {
            // SAFETY:
            // 1. Guaranteed by the caller
            // 2. Guaranteed by the caller
            Self { vtable, storage }
        }

        /// Returns the vtable.
        #[must_use]
        pub(crate) fn vtable(&self) -> &VTableOf<I, S, P> {
            &self.vtable
        }

        /// Returns the storage.
        #[must_use]
        pub(crate) fn storage(&self) -> &S {
            &self.storage
        }

        /// Returns an untyped pointer to the storage, for shared access to the
        /// object.
        #[must_use]
        pub(crate) fn storage_ptr(&self) -> NonNull<Erased> {
            NonNull::from(&self.storage).cast::<Erased>()
        }

        /// Returns an untyped pointer to the storage, for exclusive access to
        /// the object.
        #[must_use]
        pub(crate) fn storage_ptr_mut(&mut self) -> NonNull<Erased> {
            NonNull::from(&mut self.storage).cast::<Erased>()
        }

        /// Returns mutable references to the vtable and the storage.
        ///
        /// # Safety
        ///
        /// The caller must ensure:
        ///
        /// 1. When the references are released, the vtable again describes
        ///    the storage: empty when it holds nothing, bound for `T` when it
        ///    holds a live `T`.
        #[must_use]
        pub(crate) unsafe fn parts_mut(&mut self) -> (&mut VTableOf<I, S, P>, &mut S) {
            // SAFETY:
            // 1. Guaranteed by the caller
            // 2. Guaranteed by the caller
            (&mut self.vtable, &mut self.storage)
        }
    }
}

pub use limit_field_access::Any;

impl<I, S, P> Any<I, S, P>
where
    I: Interface,
    S: Storage,
    P: VTablePolicy,
{
    /// Returns the category of the storage, which decides the operations the
    /// container supports.
    ///
    /// # Examples
    /// ```
    /// # use erasure::{prelude::*, storage::StorageCategory};
    /// assert_eq!(AnyShared::<interface![]>::storage_category(), StorageCategory::Copyable);
    /// ```
    #[must_use]
    pub fn storage_category() -> StorageCategory {
        S::CATEGORY
    }

    /// Returns whether a `T` would be held in place rather than boxed.
    ///
    /// # Examples
    /// ```
    /// # use erasure::prelude::*;
    /// type Boxing = Any<interface![]>;
    /// assert!(Boxing::creation_is_inline::<u64>());
    /// assert!(!Boxing::creation_is_inline::<[u64; 4]>());
    /// ```
    #[must_use]
    pub const fn creation_is_inline<T>() -> bool {
        storage::creation_is_inline::<S, T>()
    }

    /// Returns whether creating a container holding a `T` can fail.
    ///
    /// When it can, only the `Result`-returning constructors
    /// ([`Any::create`], [`Any::try_emplace`] and their `_with` variants) are
    /// available for `T`.
    #[must_use]
    pub const fn creation_is_fallible<T>() -> bool {
        storage::creation_is_fallible::<S, T>()
    }
}

impl<I, S, P> Drop for Any<I, S, P>
where
    I: Interface,
    S: Storage,
    P: VTablePolicy,
{
    fn drop(&mut self) {
        // SAFETY:
        // 1. `destroy` leaves the vtable empty and the storage holding nothing
        let (vtable, storage) = unsafe { self.parts_mut() };
        // SAFETY:
        // 1. The vtable describes the storage, by the invariants of `Any`
        unsafe {
            S::destroy::<I, _>(vtable, storage);
        }
    }
}

impl<I, S, P> fmt::Debug for Any<I, S, P>
where
    I: Interface,
    S: Storage,
    P: VTablePolicy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Any")
            .field("category", &S::CATEGORY)
            .field("has_value", &!self.vtable().is_empty())
            .finish()
    }
}

/// Panics for a method call on an empty container.
#[cold]
#[track_caller]
fn empty_dispatch() -> ! {
    panic!("called an interface method on an empty `Any`")
}

