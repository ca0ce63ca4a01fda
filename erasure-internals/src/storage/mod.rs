//! Storage strategies: where the erased object's bytes live.
//!
//! Every strategy implements [`Storage`], which fixes its
//! [`StorageCategory`], its inline capacity and the internal methods it adds
//! to the vtable. What a container can do with its value is expressed by the
//! capability traits a storage implements on top of that:
//!
//! | Trait                 | Grants                                           |
//! |-----------------------|--------------------------------------------------|
//! | [`OwningStorage`]     | an empty state, `reset` and `has_value`          |
//! | [`Admits<T>`]         | holding a `T`                                    |
//! | [`ExclusiveStorage`]  | `&mut self` method calls                         |
//! | [`MovableStorage`]    | explicit moves that leave the source empty       |
//! | [`ConsumableStorage`] | `self` method calls                              |
//! | [`CopyableStorage`]   | cloning the container                            |
//!
//! # Placement
//!
//! Whether a `T` is stored inline or out of line is never recorded at runtime.
//! Every strategy evaluates [`creation_is_inline`] for `T` in `init`,
//! `down_cast` and its manage thunk. The predicate is a `const fn` of `T`, so
//! the three always agree.
//!
//! # Lifecycle
//!
//! Storages that own an object add exactly one internal method to the vtable,
//! [`Manage<S>`]. Its thunk is specialized for the held type and serves every
//! lifecycle request, described by an [`Operation`].

use core::{marker::PhantomData, ptr::NonNull};

use crate::{
    interface::{Cons, Here, Interface, Internal, Left, Merge, Method, Nil},
    util::Erased,
    vtable::VTable,
};

mod buffer;
mod hybrid;
mod inline;
mod reference;
mod shared;
mod trivial;

pub use hybrid::HybridStorage;
pub use inline::InlineStorage;
pub use reference::{MutRefStorage, RefStorage};
pub use shared::SharedStorage;
pub use trivial::TrivialStorage;

/// Inline capacity of the default storages, in bytes.
pub const DEFAULT_INLINE_SIZE: usize = 2 * size_of::<usize>();

/// Inline alignment of the default storages, in bytes.
pub const DEFAULT_INLINE_ALIGN: usize = align_of::<usize>();

/// The effective interface of a container: the storage's internal methods
/// followed by the user interface `I`.
pub type Merged<I, S> = Merge<<S as Storage>::Interface, I>;

/// The kinds of storage, deciding which container operations exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageCategory {
    /// Bitwise copyable and movable. No lifecycle thunk is needed.
    Trivial,
    /// Movable, not copyable.
    MoveOnly,
    /// Copyable and movable. Copies share the object.
    Copyable,
    /// Neither copyable nor movable by the container.
    Immovable,
    /// A non-owning handle to a borrowed object.
    Reference,
}

/// Returns whether `S` stores a `T` in its own bytes rather than out of line.
#[inline]
pub const fn creation_is_inline<S: Storage, T>() -> bool {
    size_of::<T>() <= S::INLINE_SIZE && align_of::<T>() <= S::INLINE_ALIGN
}

/// Returns whether storing a `T` in `S` can fail.
///
/// Only out-of-line placement through a fallible allocator can fail.
#[inline]
pub const fn creation_is_fallible<S: Storage, T>() -> bool {
    S::FALLIBLE && !creation_is_inline::<S, T>()
}

/// A storage strategy.
///
/// A storage value holds zero or one object. It does not know by itself
/// whether it holds one, nor of which type: that is what the vtable next to
/// it records. Every operation that touches the object therefore takes the
/// vtable, or is `unsafe` and relies on the caller to pair them correctly.
///
/// # Safety
///
/// Implementors must guarantee that:
///
/// 1. After [`Admits::init`] for a `T` succeeds, [`down_cast::<T>`] returns a
///    pointer to that `T` for as long as the storage is not moved by a
///    container operation and the object is not destroyed.
/// 2. [`manage::<T>`] correctly performs every [`Operation`] the storage's
///    other methods request for a storage that holds a `T`.
/// 3. [`INLINE_SIZE`] and [`INLINE_ALIGN`] describe bytes the storage really
///    has, so that any type satisfying [`creation_is_inline`] fits.
///
/// [`down_cast::<T>`]: Self::down_cast
/// [`manage::<T>`]: Self::manage
/// [`INLINE_SIZE`]: Self::INLINE_SIZE
/// [`INLINE_ALIGN`]: Self::INLINE_ALIGN
pub unsafe trait Storage: Sized {
    /// The internal methods this storage adds to the vtable.
    type Interface: Interface;

    /// The error reported when creating an object fails.
    type Error;

    /// The category of the storage.
    const CATEGORY: StorageCategory;

    /// The number of bytes available for inline objects.
    const INLINE_SIZE: usize;

    /// The alignment available for inline objects.
    const INLINE_ALIGN: usize;

    /// Whether creating an out-of-line object can fail.
    const FALLIBLE: bool;

    /// Returns [`CATEGORY`](Self::CATEGORY).
    #[inline]
    fn storage_category() -> StorageCategory {
        Self::CATEGORY
    }

    /// Returns whether a `T` would be stored inline.
    #[inline]
    fn creation_is_inline<T>() -> bool {
        creation_is_inline::<Self, T>()
    }

    /// Returns whether creating a `T` can fail.
    #[inline]
    fn creation_is_fallible<T>() -> bool {
        creation_is_fallible::<Self, T>()
    }

    /// Returns a pointer to the `T` held by the storage at `this`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `this` points to a live storage that currently holds a `T`.
    unsafe fn down_cast<T: 'static>(this: NonNull<Self>) -> NonNull<T>;

    /// Destroys the held object, if any, and clears `vtable`.
    ///
    /// `vtable` is cleared before the object is dropped. If that `Drop`
    /// panics, the object and any block it owned are leaked, never dropped
    /// again.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. If `vtable` is bound to a `T`, `this` holds a live `T`.
    unsafe fn destroy<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, this: &mut Self);

    /// Performs `operation` on a storage holding a `T`.
    ///
    /// This is the thunk of the [`Manage`] method. Storages that do not add
    /// that method keep the default, which does nothing.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `target` points to a live storage of type `Self`.
    /// 2. The preconditions of `operation` documented on [`Operation`] hold.
    #[inline]
    unsafe fn manage<T: 'static>(target: NonNull<Erased>, operation: Operation) {
        let _ = (target, operation);
    }
}

/// A storage that owns its object and can be empty.
pub trait OwningStorage: Storage {
    /// Returns a storage holding no object.
    fn new() -> Self;
}

/// A storage able to hold a `T`.
///
/// # Safety
///
/// Implementors must guarantee that a successful [`init`](Self::init) leaves a
/// `T` that [`Storage::down_cast`] finds.
pub unsafe trait Admits<T: 'static>: OwningStorage {
    /// Constructs the object returned by `f` in the storage.
    ///
    /// On failure `f` is not called and the storage is left as it was. The
    /// storage must not hold an object already; if it does, that object is
    /// leaked.
    fn init<F: FnOnce() -> T>(&mut self, f: F) -> Result<(), Self::Error>;

    /// Returns a new storage holding the object returned by `f`.
    #[inline]
    fn create<F: FnOnce() -> T>(f: F) -> Result<Self, Self::Error> {
        let mut this = Self::new();
        this.init(f)?;
        Ok(this)
    }
}

/// A storage whose object is reachable only through its owner, allowing
/// `&mut self` methods.
pub trait ExclusiveStorage: Storage {}

/// A storage whose object can be moved to another storage, leaving the
/// source empty.
pub trait MovableStorage: OwningStorage {
    /// Moves the object described by `source_vtable` from `source` into
    /// `dest`, then clears `source_vtable`. Does nothing if `source_vtable` is
    /// empty.
    ///
    /// The caller binds the destination vtable.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. If `source_vtable` is bound to a `T`, `source` holds a live `T`.
    /// 2. `dest` holds no object.
    unsafe fn move_construct<I: Interface, V: VTable<Merged<I, Self>>>(
        source_vtable: &mut V,
        dest: &mut Self,
        source: &mut Self,
    );

    /// Destroys the object in `dest`, then moves the object of `source` into
    /// it. Afterwards `dest_vtable` describes `dest` and `source_vtable` is
    /// empty.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Each vtable describes the object held by its storage.
    #[inline]
    unsafe fn move_assign<I: Interface, V: VTable<Merged<I, Self>>>(
        dest_vtable: &mut V,
        dest: &mut Self,
        source_vtable: &mut V,
        source: &mut Self,
    ) {
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe {
            Self::destroy::<I, V>(dest_vtable, dest);
        }
        *dest_vtable = *source_vtable;
        // SAFETY:
        // 1. Guaranteed by the caller
        // 2. `dest` was destroyed just above
        unsafe {
            Self::move_construct::<I, V>(source_vtable, dest, source);
        }
    }
}

/// A storage whose object can be moved out by a `self` method.
pub trait ConsumableStorage: MovableStorage + ExclusiveStorage {
    /// Frees the memory of an object that was already moved out, without
    /// dropping it, then clears `vtable`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. `vtable` is bound to the type `T` the storage held.
    /// 2. The `T` was moved out and must not be dropped again.
    unsafe fn release<I: Interface, V: VTable<Merged<I, Self>>>(vtable: &mut V, this: &mut Self);
}

/// A storage that can be duplicated.
pub trait CopyableStorage: Storage {
    /// Returns a storage holding a copy of, or a share in, the object of
    /// `source`. The caller copies the vtable alongside it.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. If `vtable` is bound to a `T`, `source` holds a live `T`.
    unsafe fn copy_construct<I: Interface, V: VTable<Merged<I, Self>>>(
        vtable: &V,
        source: &Self,
    ) -> Self;

    /// Destroys the object in `dest`, then makes it a copy of `source`.
    ///
    /// # Safety
    ///
    /// The caller must ensure:
    ///
    /// 1. Each vtable describes the object held by its storage.
    #[inline]
    unsafe fn copy_assign<I: Interface, V: VTable<Merged<I, Self>>>(
        dest_vtable: &mut V,
        dest: &mut Self,
        source_vtable: &V,
        source: &Self,
    ) {
        // SAFETY:
        // 1. Guaranteed by the caller
        let copy = unsafe { Self::copy_construct::<I, V>(source_vtable, source) };
        // SAFETY:
        // 1. Guaranteed by the caller
        unsafe {
            Self::destroy::<I, V>(dest_vtable, dest);
        }
        *dest = copy;
        *dest_vtable = *source_vtable;
    }
}

/// A lifecycle request served by the [`Manage`] thunk.
///
/// The thunk is always called on the target storage, for the type `T` it was
/// bound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Drop the `T` held by the target and free its memory.
    ///
    /// Requires the target to hold a live `T`.
    Destroy,
    /// Move the `T` held by the given source storage into the target,
    /// leaving the source empty.
    ///
    /// Requires the source to hold a live `T` and the target to hold nothing.
    Move(NonNull<Erased>),
    /// Make the target hold a copy of, or a share in, the `T` held by the
    /// given source storage.
    ///
    /// Requires the source to hold a live `T` and the target to hold nothing.
    Clone(NonNull<Erased>),
    /// Free the memory of a `T` that was moved out of the target, without
    /// dropping it.
    ///
    /// Requires the target to hold the remains of a `T`.
    Release,
}

/// The internal lifecycle method a storage `S` adds to the vtable.
pub struct Manage<S>(PhantomData<fn() -> S>);

impl<S: 'static> Method for Manage<S> {
    type Receiver = Internal;
    type Args = Operation;
    type Output = ();
}

/// The internal interface of storages that need a lifecycle thunk.
pub type ManagedInterface<S> = Cons<Manage<S>, Nil>;

/// Looks up the manage thunk of a storage with a [`ManagedInterface`].
#[inline]
fn manage_fn<S, I, V>(vtable: &V) -> Option<unsafe fn(NonNull<Erased>, Operation)>
where
    S: Storage<Interface = ManagedInterface<S>> + 'static,
    I: Interface,
    V: VTable<Merged<I, S>>,
{
    vtable.get::<Manage<S>, Left<Here>>()
}

/// [`Storage::destroy`] for storages with a [`ManagedInterface`].
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. If `vtable` is bound to a `T`, `this` holds a live `T`.
#[inline]
unsafe fn managed_destroy<S, I, V>(vtable: &mut V, this: &mut S)
where
    S: Storage<Interface = ManagedInterface<S>> + 'static,
    I: Interface,
    V: VTable<Merged<I, S>>,
{
    if let Some(manage) = manage_fn::<S, I, V>(vtable) {
        // Cleared before the drop, so an unwinding `Drop` leaves it empty.
        vtable.reset();
        // SAFETY:
        // 1. `this` is a live `S`
        // 2. The vtable was bound, so `this` holds the matching `T`, as
        //    guaranteed by the caller
        unsafe {
            manage(NonNull::from(this).cast::<Erased>(), Operation::Destroy);
        }
    }
}

/// [`MovableStorage::move_construct`] for storages with a
/// [`ManagedInterface`].
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. If `source_vtable` is bound to a `T`, `source` holds a live `T`.
/// 2. `dest` holds no object.
#[inline]
unsafe fn managed_move<S, I, V>(source_vtable: &mut V, dest: &mut S, source: &mut S)
where
    S: Storage<Interface = ManagedInterface<S>> + 'static,
    I: Interface,
    V: VTable<Merged<I, S>>,
{
    if let Some(manage) = manage_fn::<S, I, V>(source_vtable) {
        let source = NonNull::from(source).cast::<Erased>();
        // SAFETY:
        // 1. `dest` is a live `S`
        // 2. `source` holds the matching `T` and `dest` holds nothing, as
        //    guaranteed by the caller
        unsafe {
            manage(NonNull::from(dest).cast::<Erased>(), Operation::Move(source));
        }
        source_vtable.reset();
    }
}

/// [`ConsumableStorage::release`] for storages with a [`ManagedInterface`].
///
/// # Safety
///
/// The caller must ensure:
///
/// 1. `vtable` is bound to the type `T` the storage held.
/// 2. The `T` was moved out and must not be dropped again.
#[inline]
unsafe fn managed_release<S, I, V>(vtable: &mut V, this: &mut S)
where
    S: Storage<Interface = ManagedInterface<S>> + 'static,
    I: Interface,
    V: VTable<Merged<I, S>>,
{
    if let Some(manage) = manage_fn::<S, I, V>(vtable) {
        vtable.reset();
        // SAFETY:
        // 1. `this` is a live `S`
        // 2. It holds the remains of the matching `T`, as guaranteed by the
        //    caller
        unsafe {
            manage(NonNull::from(this).cast::<Erased>(), Operation::Release);
        }
    }
}

/// Emits a trace event for an out-of-line object.
#[inline]
#[cfg(feature = "tracing")]
fn trace_heap<T>(action: &'static str) {
    tracing::trace!(
        action = action,
        type_name = core::any::type_name::<T>(),
        size = size_of::<T>(),
        align = align_of::<T>(),
        "erased object"
    );
}

/// Emits a trace event for an out-of-line object.
#[inline]
#[cfg(not(feature = "tracing"))]
fn trace_heap<T>(action: &'static str) {
    let _ = action;
}

mod sealed {
    /// Restricts [`HybridCategory`](super::HybridCategory) to the markers in
    /// this module.
    pub trait Sealed {}
}

/// The category markers accepted by [`HybridStorage`].
pub trait HybridCategory: sealed::Sealed + 'static {
    /// The category of a hybrid storage using this marker.
    const CATEGORY: StorageCategory;
}

/// Marks a storage whose object can be moved but not copied.
#[derive(Debug)]
pub enum MoveOnly {}

/// Marks a storage whose object stays where it was created.
#[derive(Debug)]
pub enum Immovable {}

impl sealed::Sealed for MoveOnly {}
impl sealed::Sealed for Immovable {}

impl HybridCategory for MoveOnly {
    const CATEGORY: StorageCategory = StorageCategory::MoveOnly;
}

impl HybridCategory for Immovable {
    const CATEGORY: StorageCategory = StorageCategory::Immovable;
}
