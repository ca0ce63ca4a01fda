//! Internal utility types.

/// Marker type used in place of an erased concrete type.
///
/// A `NonNull<Erased>` is the untyped storage handle every erased thunk
/// receives as its first argument. It points at a storage value, never at the
/// object itself; the object is recovered through
/// [`Storage::down_cast`](crate::storage::Storage::down_cast).
///
/// Using a distinct uninhabited marker (rather than `()` or `u8`) makes the
/// intent clearer in signatures and rules out accidental reads through the
/// erased pointer.
pub enum Erased {}
