//! Commonly used items for convenient importing.
//!
//! The prelude module re-exports the container, its aliases, the method
//! traits and the declaration macros. This allows you to declare an
//! interface, implement it and erase a value with a single use statement.
//!
//! # Usage
//!
//! ```rust
//! use erasure::prelude::*;
//!
//! method! {
//!     pub struct Area: fn(&self) -> f64;
//! }
//!
//! struct Square(f64);
//! struct Circle(f64);
//!
//! impl Call<Area> for Square {
//!     fn call(&self, (): ()) -> f64 {
//!         self.0 * self.0
//!     }
//! }
//!
//! impl Call<Area> for Circle {
//!     fn call(&self, (): ()) -> f64 {
//!         3.0 * self.0 * self.0
//!     }
//! }
//!
//! fn main() {
//!     let shapes: [AnyUnique<interface![Area]>; 2] = [Any::new(Square(2.0)), Any::new(Circle(1.0))];
//!     let total: f64 = shapes.iter().map(|shape| shape.call::<Area, _>(())).sum();
//!     assert_eq!(total, 7.0);
//! }
//! ```
//!
//! # What's Included
//!
//! - **[`Any`]**: The type-erased container
//! - **[`AnyInline`]**, **[`AnyHybrid`]**, **[`AnyUnique`]**, **[`AnyShared`]**,
//!   **[`AnyTrivial`]**, **[`AnyRef`]**, **[`AnyMut`]**: Storage shorthands
//! - **[`Call`]**, **[`CallMut`]**, **[`CallOnce`]**: The traits a concrete type
//!   implements to support a method
//! - **[`method!`]** and **[`interface!`]**: Macros declaring tags and spelling
//!   interfaces

pub use crate::{
    Any, AnyHybrid, AnyInline, AnyMut, AnyRef, AnyShared, AnyTrivial, AnyUnique,
    interface,
    interface::{Call, CallMut, CallOnce},
    method,
};
