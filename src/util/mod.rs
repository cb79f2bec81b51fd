//! Utility types and functions shared by every loader stage.
//!
//! This module contains fundamental types used throughout the library:
//! - [`ComponentType`] / [`AccessorType`] - Accessor element layout lookups
//! - [`Error`] / [`Result`] - Error handling
//! - Math type re-exports from glam plus [`BBox3f`] and [`Color`]

mod component;
mod error;
mod math;

pub use component::*;
pub use error::*;
pub use math::*;
