//! Utility functions and helpers.
//!
//! - [`error`] - Error taxonomy and the crate-wide `Result`
//! - [`hash`] - Hash map aliases with a fast hasher
//! - [`interner`] - String interning owned by a builder

pub mod error;
pub mod hash;
pub mod interner;

pub use interner::{Interner, Symbol};
