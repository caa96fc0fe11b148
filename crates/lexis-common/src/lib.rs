//! # lexis-common
//!
//! Foundation layer for Lexis: types, byte cursors, and utilities.
//!
//! This crate provides the building blocks used by all other Lexis crates.
//! It has no internal dependencies and should be kept minimal.
//!
//! ## Modules
//!
//! - [`types`] - Core type definitions (GrammemeSet, LanguageCode)
//! - [`memory`] - Bounds-checked cursors over mapped byte regions
//! - [`utils`] - Utility functions and helpers (hashing, errors, interning)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod memory;
pub mod types;
pub mod utils;

// Re-export commonly used types at crate root
pub use memory::ByteCursor;
pub use types::{GrammemeSet, LanguageCode};
pub use utils::error::{Error, Result};
