//! Reading structures out of mapped memory.
//!
//! - [`cursor`] - A forward-only, bounds-checked reader over a shared byte region

pub mod cursor;

pub use cursor::ByteCursor;
