//! File storage for compiled dictionaries.
//!
//! - [`mmap`] - Read a dictionary file as one shared, zero-copy [`bytes::Bytes`]
//! - [`atomic`] - Write a dictionary so readers never see a partial file

pub mod atomic;
pub mod mmap;

pub use atomic::AtomicFile;
pub use mmap::map_file;
