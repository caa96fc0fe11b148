//! # lexis-core
//!
//! Core layer for Lexis: packed storage, key encodings, and trie indexes.
//!
//! This crate holds the building blocks of a compiled dictionary. It depends
//! only on `lexis-common`.
//!
//! ## Modules
//!
//! - [`storage`] - Bit-packed arrays, key codecs, span dedup, string tables
//! - [`index`] - Succinct trie abstraction and the key→value trie index

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod index;
pub mod storage;

// Re-export commonly used types
pub use index::{FstTrie, SuccinctTrie, TrieIndex};
pub use storage::{
    BitPackedArray, DedupSpanStore, FieldLayout, KeyEncoding, StringArray, StringSet,
    calculate_bit_width,
};
