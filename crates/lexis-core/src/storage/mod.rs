//! Storage primitives for compiled dictionaries.
//!
//! - [`bitpack`] - Fixed-width bit-packed integer arrays
//! - [`bocu1`] - The BOCU-1 compact Unicode codec
//! - [`encoding`] - Key encoding selection (BOCU-1, UTF-8, UTF-16LE)
//! - [`span`] - Deduplicating store of integer runs
//! - [`layout`] - Several small fields packed into one integer
//! - [`strings`] - Sorted string tables and trie-backed string sets
//!
//! # Size Strategies
//!
//! | Data | Structure | Why |
//! |------|-----------|-----|
//! | Per-word data ids | BitPackedArray | width of the largest id, not 64 bits |
//! | Grammeme names | StringArray | few, short, binary-searched |
//! | Property values | StringSet | many, shared prefixes |
//! | Pattern id runs | DedupSpanStore | runs repeat across suffixes |

pub mod bitpack;
pub mod bocu1;
pub mod encoding;
pub mod layout;
pub mod span;
pub mod strings;

// Re-export commonly used types
pub use bitpack::{BitPackedArray, calculate_bit_width};
pub use encoding::{EncodingCost, KeyEncoding};
pub use layout::FieldLayout;
pub use span::DedupSpanStore;
pub use strings::{StringArray, StringSet};
