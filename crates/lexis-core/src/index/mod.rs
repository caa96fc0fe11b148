//! Trie indexes over encoded keys.
//!
//! - [`trie`] - The [`SuccinctTrie`] capability and its `fst` implementation
//! - [`keyed`] - [`TrieIndex`]: trie + key encoding + bit-packed values
//!
//! The trie maps a byte key to a dense id in `[0, len)`. Everything stored
//! per key lives outside the trie, in arrays indexed by that id.

pub mod keyed;
pub mod trie;

pub use keyed::{TrieIndex, TrieIndexPrefix};
pub use trie::{FstPrefix, FstTrie, SuccinctTrie};
