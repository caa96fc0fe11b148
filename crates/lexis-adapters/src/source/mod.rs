//! Readers for builder input.
//!
//! | Format | Reader | Shape |
//! |--------|--------|-------|
//! | Lexicon lines | [`LexiconReader`] | `word: grammeme ... name=value ...`, ends at `====` |
//! | Inflection patterns | [`read_patterns`] | `<patterns><pattern name=".." words="N">...` |
//!
//! Readers report names as strings. Assigning grammeme bits and ids is the
//! builder's job.

pub mod lexicon;
pub mod patterns;

pub use lexicon::{LexiconEntry, LexiconReader};
pub use patterns::{InflectionSource, PatternSource, parse_patterns, read_patterns};
