//! # Lexis
//!
//! Compact, memory-mapped linguistic dictionaries.
//!
//! A dictionary maps words to their grammemes (part of speech, gender,
//! number and the like), to named properties, and optionally to the
//! inflection patterns that generate their other forms. [`OfflineBuilder`]
//! compiles word lists into a single file; [`Dictionary`] maps that file and
//! answers queries without copying it.
//!
//! ## Quick Start
//!
//! ```rust
//! use lexis::{LexiconEntry, OfflineBuilder};
//!
//! let mut builder = OfflineBuilder::new("es_ES")?;
//! for line in ["gato: masculine singular", "gatos: masculine plural"] {
//!     builder.add_entry(LexiconEntry::parse(line).unwrap())?;
//! }
//! let dict = builder.compile()?;
//!
//! let gato = dict.lookup("gato")?.unwrap();
//! assert_eq!(dict.grammeme_names(gato), ["masculine", "singular"]);
//! assert!(dict.lookup("perro")?.is_none());
//! assert_eq!(dict.prefix_scan("gat").count(), 2);
//! # Ok::<(), lexis::Error>(())
//! ```

// Re-export the main dictionary API
pub use lexis_engine::{
    BuildConfig, BuildSummary, Dictionary, DictionaryStats, Inflection, InflectionPattern,
    InflectionTable, OfflineBuilder, PrefixScan,
};

// Source readers for feeding a builder by hand
pub use lexis_adapters::source::{LexiconEntry, LexiconReader, PatternSource, read_patterns};

// Re-export core types - grammeme masks and errors come back from every query
pub use lexis_common::types::{GrammemeSet, LanguageCode};
pub use lexis_common::utils::error::{Error, Result};

// The building blocks, for callers who pack their own sections
pub use lexis_core::{BitPackedArray, DedupSpanStore, KeyEncoding, StringSet, TrieIndex};
