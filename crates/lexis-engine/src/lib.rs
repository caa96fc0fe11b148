//! # lexis-engine
//!
//! The main entry point for Lexis: building dictionaries from source data
//! and querying compiled dictionaries.
//!
//! ## Modules
//!
//! - [`builder`] - OfflineBuilder: lexicon and pattern ingestion, section packing
//! - [`dictionary`] - Dictionary: memory-mapped runtime lookups
//! - [`inflection`] - Inflection pattern table and decoded patterns
//! - [`config`] - Build configuration
//! - [`format`] - File header and raw sections

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod builder;
pub mod config;
pub mod dictionary;
pub mod format;
pub mod inflection;

pub use builder::{BuildSummary, OfflineBuilder};
pub use config::BuildConfig;
pub use dictionary::{Dictionary, DictionaryStats, PrefixScan};
pub use inflection::{Inflection, InflectionPattern, InflectionTable};
