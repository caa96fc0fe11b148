//! Core type definitions for Lexis.
//!
//! - [`GrammemeSet`] - a combined mask of grammeme bits
//! - [`LanguageCode`] - the fixed-width language field of a dictionary header

mod grammeme;
mod language;

pub use grammeme::GrammemeSet;
pub use language::LanguageCode;
