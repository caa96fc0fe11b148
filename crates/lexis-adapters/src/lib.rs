//! # lexis-adapters
//!
//! Adapters layer for Lexis: everything that touches the filesystem or a
//! foreign text format.
//!
//! ## Modules
//!
//! - [`storage`] - Memory-mapped input and atomically replaced output files
//! - [`source`] - Readers for lexicon line files and inflection pattern XML

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod source;
pub mod storage;
