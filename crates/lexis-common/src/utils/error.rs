//! Error types for Lexis.
//!
//! Errors fall into four groups that callers handle differently:
//!
//! - [`SourceError`] - the raw lexicon or pattern data is malformed
//! - [`CapacityError`] - the data does not fit the packed layout
//! - [`FormatError`] - a compiled dictionary cannot be read
//! - I/O and internal errors
//!
//! A lookup miss is never an error; lookups return `Ok(None)`.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Lexis operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for Lexis.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed builder input.
    #[error("malformed source: {0}")]
    Source(#[from] SourceError),

    /// A value or field exceeded what the packed layout can hold.
    #[error("capacity exceeded: {0}")]
    Capacity(#[from] CapacityError),

    /// The compiled dictionary is unreadable.
    #[error("unsupported format: {0}")]
    Format(#[from] FormatError),

    /// Index past the end of a packed array or table.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the container.
        len: usize,
    },

    /// Builder options that cannot be combined.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violated.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Problems with lexicon or inflection pattern source files.
#[derive(Error, Debug)]
pub enum SourceError {
    /// A lexicon line has no `": "` between word and annotations.
    #[error("{path}:{line}: missing ': ' delimiter")]
    MissingDelimiter {
        /// Source file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
    },

    /// The lexicon ended without a `====` line.
    #[error("{path}: missing '====' end marker")]
    MissingEndMarker {
        /// Source file.
        path: PathBuf,
    },

    /// The source is a git LFS pointer, not the data itself.
    #[error("{path}: malformed file for language {locale}, is this a git LFS pointer?")]
    LfsPointer {
        /// Source file.
        path: PathBuf,
        /// Locale being built.
        locale: String,
    },

    /// Two inflection patterns share a name.
    #[error("pattern name {0} is not unique")]
    DuplicatePattern(String),

    /// A grammeme referenced by an inflection pattern is not in the lexicon.
    #[error("grammeme {0} is not defined in the lexicon")]
    UnknownGrammeme(String),

    /// A word's `inflection` property names a pattern that does not exist.
    #[error("word {word} references unknown inflection pattern {pattern}")]
    UnknownPattern {
        /// The word carrying the property.
        word: String,
        /// The missing pattern identifier.
        pattern: String,
    },

    /// The pattern XML is not shaped as expected.
    #[error("{path}: {message}")]
    Xml {
        /// Source file.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },
}

/// Build-time overflows of the packed layout.
#[derive(Error, Debug)]
pub enum CapacityError {
    /// More than 63 distinct grammemes.
    #[error("too many grammemes for {locale}: cannot assign a bit to {grammeme}")]
    TooManyGrammemes {
        /// Locale being built.
        locale: String,
        /// The grammeme that did not fit.
        grammeme: String,
    },

    /// More than 255 values for one property of one word.
    #[error("too many values ({count}) for property {property} of {word} in {locale}")]
    TooManyPropertyValues {
        /// Locale being built.
        locale: String,
        /// The word.
        word: String,
        /// The property name.
        property: String,
        /// Number of values seen.
        count: usize,
    },

    /// Packed fields need more bits than the container word provides.
    #[error("{field} needs {bits} bits, limit is {limit}")]
    FieldOverflow {
        /// Which packed field.
        field: &'static str,
        /// Bits required.
        bits: u32,
        /// Bits available.
        limit: u32,
    },

    /// A value does not fit the bit width of its array.
    #[error("value {value} does not fit in {width} bits")]
    ValueTooWide {
        /// The value.
        value: u64,
        /// The array's width.
        width: u8,
    },

    /// A string exceeds the table's length field.
    #[error("string of {len} bytes exceeds the {limit}-byte limit")]
    StringTooLong {
        /// Byte length.
        len: usize,
        /// Maximum byte length.
        limit: usize,
    },

    /// The language code does not fit the header field.
    #[error("language code {0:?} is too long for serialization")]
    LanguageCodeTooLong(String),

    /// A count exceeds the width of its header field.
    #[error("{field} count {count} exceeds the header field")]
    CountOverflow {
        /// Which count.
        field: &'static str,
        /// The count.
        count: usize,
    },
}

/// Read-time violations of the dictionary file format.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The file does not start with the magic marker.
    #[error("invalid header")]
    BadMagic,

    /// Version mismatch.
    #[error("{section} version {found} is incompatible, expected {expected}")]
    UnsupportedVersion {
        /// Which section.
        section: &'static str,
        /// Version in the file.
        found: i32,
        /// Version this build reads.
        expected: i32,
    },

    /// The file was written on a host with a different byte order.
    #[error("built for a different architecture (endianness marker {0:#010x})")]
    EndiannessMismatch(i32),

    /// A read ran past the end of the mapped region.
    #[error("truncated: need {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Cursor position of the read.
        offset: usize,
        /// Bytes requested.
        needed: usize,
        /// Bytes left.
        available: usize,
    },

    /// Unknown key encoding enumeration value.
    #[error("unknown key encoding {0}")]
    UnknownEncoding(u16),

    /// A section is internally inconsistent.
    #[error("corrupt {section}: {message}")]
    Corrupt {
        /// Which section.
        section: &'static str,
        /// What is wrong.
        message: String,
    },
}

impl FormatError {
    /// Shorthand for a [`FormatError::Corrupt`].
    pub fn corrupt(section: &'static str, message: impl Into<String>) -> Self {
        Self::Corrupt {
            section,
            message: message.into(),
        }
    }
}
