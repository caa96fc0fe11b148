//! Dictionary language codes.

use std::fmt;

use serde::{Serialize, Serializer};

use crate::utils::error::{CapacityError, Result};

/// Language code stored in a fixed 4-byte, zero-padded header field.
///
/// Only the language subtag of a locale is kept (`es_MX` becomes `es`). At
/// least one trailing zero byte is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LanguageCode([u8; LanguageCode::FIELD_LEN]);

impl LanguageCode {
    /// Width of the header field.
    pub const FIELD_LEN: usize = 4;

    /// Extracts the language subtag of `locale` (split at `_` or `-`).
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::LanguageCodeTooLong`] if the language does not
    /// leave room for the terminating zero.
    pub fn from_locale(locale: &str) -> Result<Self> {
        let language = locale
            .split(['_', '-'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if language.len() >= Self::FIELD_LEN || !language.is_ascii() {
            return Err(CapacityError::LanguageCodeTooLong(language).into());
        }
        let mut field = [0u8; Self::FIELD_LEN];
        field[..language.len()].copy_from_slice(language.as_bytes());
        Ok(Self(field))
    }

    /// Wraps a raw header field.
    #[must_use]
    pub const fn from_field(field: [u8; Self::FIELD_LEN]) -> Self {
        Self(field)
    }

    /// Returns the raw, zero-padded header field.
    #[must_use]
    pub const fn as_field(&self) -> &[u8; Self::FIELD_LEN] {
        &self.0
    }

    /// Returns the language as a string slice, without padding.
    #[must_use]
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(Self::FIELD_LEN);
        std::str::from_utf8(&self.0[..end]).unwrap_or_default()
    }

    /// Lowercases `word` with the casing rules of this language.
    ///
    /// Turkish and Azeri map `I` to dotless `ı` and `İ` to `i`.
    #[must_use]
    pub fn lowercase(&self, word: &str) -> String {
        match self.as_str() {
            "tr" | "az" => {
                let mut out = String::with_capacity(word.len());
                for c in word.chars() {
                    match c {
                        'I' => out.push('ı'),
                        '\u{130}' => out.push('i'),
                        _ => out.extend(c.to_lowercase()),
                    }
                }
                out
            }
            _ => word.to_lowercase(),
        }
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LanguageCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_locale() {
        let code = LanguageCode::from_locale("es_MX").unwrap();
        assert_eq!(code.as_str(), "es");
        assert_eq!(code.as_field(), b"es\0\0");

        let code = LanguageCode::from_locale("yue-Hant").unwrap();
        assert_eq!(code.as_str(), "yue");
    }

    #[test]
    fn test_too_long() {
        assert!(LanguageCode::from_locale("abcd").is_err());
    }

    #[test]
    fn test_lowercase() {
        let es = LanguageCode::from_locale("es").unwrap();
        assert_eq!(es.lowercase("Gato"), "gato");
        assert_eq!(es.lowercase("IRMAK"), "irmak");

        let tr = LanguageCode::from_locale("tr_TR").unwrap();
        assert_eq!(tr.lowercase("IRMAK"), "ırmak");
        assert_eq!(tr.lowercase("\u{130}stanbul"), "istanbul");
    }

    #[test]
    fn test_round_trip_field() {
        let code = LanguageCode::from_field(*b"de\0\0");
        assert_eq!(code.to_string(), "de");
    }
}
