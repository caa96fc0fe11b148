//! Key encodings for trie keys.
//!
//! A trie stores byte strings, so every key set picks one of three codecs
//! before the trie is built. The choice is recorded next to the trie and
//! never changes afterwards.
//!
//! | Encoding | Enum | Good for |
//! |----------|------|----------|
//! | BOCU-1 | 0 | non-Latin small scripts, mixed text |
//! | UTF-8 | 1 | Latin scripts |
//! | UTF-16LE | 2 | CJK-heavy key sets; fastest to decode |

use lexis_common::utils::error::{FormatError, Result};

use super::bocu1;

/// Above this many keys, costs are estimated from a sample.
pub const SAMPLING_SHIFT: u32 = 17;

/// Byte encoding of trie keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum KeyEncoding {
    /// Binary Ordered Compression for Unicode.
    Bocu1 = 0,
    /// UTF-8.
    Utf8 = 1,
    /// UTF-16, little-endian code units.
    Utf16Le = 2,
}

impl KeyEncoding {
    /// Returns a human-readable name for the encoding.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Bocu1 => "BOCU1",
            Self::Utf8 => "UTF8",
            Self::Utf16Le => "UTF16LE",
        }
    }

    /// The value stored in the file.
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Parses the stored enum value.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::UnknownEncoding`] for values other than 0..=2.
    pub fn from_u16(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::Bocu1),
            1 => Ok(Self::Utf8),
            2 => Ok(Self::Utf16Le),
            other => Err(FormatError::UnknownEncoding(other).into()),
        }
    }

    /// Encodes `key`, appending to `out`.
    pub fn encode_into(self, key: &str, out: &mut Vec<u8>) {
        match self {
            Self::Bocu1 => bocu1::encode_into(key, out),
            Self::Utf8 => out.extend_from_slice(key.as_bytes()),
            Self::Utf16Le => {
                for unit in key.encode_utf16() {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }
        }
    }

    /// Encodes `key` into a new buffer.
    #[must_use]
    pub fn encode(self, key: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(key.len());
        self.encode_into(key, &mut out);
        out
    }

    /// Decodes bytes produced by [`Self::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Corrupt`] if the bytes are not a valid encoding.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            Self::Bocu1 => bocu1::decode(bytes),
            Self::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| FormatError::corrupt("UTF-8 key", e.to_string()).into()),
            Self::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(FormatError::corrupt("UTF-16LE key", "odd byte length").into());
                }
                let units = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
                char::decode_utf16(units)
                    .collect::<std::result::Result<String, _>>()
                    .map_err(|e| FormatError::corrupt("UTF-16LE key", e.to_string()).into())
            }
        }
    }

    /// Length of the encoding of `key`.
    #[must_use]
    pub fn encoded_len(self, key: &str) -> usize {
        match self {
            Self::Bocu1 => bocu1::encoded_len(key),
            Self::Utf8 => key.len(),
            Self::Utf16Le => key.encode_utf16().count() * 2,
        }
    }

    /// Picks the encoding with the smallest total size for `keys`.
    ///
    /// Ties go to UTF-16LE, then UTF-8, then BOCU-1.
    pub fn choose<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: ExactSizeIterator,
    {
        EncodingCost::measure(keys).best()
    }
}

/// Measured (or sampled) total key sizes under each encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingCost {
    /// Total BOCU-1 bytes.
    pub bocu1: usize,
    /// Total UTF-8 bytes.
    pub utf8: usize,
    /// Total UTF-16LE bytes.
    pub utf16: usize,
    /// Keys actually measured.
    pub sampled: usize,
}

impl EncodingCost {
    /// Sums key sizes under each encoding.
    ///
    /// With more than 2^17 keys, only every `(n >> 17) + 1`-th key is
    /// measured: `n >> 17` keys are skipped before each measured one.
    pub fn measure<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
        I::IntoIter: ExactSizeIterator,
    {
        let keys = keys.into_iter();
        let skip = keys.len() >> SAMPLING_SHIFT;
        let mut cost = Self::default();
        let mut skipped = 0;

        for key in keys {
            if skip != 0 {
                if skipped < skip {
                    skipped += 1;
                    continue;
                }
                skipped = 0;
            }
            cost.bocu1 += bocu1::encoded_len(key);
            cost.utf8 += key.len();
            cost.utf16 += key.encode_utf16().count() * 2;
            cost.sampled += 1;
        }
        cost
    }

    /// The cheapest encoding, by the tie-break order of [`KeyEncoding::choose`].
    #[must_use]
    pub fn best(&self) -> KeyEncoding {
        let min = self.bocu1.min(self.utf8).min(self.utf16);
        if self.utf16 == min {
            KeyEncoding::Utf16Le
        } else if self.utf8 == min {
            KeyEncoding::Utf8
        } else {
            KeyEncoding::Bocu1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trip() {
        for encoding in [KeyEncoding::Bocu1, KeyEncoding::Utf8, KeyEncoding::Utf16Le] {
            assert_eq!(KeyEncoding::from_u16(encoding.as_u16()).unwrap(), encoding);
        }
        assert!(KeyEncoding::from_u16(3).is_err());
    }

    #[test]
    fn test_latin_prefers_utf8() {
        // ASCII: UTF-8 and BOCU-1 tie at one byte per char, UTF-16 doubles it.
        let keys = ["gato", "gata", "gatos", "perro"];
        let cost = EncodingCost::measure(keys.iter().copied());
        assert_eq!(cost.utf8, cost.bocu1);
        assert_eq!(cost.utf16, 2 * cost.utf8);
        assert_eq!(KeyEncoding::choose(keys.iter().copied()), KeyEncoding::Utf8);
    }

    #[test]
    fn test_cyrillic_prefers_bocu1() {
        let keys = ["кошка", "собака", "молоко", "дом"];
        assert_eq!(KeyEncoding::choose(keys.iter().copied()), KeyEncoding::Bocu1);
    }

    #[test]
    fn test_cjk_prefers_utf16() {
        // Unrelated ideographs defeat BOCU-1's windowing; UTF-8 needs 3 bytes.
        let keys = ["丁", "龜", "丂", "鼎"];
        let cost = EncodingCost::measure(keys.iter().copied());
        assert!(cost.utf16 < cost.utf8);
        assert!(cost.utf16 <= cost.bocu1);
        assert_eq!(cost.best(), KeyEncoding::Utf16Le);
    }

    #[test]
    fn test_tie_break_order() {
        let all_equal = EncodingCost { bocu1: 10, utf8: 10, utf16: 10, sampled: 1 };
        assert_eq!(all_equal.best(), KeyEncoding::Utf16Le);

        let utf8_bocu = EncodingCost { bocu1: 8, utf8: 8, utf16: 10, sampled: 1 };
        assert_eq!(utf8_bocu.best(), KeyEncoding::Utf8);

        let bocu = EncodingCost { bocu1: 7, utf8: 8, utf16: 10, sampled: 1 };
        assert_eq!(bocu.best(), KeyEncoding::Bocu1);
    }

    #[test]
    fn test_sampling_stride() {
        let keys: Vec<String> = (0..(3usize << SAMPLING_SHIFT)).map(|i| format!("k{i}")).collect();
        let cost = EncodingCost::measure(keys.iter().map(String::as_str));
        // skip = 3: one key measured in every four.
        assert_eq!(cost.sampled, keys.len() / 4);
    }

    #[test]
    fn test_no_sampling_at_threshold() {
        let keys: Vec<String> = (0..(1usize << SAMPLING_SHIFT) - 1).map(|i| i.to_string()).collect();
        let cost = EncodingCost::measure(keys.iter().map(String::as_str));
        assert_eq!(cost.sampled, keys.len());
    }

    #[test]
    fn test_round_trip_all_encodings() {
        let keys = ["", "a", "Ñandú", "кошка", "日本語", "𝄞"];
        for encoding in [KeyEncoding::Bocu1, KeyEncoding::Utf8, KeyEncoding::Utf16Le] {
            for key in keys {
                let encoded = encoding.encode(key);
                assert_eq!(encoded.len(), encoding.encoded_len(key));
                assert_eq!(encoding.decode(&encoded).unwrap(), key, "{}", encoding.name());
            }
        }
    }

    #[test]
    fn test_utf16_rejects_odd_length() {
        assert!(KeyEncoding::Utf16Le.decode(&[0x61]).is_err());
        // Lone high surrogate.
        assert!(KeyEncoding::Utf16Le.decode(&[0x00, 0xd8]).is_err());
    }
}
