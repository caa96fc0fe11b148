//! Dictionary file header and raw integer sections.
//!
//! # File layout
//!
//! | Section | Contents |
//! |---------|----------|
//! | header | magic `LEXISDCT`, version `i32`, endianness marker `i32`, options `i16`, language `[u8; 4]` |
//! | grammemes | `StringArray` of grammeme names; a grammeme's bit is its index |
//! | widths | `u8` × 4: type index, property map offset, property key id, property value count |
//! | words | type count `i32`, word `TrieIndex`, type masks `i64` × count |
//! | data singletons | `BitPackedArray`, empty for the one-stage layout |
//! | properties | names `StringArray`, values `StringSet`, value map `BitPackedArray` |
//! | inflection | present when options bit 1 is set, see [`crate::inflection`] |
//!
//! All integers are in host byte order. The endianness marker is written as
//! `1`; a reader that sees anything else rejects the file.

use std::io::Write;
use std::marker::PhantomData;

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt};
use bytes::Bytes;
use lexis_common::memory::ByteCursor;
use lexis_common::types::LanguageCode;
use lexis_common::utils::error::{CapacityError, FormatError, Result};

/// Magic marker at offset 0.
pub const MAGIC: [u8; 8] = *b"LEXISDCT";

/// Dictionary format version.
pub const VERSION: i32 = 1;

/// Inflection sub-block version.
pub const INFLECTION_VERSION: i32 = 1;

/// Marker that reads back as 1 only on a host with the writer's byte order.
pub const ENDIANNESS_MARKER: i32 = 1;

/// Options bit: an inflection table follows the property sections.
pub const HAS_INFLECTION_TABLE: i16 = 1;

/// Writes a version, endianness marker and options triple.
pub(crate) fn write_version<W: Write>(writer: &mut W, version: i32, options: i16) -> Result<()> {
    writer.write_i32::<NativeEndian>(version)?;
    writer.write_i32::<NativeEndian>(ENDIANNESS_MARKER)?;
    writer.write_i16::<NativeEndian>(options)?;
    Ok(())
}

/// Reads and checks a version triple, returning the options.
pub(crate) fn read_version(cursor: &mut ByteCursor, section: &'static str, expected: i32) -> Result<i16> {
    let version = cursor.read_i32()?;
    let endianness = cursor.read_i32()?;
    if endianness != ENDIANNESS_MARKER {
        return Err(FormatError::EndiannessMismatch(endianness).into());
    }
    if version != expected {
        return Err(FormatError::UnsupportedVersion {
            section,
            found: version,
            expected,
        }
        .into());
    }
    Ok(cursor.read_i16()?)
}

/// Writes a count as the `i32` the format stores.
pub(crate) fn write_count<W: Write>(writer: &mut W, field: &'static str, count: usize) -> Result<()> {
    let count = i32::try_from(count).map_err(|_| CapacityError::CountOverflow { field, count })?;
    writer.write_i32::<NativeEndian>(count)?;
    Ok(())
}

/// The fixed-size header at the start of every dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// Option bits.
    pub options: i16,
    /// Language the dictionary was built for.
    pub language: LanguageCode,
}

impl FileHeader {
    /// Serialized size in bytes.
    pub const LEN: usize = MAGIC.len() + 4 + 4 + 2 + LanguageCode::FIELD_LEN;

    /// Creates a header.
    #[must_use]
    pub fn new(language: LanguageCode, has_inflection_table: bool) -> Self {
        let options = if has_inflection_table {
            HAS_INFLECTION_TABLE
        } else {
            0
        };
        Self { options, language }
    }

    /// Returns true if the options announce an inflection table.
    #[must_use]
    pub fn has_inflection_table(&self) -> bool {
        self.options & HAS_INFLECTION_TABLE != 0
    }

    /// Writes the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&MAGIC)?;
        write_version(writer, VERSION, self.options)?;
        writer.write_all(self.language.as_field())?;
        Ok(())
    }

    /// Reads and validates the header.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::BadMagic`], [`FormatError::EndiannessMismatch`]
    /// or [`FormatError::UnsupportedVersion`] for a foreign file.
    pub fn read(cursor: &mut ByteCursor) -> Result<Self> {
        let magic: [u8; 8] = cursor.read_array().map_err(|_| FormatError::BadMagic)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic.into());
        }
        let options = read_version(cursor, "dictionary", VERSION)?;
        let language = LanguageCode::from_field(cursor.read_array()?);
        Ok(Self { options, language })
    }
}

/// A fixed-width integer stored raw in host order.
pub trait RawInt: Copy {
    /// Bytes per value.
    const SIZE: usize;

    /// Decodes one value from exactly [`Self::SIZE`] bytes.
    fn decode(bytes: &[u8]) -> Self;

    /// Appends the value's bytes.
    fn encode(self, out: &mut Vec<u8>);
}

impl RawInt for i64 {
    const SIZE: usize = 8;

    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_i64(bytes)
    }

    fn encode(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

impl RawInt for i32 {
    const SIZE: usize = 4;

    fn decode(bytes: &[u8]) -> Self {
        NativeEndian::read_i32(bytes)
    }

    fn encode(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_ne_bytes());
    }
}

/// Unpacked integer array viewed over mapped bytes.
///
/// The element count is stored elsewhere in the file, so neither reading nor
/// writing touches it.
#[derive(Debug, Clone)]
pub struct RawArray<T> {
    bytes: Bytes,
    _marker: PhantomData<T>,
}

impl<T: RawInt> RawArray<T> {
    /// Copies `values` into a new array.
    #[must_use]
    pub fn from_values(values: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * T::SIZE);
        for &value in values {
            value.encode(&mut bytes);
        }
        Self {
            bytes: Bytes::from(bytes),
            _marker: PhantomData,
        }
    }

    /// Takes `count` values at the cursor, sharing the cursor's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FormatError::Truncated`] if the region is too short.
    pub fn read(cursor: &mut ByteCursor, count: usize) -> Result<Self> {
        let len = count.checked_mul(T::SIZE).ok_or(FormatError::Truncated {
            offset: cursor.position(),
            needed: usize::MAX,
            available: cursor.remaining(),
        })?;
        Ok(Self {
            bytes: cursor.read_bytes(len)?,
            _marker: PhantomData,
        })
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len() / T::SIZE
    }

    /// Returns true if the array is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Value at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        let start = index.checked_mul(T::SIZE)?;
        let bytes = self.bytes.get(start..start + T::SIZE)?;
        Some(T::decode(bytes))
    }

    /// All values in order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.bytes.chunks_exact(T::SIZE).map(T::decode)
    }

    /// Writes the values.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.bytes)?;
        Ok(())
    }
}

impl<T> Default for RawArray<T> {
    fn default() -> Self {
        Self {
            bytes: Bytes::new(),
            _marker: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_common::Error;

    fn header_bytes(header: FileHeader) -> Vec<u8> {
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn test_header_round_trip() {
        let header = FileHeader::new(LanguageCode::from_locale("es_ES").unwrap(), true);
        let buf = header_bytes(header);
        assert_eq!(buf.len(), FileHeader::LEN);
        assert_eq!(&buf[..8], b"LEXISDCT");

        let mut cursor = ByteCursor::new(Bytes::from(buf));
        let loaded = FileHeader::read(&mut cursor).unwrap();
        assert_eq!(loaded, header);
        assert!(loaded.has_inflection_table());
        assert_eq!(loaded.language.as_str(), "es");
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = header_bytes(FileHeader::new(LanguageCode::from_locale("es").unwrap(), false));
        buf[0] = b'X';
        let err = FileHeader::read(&mut ByteCursor::new(Bytes::from(buf))).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::BadMagic)));

        let err = FileHeader::read(&mut ByteCursor::new(Bytes::from_static(b"LEX"))).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::BadMagic)));
    }

    #[test]
    fn test_endianness_mismatch() {
        let mut buf = header_bytes(FileHeader::new(LanguageCode::from_locale("es").unwrap(), false));
        buf[12..16].copy_from_slice(&ENDIANNESS_MARKER.swap_bytes().to_ne_bytes());
        let err = FileHeader::read(&mut ByteCursor::new(Bytes::from(buf))).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::EndiannessMismatch(_))));
    }

    #[test]
    fn test_version_mismatch() {
        let mut buf = header_bytes(FileHeader::new(LanguageCode::from_locale("es").unwrap(), false));
        buf[8..12].copy_from_slice(&2i32.to_ne_bytes());
        let err = FileHeader::read(&mut ByteCursor::new(Bytes::from(buf))).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::UnsupportedVersion { found: 2, expected: 1, .. })
        ));
    }

    #[test]
    fn test_raw_array() {
        let masks = RawArray::from_values(&[0i64, 5, -1, i64::MAX]);
        assert_eq!(masks.len(), 4);
        assert_eq!(masks.get(2), Some(-1));
        assert_eq!(masks.get(4), None);

        let mut buf = Vec::new();
        masks.write_to(&mut buf).unwrap();
        let mut cursor = ByteCursor::new(Bytes::from(buf));
        let loaded: RawArray<i64> = RawArray::read(&mut cursor, 4).unwrap();
        assert_eq!(loaded.iter().collect::<Vec<_>>(), vec![0, 5, -1, i64::MAX]);
        assert!(RawArray::<i32>::read(&mut cursor, 1).is_err());
    }
}
