//! String containers.
//!
//! | Container | Lookup | Identifier | Used for |
//! |-----------|--------|------------|----------|
//! | [`StringArray`] | binary search | sorted position | grammeme and property names |
//! | [`StringSet`] | trie | trie id | property values, inflection suffixes |
//!
//! # Serialized forms
//!
//! ```text
//! StringArray: count: u32 | bytes_len: u32 | count x (offset << 8 | len): u32 | UTF-8 bytes
//! StringSet:   encoding: u8 | 0 0 0 | trie_len: u32 | trie bytes
//! ```

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::io::Write;

use byteorder::{ByteOrder, NativeEndian, WriteBytesExt};
use bytes::Bytes;
use lexis_common::memory::ByteCursor;
use lexis_common::utils::error::{CapacityError, Error, FormatError, Result};

use super::encoding::KeyEncoding;
use crate::index::{FstTrie, SuccinctTrie};

/// Longest string a [`StringArray`] entry can describe.
pub const MAX_STRING_LEN: usize = 0xff;

const MAX_OFFSET: usize = (1 << 24) - 1;

/// Sorted table of short strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringArray {
    entries: Bytes,
    data: Bytes,
}

impl StringArray {
    /// Builds a table from `strings`, sorted and deduplicated.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError::StringTooLong`] for a string over 255 bytes,
    /// or [`CapacityError::CountOverflow`] if the text exceeds 16 MiB.
    pub fn new<I, S>(strings: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sorted: BTreeSet<String> = strings.into_iter().map(|s| s.as_ref().to_owned()).collect();
        let mut entries = Vec::with_capacity(sorted.len() * 4);
        let mut data = Vec::new();
        for s in &sorted {
            if s.len() > MAX_STRING_LEN {
                return Err(CapacityError::StringTooLong {
                    len: s.len(),
                    limit: MAX_STRING_LEN,
                }
                .into());
            }
            if data.len() > MAX_OFFSET {
                return Err(CapacityError::CountOverflow {
                    field: "string table bytes",
                    count: data.len(),
                }
                .into());
            }
            entries.write_u32::<NativeEndian>(((data.len() as u32) << 8) | s.len() as u32)?;
            data.extend_from_slice(s.as_bytes());
        }
        Ok(Self {
            entries: Bytes::from(entries),
            data: Bytes::from(data),
        })
    }

    /// Number of strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len() / 4
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn bytes_at(&self, index: usize) -> Option<&[u8]> {
        let raw = self.entries.get(index * 4..index * 4 + 4)?;
        let entry = NativeEndian::read_u32(raw) as usize;
        let (offset, len) = (entry >> 8, entry & 0xff);
        self.data.get(offset..offset + len)
    }

    /// String at sorted position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        std::str::from_utf8(self.bytes_at(index)?).ok()
    }

    /// Sorted position of `s`.
    #[must_use]
    pub fn index_of(&self, s: &str) -> Option<usize> {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.bytes_at(mid)?.cmp(s.as_bytes()) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(mid),
            }
        }
        None
    }

    /// Iterates strings in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Size of the serialized form in bytes.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        8 + self.entries.len() + self.data.len()
    }

    /// Writes the table.
    ///
    /// # Errors
    ///
    /// Returns an error if the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<NativeEndian>(self.len() as u32)?;
        writer.write_u32::<NativeEndian>(self.data.len() as u32)?;
        writer.write_all(&self.entries)?;
        writer.write_all(&self.data)?;
        Ok(())
    }

    /// Reads a table at the cursor, sharing the cursor's bytes.
    ///
    /// Every entry is checked once here, so later reads cannot fail.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the region is truncated, an entry points
    /// outside the text, or the text is not UTF-8.
    pub fn deserialize(cursor: &mut ByteCursor) -> Result<Self> {
        let count = cursor.read_u32()? as usize;
        let bytes_len = cursor.read_u32()? as usize;
        let entries = cursor.read_bytes(count * 4)?;
        let data = cursor.read_bytes(bytes_len)?;
        let table = Self { entries, data };

        let mut previous: Option<&[u8]> = None;
        for index in 0..count {
            let bytes = table.bytes_at(index).ok_or_else(|| {
                FormatError::corrupt("string table", format!("entry {index} out of range"))
            })?;
            if std::str::from_utf8(bytes).is_err() {
                return Err(FormatError::corrupt("string table", format!("entry {index} is not UTF-8")).into());
            }
            if previous.is_some_and(|p| p >= bytes) {
                return Err(FormatError::corrupt("string table", "entries out of order").into());
            }
            previous = Some(bytes);
        }
        Ok(table)
    }
}

/// Trie-backed set of strings identified by trie id.
#[derive(Debug, Clone)]
pub struct StringSet<T = FstTrie> {
    encoding: KeyEncoding,
    trie: T,
}

impl<T: SuccinctTrie> StringSet<T> {
    /// Builds a set from `strings`; duplicates collapse.
    ///
    /// # Errors
    ///
    /// Returns an error if the trie cannot be built.
    pub fn new<I, S>(strings: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = strings.into_iter().map(|s| s.as_ref().to_owned()).collect();
        let encoding = KeyEncoding::choose(unique.iter().map(String::as_str));
        let encoded: BTreeSet<Vec<u8>> = unique.iter().map(|s| encoding.encode(s)).collect();
        let trie = T::build(&encoded)?;
        Ok(Self { encoding, trie })
    }

    /// Key encoding chosen at build time.
    #[must_use]
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Number of strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    /// Returns true if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// Identifier of `s`.
    #[must_use]
    pub fn id(&self, s: &str) -> Option<u32> {
        if self.trie.is_empty() {
            return None;
        }
        self.trie.lookup(&self.encoding.encode(s))
    }

    /// String with identifier `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for an unknown id, or a
    /// [`FormatError`] if the stored bytes do not decode.
    pub fn get(&self, id: u32) -> Result<String> {
        let bytes = self.trie.reverse_lookup(id).ok_or(Error::IndexOutOfBounds {
            index: id as usize,
            len: self.len(),
        })?;
        self.encoding.decode(&bytes)
    }

    /// Size of the serialized form in bytes.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        8 + self.trie.as_bytes().len()
    }

    /// Writes the set.
    ///
    /// # Errors
    ///
    /// Returns an error if the trie exceeds 4 GiB or the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let trie_bytes = self.trie.as_bytes();
        let trie_len = u32::try_from(trie_bytes.len()).map_err(|_| CapacityError::CountOverflow {
            field: "string set bytes",
            count: trie_bytes.len(),
        })?;
        writer.write_u8(self.encoding.as_u16() as u8)?;
        writer.write_all(&[0; 3])?;
        writer.write_u32::<NativeEndian>(trie_len)?;
        writer.write_all(trie_bytes)?;
        Ok(())
    }

    /// Reads a set at the cursor, sharing the cursor's bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] for a truncated region or unknown encoding.
    pub fn deserialize(cursor: &mut ByteCursor) -> Result<Self> {
        let encoding = KeyEncoding::from_u16(u16::from(cursor.read_u8()?))?;
        let reserved: [u8; 3] = cursor.read_array()?;
        if reserved != [0; 3] {
            return Err(FormatError::corrupt("string set", "reserved bytes are not zero").into());
        }
        let trie_len = cursor.read_u32()? as usize;
        let trie = T::from_bytes(cursor.read_bytes(trie_len)?)?;
        Ok(Self { encoding, trie })
    }
}

impl<T: SuccinctTrie + Default> Default for StringSet<T> {
    fn default() -> Self {
        Self {
            encoding: KeyEncoding::Utf8,
            trie: T::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip_array(table: &StringArray) -> StringArray {
        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), table.serialized_len());
        let mut cursor = ByteCursor::new(Bytes::from(buf));
        let loaded = StringArray::deserialize(&mut cursor).unwrap();
        assert_eq!(cursor.remaining(), 0);
        loaded
    }

    #[test]
    fn test_array_sorted_lookup() {
        let table = StringArray::new(["singular", "masculine", "noun", "feminine", "noun"]).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.iter().collect::<Vec<_>>(),
            vec!["feminine", "masculine", "noun", "singular"]
        );
        assert_eq!(table.index_of("noun"), Some(2));
        assert_eq!(table.index_of("plural"), None);
        assert_eq!(table.get(4), None);
    }

    #[test]
    fn test_array_round_trip() {
        let table = StringArray::new(["género", "número", "caso"]).unwrap();
        let loaded = round_trip_array(&table);
        assert_eq!(loaded, table);
        assert_eq!(loaded.index_of("número"), Some(2));
    }

    #[test]
    fn test_array_string_too_long() {
        let long = "x".repeat(256);
        let err = StringArray::new([long.as_str()]).unwrap_err();
        assert!(matches!(err, Error::Capacity(CapacityError::StringTooLong { len: 256, .. })));
        assert!(StringArray::new(["y".repeat(255)]).is_ok());
    }

    #[test]
    fn test_array_empty() {
        let table = StringArray::new(Vec::<String>::new()).unwrap();
        let loaded = round_trip_array(&table);
        assert!(loaded.is_empty());
        assert_eq!(loaded.index_of(""), None);
    }

    #[test]
    fn test_array_rejects_bad_entry() {
        let table = StringArray::new(["ab"]).unwrap();
        let mut buf = Vec::new();
        table.write_to(&mut buf).unwrap();
        // Entry claims 3 bytes of a 2-byte text.
        buf[8..12].copy_from_slice(&3u32.to_ne_bytes());
        let mut cursor = ByteCursor::new(Bytes::from(buf));
        assert!(StringArray::deserialize(&mut cursor).is_err());
    }

    #[test]
    fn test_set_ids() {
        let set: StringSet = StringSet::new(["rojo", "azul", "verde", "azul"]).unwrap();
        assert_eq!(set.len(), 3);
        let id = set.id("verde").unwrap();
        assert_eq!(set.get(id).unwrap(), "verde");
        assert_eq!(set.id("negro"), None);
        assert!(set.get(3).is_err());
    }

    #[test]
    fn test_set_round_trip() {
        let set: StringSet = StringSet::new(["кошка", "собака"]).unwrap();
        let mut buf = Vec::new();
        set.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), set.serialized_len());
        assert_eq!(buf[0], KeyEncoding::Bocu1.as_u16() as u8);
        assert_eq!(&buf[1..4], &[0, 0, 0]);

        let mut cursor = ByteCursor::new(Bytes::from(buf));
        let loaded: StringSet = StringSet::deserialize(&mut cursor).unwrap();
        assert_eq!(loaded.id("собака"), set.id("собака"));
        assert_eq!(loaded.get(0).unwrap(), set.get(0).unwrap());
    }

    #[test]
    fn test_set_empty() {
        let set: StringSet = StringSet::new(Vec::<&str>::new()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.id(""), None);
        let mut buf = Vec::new();
        set.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 8);
    }
}
