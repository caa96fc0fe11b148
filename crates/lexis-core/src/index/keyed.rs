//! String-keyed index: trie + key encoding + bit-packed values.
//!
//! A [`TrieIndex`] maps each key to one unsigned value. Keys are encoded
//! with the cheapest [`KeyEncoding`] for the key set, the trie turns the
//! encoded key into a dense id, and the id indexes a [`BitPackedArray`].
//!
//! # Serialized form
//!
//! ```text
//! trie_len: u32 | encoding: u16 | values: BitPackedArray | trie bytes
//! ```
//!
//! `trie_len` is 0 for an empty index.

use std::io::Write;

use byteorder::{NativeEndian, WriteBytesExt};
use bytes::Bytes;
use lexis_common::memory::ByteCursor;
use lexis_common::utils::error::{CapacityError, Error, FormatError, Result};

use super::trie::{FstTrie, SuccinctTrie};
use crate::storage::{BitPackedArray, KeyEncoding, calculate_bit_width};

/// Key→value index over an injected [`SuccinctTrie`].
#[derive(Debug, Clone)]
pub struct TrieIndex<T = FstTrie> {
    encoding: KeyEncoding,
    values: BitPackedArray<Bytes>,
    trie: T,
}

impl<T: SuccinctTrie> TrieIndex<T> {
    /// Builds an index from `(key, value)` pairs.
    ///
    /// Picks the key encoding and the value width, builds the trie over the
    /// encoded keys, then stores each value at the id the trie assigned.
    ///
    /// # Errors
    ///
    /// Returns an error if a key repeats or the trie cannot be built.
    pub fn build<K, I>(entries: I) -> Result<Self>
    where
        K: AsRef<str>,
        I: IntoIterator<Item = (K, u64)>,
    {
        let entries: Vec<(K, u64)> = entries.into_iter().collect();
        let encoding = KeyEncoding::choose(entries.iter().map(|(k, _)| k.as_ref()));
        let width = calculate_bit_width(entries.iter().fold(0, |acc, &(_, v)| acc | v));

        let mut encoded: Vec<(Vec<u8>, u64)> = entries
            .iter()
            .map(|(k, v)| (encoding.encode(k.as_ref()), *v))
            .collect();
        encoded.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = encoded.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            let key = encoding.decode(&pair[0].0).unwrap_or_default();
            return Err(Error::Internal(format!("duplicate index key {key:?}")));
        }

        let trie = T::build(encoded.iter().map(|(k, _)| k.as_slice()))?;
        let mut values = BitPackedArray::with_width(width, encoded.len())?;
        for (key, value) in &encoded {
            let id = trie
                .lookup(key)
                .ok_or_else(|| Error::Internal("trie lost a key during build".to_string()))?;
            values.write(id as usize, *value)?;
        }

        tracing::trace!(
            keys = encoded.len(),
            encoding = encoding.name(),
            width,
            "built trie index"
        );
        Ok(Self {
            encoding,
            values: values.freeze(),
            trie,
        })
    }

    /// Key encoding chosen at build time.
    #[must_use]
    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trie.len()
    }

    /// Returns true if the index holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trie.is_empty()
    }

    /// The per-id values.
    #[must_use]
    pub fn values(&self) -> &BitPackedArray<Bytes> {
        &self.values
    }

    /// Value stored for `key`.
    #[must_use]
    pub fn find(&self, key: &str) -> Option<u64> {
        self.values.get(self.find_id(key)? as usize)
    }

    /// Trie id of `key`.
    #[must_use]
    pub fn find_id(&self, key: &str) -> Option<u32> {
        if self.trie.is_empty() {
            return None;
        }
        self.trie.lookup(&self.encoding.encode(key))
    }

    /// Value stored at trie id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] past the last id.
    pub fn find_by_id(&self, id: u32) -> Result<u64> {
        self.values.read(id as usize)
    }

    /// Key with trie id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] past the last id, or a
    /// [`FormatError`] if the stored key does not decode.
    pub fn get_key(&self, id: u32) -> Result<String> {
        let bytes = self
            .trie
            .reverse_lookup(id)
            .ok_or(Error::IndexOutOfBounds {
                index: id as usize,
                len: self.len(),
            })?;
        self.encoding.decode(&bytes)
    }

    /// Lazily enumerates every key starting with `prefix`, with its value.
    ///
    /// Entries come in ascending order of encoded key bytes.
    pub fn prefix(&self, prefix: &str) -> TrieIndexPrefix<'_, T> {
        TrieIndexPrefix {
            inner: self.trie.prefix(&self.encoding.encode(prefix)),
            index: self,
        }
    }

    /// Size of the serialized form in bytes.
    #[must_use]
    pub fn serialized_len(&self) -> usize {
        4 + 2 + self.values.serialized_len() + self.trie.as_bytes().len()
    }

    /// Writes the index.
    ///
    /// # Errors
    ///
    /// Returns an error if the trie exceeds 4 GiB or the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let trie_bytes = self.trie.as_bytes();
        let trie_len = u32::try_from(trie_bytes.len()).map_err(|_| CapacityError::CountOverflow {
            field: "trie bytes",
            count: trie_bytes.len(),
        })?;
        writer.write_u32::<NativeEndian>(trie_len)?;
        writer.write_u16::<NativeEndian>(self.encoding.as_u16())?;
        self.values.write_to(writer)?;
        writer.write_all(trie_bytes)?;
        Ok(())
    }

    /// Reads an index at the cursor, sharing the cursor's bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the section is truncated, the encoding is
    /// unknown, or the value count disagrees with the trie.
    pub fn deserialize(cursor: &mut ByteCursor) -> Result<Self> {
        let trie_len = cursor.read_u32()? as usize;
        let encoding = KeyEncoding::from_u16(cursor.read_u16()?)?;
        let values = BitPackedArray::deserialize(cursor)?;
        let trie = T::from_bytes(cursor.read_bytes(trie_len)?)?;
        if values.len() != trie.len() {
            return Err(FormatError::corrupt(
                "trie index",
                format!("{} values for {} keys", values.len(), trie.len()),
            )
            .into());
        }
        Ok(Self {
            encoding,
            values,
            trie,
        })
    }
}

impl<T: SuccinctTrie + Default> Default for TrieIndex<T> {
    fn default() -> Self {
        Self {
            encoding: KeyEncoding::Utf8,
            values: BitPackedArray::default(),
            trie: T::default(),
        }
    }
}

/// Lazy prefix enumeration over a [`TrieIndex`].
pub struct TrieIndexPrefix<'a, T: SuccinctTrie + 'a> {
    inner: T::Prefix<'a>,
    index: &'a TrieIndex<T>,
}

impl<'a, T: SuccinctTrie + 'a> Iterator for TrieIndexPrefix<'a, T> {
    type Item = Result<(String, u64)>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, id) = self.inner.next()?;
        Some(
            self.index
                .encoding
                .decode(&key)
                .and_then(|key| Ok((key, self.index.find_by_id(id)?))),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use proptest::prelude::*;

    fn sample() -> TrieIndex {
        TrieIndex::build([("gato", 3u64), ("gata", 5), ("gatos", 9), ("perro", 1)]).unwrap()
    }

    #[test]
    fn test_find() {
        let index = sample();
        assert_eq!(index.len(), 4);
        assert_eq!(index.find("gato"), Some(3));
        assert_eq!(index.find("gatos"), Some(9));
        assert_eq!(index.find("gat"), None);
        assert_eq!(index.find("zorro"), None);
        assert_eq!(index.values().width(), 4);
    }

    #[test]
    fn test_ids_and_keys_agree() {
        let index = sample();
        for id in 0..index.len() as u32 {
            let key = index.get_key(id).unwrap();
            assert_eq!(index.find_id(&key), Some(id));
            assert_eq!(index.find(&key).unwrap(), index.find_by_id(id).unwrap());
        }
        assert!(matches!(
            index.find_by_id(4),
            Err(Error::IndexOutOfBounds { index: 4, len: 4 })
        ));
        assert!(index.get_key(4).is_err());
    }

    #[test]
    fn test_prefix() {
        let index = sample();
        let found: Vec<_> = index.prefix("gat").collect::<Result<_>>().unwrap();
        assert_eq!(
            found,
            vec![
                ("gata".to_string(), 5),
                ("gato".to_string(), 3),
                ("gatos".to_string(), 9)
            ]
        );
        assert_eq!(index.prefix("x").count(), 0);
        assert_eq!(index.prefix("").count(), 4);
    }

    #[test]
    fn test_non_latin_keys() {
        let index: TrieIndex =
            TrieIndex::build([("кошка", 1u64), ("кошки", 2), ("собака", 3)]).unwrap();
        assert_eq!(index.encoding(), KeyEncoding::Bocu1);
        assert_eq!(index.find("кошки"), Some(2));
        let found: Vec<_> = index.prefix("кош").map(|r| r.unwrap().0).collect();
        assert_eq!(found, vec!["кошка", "кошки"]);
    }

    #[test]
    fn test_duplicate_key() {
        assert!(TrieIndex::<FstTrie>::build([("a", 1u64), ("a", 2)]).is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let index = sample();
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), index.serialized_len());

        let mut cursor = ByteCursor::new(Bytes::from(buf.clone()));
        let loaded: TrieIndex = TrieIndex::deserialize(&mut cursor).unwrap();
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(loaded.find("gata"), Some(5));

        let mut again = Vec::new();
        loaded.write_to(&mut again).unwrap();
        assert_eq!(again, buf);
    }

    #[test]
    fn test_empty_index() {
        let index: TrieIndex = TrieIndex::build(Vec::<(String, u64)>::new()).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.find(""), None);

        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        assert_eq!(&buf[..4], &0u32.to_ne_bytes());

        let mut cursor = ByteCursor::new(Bytes::from(buf));
        let loaded: TrieIndex = TrieIndex::deserialize(&mut cursor).unwrap();
        assert!(loaded.is_empty());
        assert_eq!(loaded.prefix("").count(), 0);
    }

    #[test]
    fn test_value_count_mismatch() {
        let index = sample();
        let mut buf = Vec::new();
        index.write_to(&mut buf).unwrap();
        // Value count lives after trie_len (4) + encoding (2) + width (1).
        buf[7..11].copy_from_slice(&3u32.to_ne_bytes());
        let mut cursor = ByteCursor::new(Bytes::from(buf));
        assert!(TrieIndex::<FstTrie>::deserialize(&mut cursor).is_err());
    }

    proptest! {
        #[test]
        fn prop_lookup_agrees_with_source(entries in prop::collection::btree_map("[a-zñéü]{0,8}", any::<u32>(), 0..40)) {
            let index: TrieIndex = TrieIndex::build(entries.iter().map(|(k, v)| (k.as_str(), u64::from(*v)))).unwrap();
            prop_assert_eq!(index.len(), entries.len());
            for (key, value) in &entries {
                prop_assert_eq!(index.find(key), Some(u64::from(*value)));
            }
            let listed: BTreeMap<String, u64> = index.prefix("").map(|r| r.unwrap()).collect();
            prop_assert_eq!(listed.len(), entries.len());
        }
    }
}
