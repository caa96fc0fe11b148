//! The runtime dictionary.
//!
//! A [`Dictionary`] is a set of views over one [`Bytes`] region, normally a
//! memory-mapped file. Opening it parses the section headers; lookups then
//! read packed values in place without copying.

use std::io::Write;
use std::path::Path;

use byteorder::WriteBytesExt;
use bytes::Bytes;
use lexis_adapters::storage::map_file;
use lexis_common::memory::ByteCursor;
use lexis_common::types::{GrammemeSet, LanguageCode};
use lexis_common::utils::error::{FormatError, Result};
use lexis_core::index::{TrieIndex, TrieIndexPrefix};
use lexis_core::storage::{BitPackedArray, FieldLayout, StringArray, StringSet};
use serde::Serialize;

use crate::builder::properties::{self, HEADER_COUNT, HEADER_KEY, HEADER_SIZE, INFLECTION_PROPERTY};
use crate::format::{self, FileHeader, RawArray};
use crate::inflection::{InflectionPattern, InflectionTable};

const WORD_TYPE: usize = 0;
const WORD_PROPERTIES: usize = 1;

/// Bit widths stored after the grammeme table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DictionaryWidths {
    pub type_index: u8,
    pub property_map: u8,
    pub property_key: u8,
    pub property_count: u8,
}

/// The sections of a [`Dictionary`], in file order.
pub(crate) struct DictionaryParts {
    pub header: FileHeader,
    pub grammemes: StringArray,
    pub widths: DictionaryWidths,
    pub words: TrieIndex,
    pub type_singletons: RawArray<i64>,
    pub data_singletons: BitPackedArray,
    pub property_names: StringArray,
    pub property_values: StringSet,
    pub property_maps: BitPackedArray,
    pub inflection: Option<InflectionTable>,
}

/// Size and shape of a loaded dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictionaryStats {
    /// Language of the dictionary.
    pub language: LanguageCode,
    /// Number of word keys, normalized forms included.
    pub words: usize,
    /// Number of grammemes.
    pub grammemes: usize,
    /// Distinct grammeme combinations, placeholder included.
    pub type_singletons: usize,
    /// Distinct word data values; 0 for the one-stage layout.
    pub data_singletons: usize,
    /// Number of property names.
    pub property_names: usize,
    /// Number of distinct property values.
    pub property_values: usize,
    /// Entries in the property value map array.
    pub property_map_entries: usize,
    /// Number of inflection patterns.
    pub inflection_patterns: usize,
    /// Whether lemma suffixes map to patterns.
    pub suffix_mappings: bool,
}

/// A compiled, read-only dictionary.
///
/// # Examples
///
/// ```no_run
/// use lexis_engine::Dictionary;
///
/// let dict = Dictionary::open("es.dict")?;
/// if let Some(grammemes) = dict.lookup("gato")? {
///     println!("{:?}", dict.grammeme_names(grammemes));
/// }
/// # Ok::<(), lexis_common::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Dictionary {
    header: FileHeader,
    grammemes: StringArray,
    widths: DictionaryWidths,
    words: TrieIndex,
    type_singletons: RawArray<i64>,
    data_singletons: BitPackedArray,
    property_names: StringArray,
    property_values: StringSet,
    property_maps: BitPackedArray,
    inflection: Option<InflectionTable>,
    word_layout: FieldLayout,
    header_layout: FieldLayout,
    inflection_key: Option<u64>,
}

impl Dictionary {
    pub(crate) fn from_parts(parts: DictionaryParts) -> Result<Self> {
        let w = parts.widths;
        let word_layout = FieldLayout::new("word data", &[w.type_index, w.property_map], 63)?;
        let header_layout = properties::header_layout(parts.property_names.len(), w.property_key, w.property_count)?;
        let inflection_key = parts
            .inflection
            .as_ref()
            .and(parts.property_names.index_of(INFLECTION_PROPERTY))
            .map(|id| id as u64);
        Ok(Self {
            header: parts.header,
            grammemes: parts.grammemes,
            widths: w,
            words: parts.words,
            type_singletons: parts.type_singletons,
            data_singletons: parts.data_singletons,
            property_names: parts.property_names,
            property_values: parts.property_values,
            property_maps: parts.property_maps,
            inflection: parts.inflection,
            word_layout,
            header_layout,
            inflection_key,
        })
    }

    /// Memory-maps and opens a dictionary file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be mapped, or a
    /// [`FormatError`] if it is not a valid dictionary.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let dict = Self::from_bytes(map_file(path)?)?;
        tracing::debug!(
            path = %path.display(),
            language = %dict.language(),
            words = dict.word_count(),
            "opened dictionary"
        );
        Ok(dict)
    }

    /// Opens a dictionary held in `bytes`, sharing them.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the bytes are not a valid dictionary.
    pub fn from_bytes(bytes: Bytes) -> Result<Self> {
        let mut cursor = ByteCursor::new(bytes);
        let header = FileHeader::read(&mut cursor)?;
        let grammemes = StringArray::deserialize(&mut cursor)?;
        let widths = DictionaryWidths {
            type_index: cursor.read_u8()?,
            property_map: cursor.read_u8()?,
            property_key: cursor.read_u8()?,
            property_count: cursor.read_u8()?,
        };
        let type_count = cursor.read_count("type singletons")?;
        let words_start = cursor.position();
        let words = TrieIndex::deserialize(&mut cursor)?;
        tracing::trace!(offset = words_start, keys = words.len(), "word index");
        let type_singletons = RawArray::read(&mut cursor, type_count)?;
        let data_singletons = BitPackedArray::deserialize(&mut cursor)?;
        let property_names = StringArray::deserialize(&mut cursor)?;
        let property_values = StringSet::deserialize(&mut cursor)?;
        let property_maps = BitPackedArray::deserialize(&mut cursor)?;
        let inflection = if header.has_inflection_table() {
            tracing::trace!(offset = cursor.position(), "inflection table");
            Some(InflectionTable::deserialize(&mut cursor)?)
        } else {
            None
        };
        if cursor.remaining() != 0 {
            return Err(FormatError::corrupt("dictionary", format!("{} trailing bytes", cursor.remaining())).into());
        }

        Self::from_parts(DictionaryParts {
            header,
            grammemes,
            widths,
            words,
            type_singletons,
            data_singletons,
            property_names,
            property_values,
            property_maps,
            inflection,
        })
        .map_err(|e| FormatError::corrupt("dictionary widths", e.to_string()).into())
    }

    /// Language the dictionary was built for.
    #[must_use]
    pub fn language(&self) -> LanguageCode {
        self.header.language
    }

    /// Number of word keys.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Returns true if word data goes through the data singleton table.
    #[must_use]
    pub fn is_two_stage(&self) -> bool {
        !self.data_singletons.is_empty()
    }

    fn word_data(&self, word: &str) -> Result<Option<u64>> {
        match self.words.find(word) {
            Some(value) => self.resolve_data(value).map(Some),
            None => Ok(None),
        }
    }

    fn resolve_data(&self, value: u64) -> Result<u64> {
        if self.is_two_stage() {
            self.data_singletons.read(value as usize)
        } else {
            Ok(value)
        }
    }

    fn resolve_type(&self, data: u64) -> Result<Option<GrammemeSet>> {
        let index = self.word_layout.get(data, WORD_TYPE) as usize;
        if index == 0 {
            return Ok(None);
        }
        let mask = self
            .type_singletons
            .get(index)
            .ok_or_else(|| FormatError::corrupt("type singletons", format!("index {index}")))?;
        Ok(Some(GrammemeSet::from_bits(mask as u64)))
    }

    /// Grammemes of `word`.
    ///
    /// Returns `Ok(None)` for a word that is not in the dictionary and
    /// `Ok(Some(GrammemeSet::EMPTY))` for a word listed without grammemes.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the word's data is corrupt.
    pub fn lookup(&self, word: &str) -> Result<Option<GrammemeSet>> {
        match self.word_data(word)? {
            Some(data) => self.resolve_type(data),
            None => Ok(None),
        }
    }

    /// Raw value ids of property `key` in the map of `data`.
    fn property_ids(&self, data: u64, key: u64) -> Result<Option<Vec<u64>>> {
        let offset = self.word_layout.get(data, WORD_PROPERTIES) as usize;
        if offset == 0 {
            return Ok(None);
        }
        let maps = &self.property_maps;
        let size = self.header_layout.get(maps.read(offset)?, HEADER_SIZE) as usize;
        let mut value_start = offset + size;
        for i in offset..offset + size {
            let entry = maps.read(i)?;
            let entry_key = self.header_layout.get(entry, HEADER_KEY);
            let count = self.header_layout.get(entry, HEADER_COUNT) as usize;
            if entry_key == key {
                return (value_start..value_start + count)
                    .map(|j| maps.read(j))
                    .collect::<Result<Vec<_>>>()
                    .map(Some);
            }
            if entry_key > key {
                break;
            }
            value_start += count;
        }
        Ok(None)
    }

    /// Values of property `name` for `word`, in source order.
    ///
    /// `inflection` values come back as pattern identifiers.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the property map is corrupt.
    pub fn lookup_property(&self, word: &str, name: &str) -> Result<Option<Vec<String>>> {
        let Some(key) = self.property_names.index_of(name) else {
            return Ok(None);
        };
        let key = key as u64;
        let Some(data) = self.word_data(word)? else {
            return Ok(None);
        };
        let Some(ids) = self.property_ids(data, key)? else {
            return Ok(None);
        };
        let values = match (&self.inflection, self.inflection_key) {
            (Some(table), Some(inflection_key)) if inflection_key == key => ids
                .into_iter()
                .map(|id| table.identifier(id as u32))
                .collect::<Result<Vec<_>>>()?,
            _ => ids
                .into_iter()
                .map(|id| self.property_values.get(id as u32))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Some(values))
    }

    /// Lazily enumerates the words starting with `prefix`.
    ///
    /// Words come in ascending order of their encoded key bytes.
    pub fn prefix_scan(&self, prefix: &str) -> PrefixScan<'_> {
        PrefixScan {
            inner: self.words.prefix(prefix),
            dict: self,
        }
    }

    /// Returns true if the dictionary carries inflection patterns.
    #[must_use]
    pub fn has_inflection_table(&self) -> bool {
        self.inflection.is_some()
    }

    /// The inflection table, if present.
    #[must_use]
    pub fn inflection_table(&self) -> Option<&InflectionTable> {
        self.inflection.as_ref()
    }

    /// Decodes the inflection pattern named `identifier`.
    ///
    /// Returns `Ok(None)` without an inflection table or for an unknown
    /// identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the pattern record is corrupt.
    pub fn resolve_inflection_pattern(&self, identifier: &str) -> Result<Option<InflectionPattern>> {
        match &self.inflection {
            Some(table) => table.pattern(identifier),
            None => Ok(None),
        }
    }

    /// Inflection patterns named by the `inflection` property of `word`.
    ///
    /// A word that is not all lowercase is retried in lowercase.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if a map or pattern record is corrupt.
    pub fn inflection_patterns_for_word(&self, word: &str) -> Result<Vec<InflectionPattern>> {
        let (Some(table), Some(key)) = (&self.inflection, self.inflection_key) else {
            return Ok(Vec::new());
        };
        let mut ids = match self.word_data(word)? {
            Some(data) => self.property_ids(data, key)?,
            None => None,
        };
        if ids.is_none() {
            let lowercase = self.language().lowercase(word);
            if lowercase != word {
                if let Some(data) = self.word_data(&lowercase)? {
                    ids = self.property_ids(data, key)?;
                }
            }
        }
        ids.unwrap_or_default()
            .into_iter()
            .map(|id| table.pattern_by_id(id as u32))
            .collect()
    }

    /// The single-grammeme set for `name`.
    #[must_use]
    pub fn grammeme_value(&self, name: &str) -> Option<GrammemeSet> {
        self.grammemes.index_of(name).and_then(GrammemeSet::single)
    }

    /// The union of the grammemes in `names`; unknown names are skipped.
    #[must_use]
    pub fn grammeme_values<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> GrammemeSet {
        names
            .into_iter()
            .filter_map(|name| self.grammeme_value(name))
            .fold(GrammemeSet::EMPTY, |acc, g| acc | g)
    }

    /// Names of the grammemes in `set`, in table order.
    #[must_use]
    pub fn grammeme_names(&self, set: GrammemeSet) -> Vec<String> {
        set.indexes()
            .filter_map(|i| self.grammemes.get(i))
            .map(str::to_string)
            .collect()
    }

    /// All grammeme names, in table order.
    pub fn grammemes(&self) -> impl Iterator<Item = &str> + '_ {
        self.grammemes.iter()
    }

    /// All property names, in table order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.property_names.iter()
    }

    /// Section sizes.
    #[must_use]
    pub fn stats(&self) -> DictionaryStats {
        DictionaryStats {
            language: self.language(),
            words: self.words.len(),
            grammemes: self.grammemes.len(),
            type_singletons: self.type_singletons.len(),
            data_singletons: self.data_singletons.len(),
            property_names: self.property_names.len(),
            property_values: self.property_values.len(),
            property_map_entries: self.property_maps.len(),
            inflection_patterns: self.inflection.as_ref().map_or(0, InflectionTable::len),
            suffix_mappings: self
                .inflection
                .as_ref()
                .is_some_and(InflectionTable::has_suffix_mappings),
        }
    }

    /// Writes the dictionary in the file format it was read from.
    ///
    /// # Errors
    ///
    /// Returns an error if a section is too large or the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let w = &self.widths;
        self.header.write_to(writer)?;
        self.grammemes.write_to(writer)?;
        for width in [w.type_index, w.property_map, w.property_key, w.property_count] {
            writer.write_u8(width)?;
        }
        format::write_count(writer, "type singleton", self.type_singletons.len())?;
        self.words.write_to(writer)?;
        self.type_singletons.write_to(writer)?;
        self.data_singletons.write_to(writer)?;
        self.property_names.write_to(writer)?;
        self.property_values.write_to(writer)?;
        self.property_maps.write_to(writer)?;
        if let Some(table) = &self.inflection {
            table.write_to(writer)?;
        }
        Ok(())
    }
}

/// Lazy prefix enumeration over a [`Dictionary`].
pub struct PrefixScan<'a> {
    inner: TrieIndexPrefix<'a, lexis_core::index::FstTrie>,
    dict: &'a Dictionary,
}

impl Iterator for PrefixScan<'_> {
    type Item = Result<(String, GrammemeSet)>;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.inner.next()?;
        Some(entry.and_then(|(word, value)| {
            let data = self.dict.resolve_data(value)?;
            let grammemes = self.dict.resolve_type(data)?.unwrap_or_default();
            Ok((word, grammemes))
        }))
    }
}
