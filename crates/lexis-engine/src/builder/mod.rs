//! Offline dictionary builder.
//!
//! The builder reads lexicon lines into a word table, optionally compiles an
//! inflection table, then packs everything into the sections of a
//! [`Dictionary`]:
//!
//! 1. Grammeme names are sorted into a table and every first-seen bit is
//!    remapped to the bit of its table index.
//! 2. Each distinct grammeme mask becomes a type singleton; index 0 is a
//!    placeholder.
//! 3. Each word's data is `type index | property map offset << type bits`.
//! 4. When it is smaller, word data is stored once per distinct value and
//!    the word trie maps to that value's index (the two-stage layout).
//!
//! # Example
//!
//! ```
//! use lexis_adapters::source::LexiconEntry;
//! use lexis_engine::OfflineBuilder;
//!
//! let mut builder = OfflineBuilder::new("es_ES")?;
//! builder.add_entry(LexiconEntry::parse("gato: noun masculine singular").unwrap())?;
//! let dict = builder.compile()?;
//! assert!(dict.lookup("gato")?.is_some());
//! # Ok::<(), lexis_common::Error>(())
//! ```

pub(crate) mod inflection;
pub(crate) mod lexicon;
pub(crate) mod properties;

use std::io::BufRead;
use std::path::{Path, PathBuf};

use lexis_adapters::source::{LexiconEntry, LexiconReader, PatternSource, read_patterns};
use lexis_adapters::storage::AtomicFile;
use lexis_common::types::LanguageCode;
use lexis_common::utils::error::{Error, Result};
use lexis_common::utils::hash::{FxHashMap, FxHashSet};
use lexis_core::index::TrieIndex;
use lexis_core::storage::{BitPackedArray, FieldLayout, StringArray, calculate_bit_width};
use serde::Serialize;

use crate::config::BuildConfig;
use crate::dictionary::{Dictionary, DictionaryParts, DictionaryStats, DictionaryWidths};
use crate::format::{FileHeader, RawArray};
use lexicon::WordTable;

pub use lexicon::MAX_PROPERTY_VALUES;
pub use properties::INFLECTION_PROPERTY;

/// Outcome of a build written to disk.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    /// Path of the dictionary.
    pub outfile: PathBuf,
    /// File size in bytes.
    pub bytes: u64,
    /// Whether word data uses the two-stage layout.
    pub two_stage: bool,
    /// Normalized word forms dropped because the key already existed.
    pub normalization_collisions: usize,
    /// Section sizes of the written dictionary.
    pub stats: DictionaryStats,
}

/// Collects source data and compiles it into a [`Dictionary`].
pub struct OfflineBuilder {
    locale: String,
    table: WordTable,
    patterns: Option<Vec<PatternSource>>,
    affix_mappings: bool,
}

impl OfflineBuilder {
    /// Creates a builder for `locale`.
    ///
    /// # Errors
    ///
    /// Returns an error if the locale's language code does not fit the
    /// header.
    pub fn new(locale: &str) -> Result<Self> {
        let language = LanguageCode::from_locale(locale)?;
        Ok(Self {
            locale: locale.to_string(),
            table: WordTable::new(locale, language),
            patterns: None,
            affix_mappings: false,
        })
    }

    /// Creates a builder and reads every input named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid options or unreadable, malformed input.
    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        config.validate()?;
        let mut builder = Self::new(&config.locale)?.with_affix_mappings(config.affix_mappings);
        for path in config.lexicons() {
            builder.read_lexicon(path)?;
        }
        if let Some(path) = &config.inflection {
            builder = builder.with_patterns(read_patterns(path)?);
        }
        Ok(builder)
    }

    /// Adds inflection patterns; the dictionary gets an inflection table.
    #[must_use]
    pub fn with_patterns(mut self, patterns: Vec<PatternSource>) -> Self {
        self.patterns = Some(patterns);
        self
    }

    /// Enables or disables the suffix → pattern mappings.
    #[must_use]
    pub fn with_affix_mappings(mut self, enabled: bool) -> Self {
        self.affix_mappings = enabled;
        self
    }

    /// Locale being built.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Number of word keys collected so far.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.table.words().len()
    }

    /// Adds one lexicon entry, replacing an earlier entry for the same word.
    ///
    /// # Errors
    ///
    /// Returns a [`CapacityError`](lexis_common::utils::error::CapacityError)
    /// for the 64th grammeme or a property with more than
    /// [`MAX_PROPERTY_VALUES`] values.
    pub fn add_entry(&mut self, entry: LexiconEntry) -> Result<()> {
        self.table.add(entry)
    }

    /// Reads every entry of a lexicon.
    ///
    /// Returns the number of entries read.
    ///
    /// # Errors
    ///
    /// Returns the first reader or capacity error.
    pub fn add_lexicon<R: BufRead>(&mut self, reader: LexiconReader<R>) -> Result<usize> {
        let mut count = 0;
        for entry in reader {
            self.table.add(entry?)?;
            count += 1;
        }
        Ok(count)
    }

    /// Reads a lexicon file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is malformed.
    pub fn read_lexicon(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let count = self.add_lexicon(LexiconReader::open(path, &self.locale)?)?;
        tracing::info!(path = %path.display(), entries = count, words = self.word_count(), "read lexicon");
        Ok(count)
    }

    /// Packs the collected data into an in-memory dictionary.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`](lexis_common::utils::error::SourceError)
    /// for patterns or words that reference unknown names, or a
    /// [`CapacityError`](lexis_common::utils::error::CapacityError) when a
    /// packed field overflows.
    pub fn compile(&self) -> Result<Dictionary> {
        let grammemes = StringArray::new(self.table.grammemes().iter())?;
        let remap = self
            .table
            .grammemes()
            .iter()
            .map(|name| {
                grammemes
                    .index_of(name)
                    .map(|index| 1u64 << index)
                    .ok_or_else(|| Error::Internal(format!("grammeme {name:?} missing from table")))
            })
            .collect::<Result<Vec<_>>>()?;
        let to_table_bits = |mask: u64| {
            (0..remap.len())
                .filter(|&bit| mask & (1 << bit) != 0)
                .fold(0u64, |acc, bit| acc | remap[bit])
        };

        let inflection = match &self.patterns {
            Some(patterns) => {
                let table = inflection::build(patterns, &grammemes, self.affix_mappings)?;
                self.log_unreferenced_grammemes(&grammemes, patterns);
                Some(table)
            }
            None => None,
        };
        let properties = properties::build(&self.table, inflection.as_ref())?;

        let mut types: Vec<i64> = vec![0];
        let mut type_index: FxHashMap<u64, u64> = FxHashMap::default();
        let word_types: Vec<u64> = self
            .table
            .words()
            .values()
            .map(|record| {
                let mask = to_table_bits(record.grammemes);
                *type_index.entry(mask).or_insert_with(|| {
                    types.push(mask as i64);
                    types.len() as u64 - 1
                })
            })
            .collect();

        let widths = DictionaryWidths {
            type_index: calculate_bit_width(word_types.iter().copied().max().unwrap_or(0)),
            property_map: calculate_bit_width(properties.offsets.iter().copied().max().unwrap_or(0)),
            property_key: properties.bits_key_id,
            property_count: properties.bits_value_count,
        };
        let word_layout = FieldLayout::new("word data", &[widths.type_index, widths.property_map], 63)?;
        let data = word_types
            .iter()
            .zip(&properties.offsets)
            .map(|(&t, &p)| word_layout.pack(&[t, p]))
            .collect::<Result<Vec<_>>>()?;

        let (values, data_singletons) = choose_layout(&data);
        let words: TrieIndex = TrieIndex::build(self.table.words().keys().zip(values))?;

        let dict = Dictionary::from_parts(DictionaryParts {
            header: FileHeader::new(self.table.language(), inflection.is_some()),
            grammemes,
            widths,
            words,
            type_singletons: RawArray::from_values(&types),
            data_singletons,
            property_names: properties.names,
            property_values: properties.values,
            property_maps: properties.maps,
            inflection,
        })?;
        tracing::debug!(
            words = dict.word_count(),
            types = types.len(),
            type_bits = widths.type_index,
            property_map_bits = widths.property_map,
            two_stage = dict.is_two_stage(),
            "compiled dictionary"
        );
        Ok(dict)
    }

    fn log_unreferenced_grammemes(&self, grammemes: &StringArray, patterns: &[PatternSource]) {
        let used: FxHashSet<&str> = patterns
            .iter()
            .flat_map(|p| {
                p.parts_of_speech
                    .iter()
                    .chain(p.inflections.iter().flat_map(|i| i.grammemes.iter()))
            })
            .map(String::as_str)
            .collect();
        let unused: Vec<&str> = grammemes.iter().filter(|g| !used.contains(g)).collect();
        if !unused.is_empty() {
            tracing::debug!(locale = %self.locale, grammemes = ?unused, "grammemes not used by any inflection pattern");
        }
    }

    /// Compiles and atomically writes the dictionary to `path`.
    ///
    /// # Errors
    ///
    /// Returns a compile error, or an I/O error if the file cannot be
    /// written. A failed write leaves `path` untouched.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<BuildSummary> {
        let dict = self.compile()?;
        let mut file = AtomicFile::create(path.as_ref())?;
        dict.write_to(&mut file)?;
        let bytes = file.commit()?;

        let summary = BuildSummary {
            outfile: path.as_ref().to_path_buf(),
            bytes,
            two_stage: dict.is_two_stage(),
            normalization_collisions: self.table.collisions(),
            stats: dict.stats(),
        };
        if summary.normalization_collisions > 0 {
            tracing::debug!(
                collisions = summary.normalization_collisions,
                "lowercase forms already present as words"
            );
        }
        tracing::info!(
            outfile = %summary.outfile.display(),
            bytes,
            words = summary.stats.words,
            grammemes = summary.stats.grammemes,
            inflection_patterns = summary.stats.inflection_patterns,
            "wrote dictionary"
        );
        Ok(summary)
    }

    /// Runs a complete build as described by `config`.
    ///
    /// # Errors
    ///
    /// Returns the first configuration, input, compile or output error.
    pub fn run(config: &BuildConfig) -> Result<BuildSummary> {
        if config.verbose {
            tracing::debug!(config = ?config, "starting build");
        }
        Self::from_config(config)?.write(&config.outfile)
    }
}

/// Picks between storing word data directly in the word trie and storing
/// each distinct value once behind an index.
///
/// Returns the per-word trie values and the data singletons, which are
/// empty for the direct layout.
fn choose_layout(data: &[u64]) -> (Vec<u64>, BitPackedArray) {
    let mut distinct: Vec<u64> = Vec::new();
    let mut index: FxHashMap<u64, u64> = FxHashMap::default();
    let indexes: Vec<u64> = data
        .iter()
        .map(|&value| {
            *index.entry(value).or_insert_with(|| {
                distinct.push(value);
                distinct.len() as u64 - 1
            })
        })
        .collect();

    let width = u64::from(calculate_bit_width(data.iter().fold(0, |acc, &v| acc | v)));
    let words = data.len() as u64;
    let one_stage = words * width;
    let two_stage = distinct.len() as u64 * width + words * u64::from(calculate_bit_width(distinct.len() as u64));
    if one_stage > two_stage {
        tracing::debug!(
            distinct = distinct.len(),
            saved_bytes = (one_stage - two_stage) / 8,
            "using two-stage word data"
        );
        (indexes, BitPackedArray::from_values(&distinct).freeze())
    } else {
        tracing::debug!(
            distinct = distinct.len(),
            extra_bytes = (two_stage - one_stage) / 8,
            "using one-stage word data"
        );
        (data.to_vec(), BitPackedArray::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_adapters::source::parse_patterns;
    use lexis_common::types::GrammemeSet;
    use lexis_common::utils::error::{CapacityError, SourceError};

    fn builder(lines: &[&str]) -> OfflineBuilder {
        let mut builder = OfflineBuilder::new("es_ES").unwrap();
        for line in lines {
            builder.add_entry(LexiconEntry::parse(line).unwrap()).unwrap();
        }
        builder
    }

    #[test]
    fn test_grammemes_use_sorted_table_bits() {
        let dict = builder(&["gato: noun masculine singular"]).compile().unwrap();
        // Sorted: masculine, noun, singular.
        assert_eq!(dict.lookup("gato").unwrap(), Some(GrammemeSet::from_bits(0b111)));
        assert_eq!(dict.grammeme_value("singular"), GrammemeSet::single(2));
    }

    #[test]
    fn test_word_without_grammemes() {
        let dict = builder(&["hola:", "adiós: interjection"]).compile().unwrap();
        assert_eq!(dict.lookup("hola").unwrap(), Some(GrammemeSet::EMPTY));
        assert_eq!(dict.lookup("chau").unwrap(), None);
    }

    #[test]
    fn test_normalized_form_added() {
        let dict = builder(&["Madrid: proper-noun"]).compile().unwrap();
        assert_eq!(dict.word_count(), 2);
        assert_eq!(dict.lookup("madrid").unwrap(), dict.lookup("Madrid").unwrap());
    }

    #[test]
    fn test_choose_layout() {
        let repeated = vec![5u64; 100];
        let (values, singletons) = choose_layout(&repeated);
        assert_eq!(singletons.len(), 1);
        assert!(values.iter().all(|&v| v == 0));

        let unique: Vec<u64> = (0..100).collect();
        let (values, singletons) = choose_layout(&unique);
        assert!(singletons.is_empty());
        assert_eq!(values, unique);

        let (values, singletons) = choose_layout(&[]);
        assert!(values.is_empty());
        assert!(singletons.is_empty());
    }

    #[test]
    fn test_two_stage_lookup() {
        let lines: Vec<String> = (0..200).map(|i| format!("w{i:03}: noun x=shared")).collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let dict = builder(&lines).compile().unwrap();
        assert!(dict.is_two_stage());
        assert_eq!(dict.lookup("w150").unwrap(), dict.grammeme_value("noun"));
        assert_eq!(dict.lookup_property("w007", "x").unwrap(), Some(vec!["shared".to_string()]));
    }

    #[test]
    fn test_unknown_pattern_reference() {
        let patterns = parse_patterns("p.xml", "<patterns><pattern name=\"es-o\"><pos>noun</pos></pattern></patterns>").unwrap();
        let err = builder(&["gato: noun inflection=es-x"])
            .with_patterns(patterns)
            .compile()
            .unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::UnknownPattern { ref pattern, .. }) if pattern == "es-x"));
    }

    #[test]
    fn test_inflection_property_without_table_is_plain() {
        let dict = builder(&["gato: noun inflection=es-o"]).compile().unwrap();
        assert!(!dict.has_inflection_table());
        assert_eq!(dict.lookup_property("gato", "inflection").unwrap(), Some(vec!["es-o".to_string()]));
    }

    const GRAMMEMES: [&str; 5] = ["adjective", "feminine", "masculine", "noun", "plural"];

    proptest::proptest! {
        #[test]
        fn test_lookup_agrees_with_lexicon(
            words in proptest::collection::btree_map("[a-zñ]{1,8}", proptest::bits::u8::between(0, 5), 1..60),
        ) {
            let lines: Vec<String> = words
                .iter()
                .map(|(word, mask)| {
                    let names: Vec<&str> = GRAMMEMES
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| mask & (1 << i) != 0)
                        .map(|(_, g)| *g)
                        .collect();
                    format!("{word}: {}", names.join(" ")).trim_end().to_string()
                })
                .collect();
            let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
            let dict = builder(&lines).compile().unwrap();

            proptest::prop_assert_eq!(dict.word_count(), words.len());
            for (word, mask) in &words {
                let names = GRAMMEMES
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| mask & (1 << i) != 0)
                    .map(|(_, g)| *g);
                proptest::prop_assert_eq!(dict.lookup(word).unwrap(), Some(dict.grammeme_values(names)));
            }
            proptest::prop_assert_eq!(dict.lookup("0").unwrap(), None);
        }
    }

    #[test]
    fn test_language_code_too_long() {
        assert!(matches!(
            OfflineBuilder::new("abcd_EF"),
            Err(Error::Capacity(CapacityError::LanguageCodeTooLong(_)))
        ));
    }
}
