//! Inflection pattern table.
//!
//! Patterns live in one [`BitPackedArray`] of records. A record is a packed
//! prefix, the lemma suffix ids, then one entry per inflected form:
//!
//! ```text
//! prefix: [frequency idx][pos idx][lemma count][inflection count]   (high → low)
//! lemma:  suffix id                                                  × lemma count
//! entry:  [suffix id][grammeme pattern idx]                          × inflection count
//! ```
//!
//! The identifier trie maps a pattern name to its record offset; its trie id
//! is the pattern id stored in the `inflection` word property. With affix
//! mappings, a second trie maps each lemma suffix to a run of pattern ids
//! (`[offset][count]`, high → low) in a flat run array.

use std::io::Write;

use byteorder::WriteBytesExt;
use lexis_common::memory::ByteCursor;
use lexis_common::types::GrammemeSet;
use lexis_common::utils::error::{Error, FormatError, Result};
use lexis_core::index::TrieIndex;
use lexis_core::storage::{BitPackedArray, FieldLayout, StringSet};
use serde::Serialize;

use crate::format::{self, INFLECTION_VERSION, RawArray};

const PREFIX_INFLECTIONS: usize = 0;
const PREFIX_LEMMAS: usize = 1;
const PREFIX_POS: usize = 2;
const PREFIX_FREQUENCY: usize = 3;

const ENTRY_GRAMMEMES: usize = 0;
const ENTRY_SUFFIX: usize = 1;

const RUN_COUNT: usize = 0;
const RUN_OFFSET: usize = 1;

/// One inflected form of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Inflection {
    /// Suffix that replaces the lemma suffix.
    pub suffix: String,
    /// Grammemes of the form.
    pub grammemes: GrammemeSet,
}

/// A decoded inflection pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InflectionPattern {
    /// Identifier-trie id.
    pub id: u32,
    /// Pattern name.
    pub identifier: String,
    /// Number of words following the pattern.
    pub frequency: i32,
    /// Part-of-speech grammemes.
    pub part_of_speech: GrammemeSet,
    /// Lemma suffixes, in source order.
    pub lemma_suffixes: Vec<String>,
    /// Inflected forms, in source order.
    pub inflections: Vec<Inflection>,
}

impl InflectionPattern {
    /// Returns true if some inflected form ends with exactly `suffix`.
    #[must_use]
    pub fn contains_suffix(&self, suffix: &str) -> bool {
        self.inflections.iter().any(|i| i.suffix == suffix)
    }

    /// Forms whose grammemes are all within `constraints`.
    #[must_use]
    pub fn constrain(&self, constraints: GrammemeSet) -> Vec<&Inflection> {
        self.inflections
            .iter()
            .filter(|i| constraints.contains(i.grammemes))
            .collect()
    }

    /// Forms whose suffix is a lemma suffix.
    #[must_use]
    pub fn lemma_inflections(&self) -> Vec<&Inflection> {
        self.inflections
            .iter()
            .filter(|i| self.lemma_suffixes.contains(&i.suffix))
            .collect()
    }

    /// Forms allowed by `grammemes` that match the end of `surface_form`.
    ///
    /// Only the forms with the longest matching suffix are returned.
    #[must_use]
    pub fn inflections_for_surface_form(&self, surface_form: &str, grammemes: GrammemeSet) -> Vec<&Inflection> {
        let mut results = Vec::new();
        let mut longest = None;
        for inflection in &self.inflections {
            if !grammemes.contains(inflection.grammemes) || !surface_form.ends_with(&inflection.suffix) {
                continue;
            }
            let len = inflection.suffix.len();
            match longest {
                Some(best) if len < best => continue,
                Some(best) if len == best => {}
                _ => {
                    results.clear();
                    longest = Some(len);
                }
            }
            results.push(inflection);
        }
        results
    }
}

/// Bit widths stored with the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct InflectionWidths {
    pub grammeme_index: u8,
    pub suffix_index: u8,
    pub run_offset: u8,
    pub run_length: u8,
    pub frequency: u8,
    pub part_of_speech: u8,
    pub lemma_count: u8,
    pub inflection_count: u8,
}

/// The inflection pattern table of a dictionary.
#[derive(Debug, Clone)]
pub struct InflectionTable {
    options: i16,
    grammeme_patterns: RawArray<i64>,
    suffixes: StringSet,
    records: BitPackedArray,
    widths: InflectionWidths,
    frequencies: RawArray<i32>,
    identifiers: TrieIndex,
    suffix_runs: TrieIndex,
    runs: BitPackedArray,
    prefix_layout: FieldLayout,
    entry_layout: FieldLayout,
    run_layout: FieldLayout,
}

/// The sections of an [`InflectionTable`], in file order.
pub(crate) struct InflectionParts {
    pub grammeme_patterns: RawArray<i64>,
    pub suffixes: StringSet,
    pub records: BitPackedArray,
    pub widths: InflectionWidths,
    pub frequencies: RawArray<i32>,
    pub identifiers: TrieIndex,
    pub suffix_runs: TrieIndex,
    pub runs: BitPackedArray,
}

impl InflectionTable {
    /// Assembles a table, deriving the field layouts from the widths.
    pub(crate) fn from_parts(parts: InflectionParts) -> Result<Self> {
        let w = parts.widths;
        let prefix_layout = FieldLayout::new(
            "inflection pattern prefix",
            &[w.inflection_count, w.lemma_count, w.part_of_speech, w.frequency],
            64,
        )?;
        let entry_layout = FieldLayout::new("inflection entry", &[w.grammeme_index, w.suffix_index], 64)?;
        let run_layout = FieldLayout::new("suffix run", &[w.run_length, w.run_offset], 32)?;
        Ok(Self {
            options: 0,
            grammeme_patterns: parts.grammeme_patterns,
            suffixes: parts.suffixes,
            records: parts.records,
            widths: w,
            frequencies: parts.frequencies,
            identifiers: parts.identifiers,
            suffix_runs: parts.suffix_runs,
            runs: parts.runs,
            prefix_layout,
            entry_layout,
            run_layout,
        })
    }

    /// Number of patterns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    /// Returns true if the table holds no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Number of distinct grammeme masks used by patterns.
    #[must_use]
    pub fn grammeme_pattern_count(&self) -> usize {
        self.grammeme_patterns.len()
    }

    /// Number of distinct suffixes.
    #[must_use]
    pub fn suffix_count(&self) -> usize {
        self.suffixes.len()
    }

    /// Returns true if lemma suffixes map to the patterns using them.
    #[must_use]
    pub fn has_suffix_mappings(&self) -> bool {
        !self.runs.is_empty()
    }

    /// Pattern id of `identifier`.
    #[must_use]
    pub fn pattern_id(&self, identifier: &str) -> Option<u32> {
        self.identifiers.find_id(identifier)
    }

    /// Name of the pattern with id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for an unknown id.
    pub fn identifier(&self, id: u32) -> Result<String> {
        self.identifiers.get_key(id)
    }

    /// Decodes the pattern named `identifier`.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] if the record is corrupt.
    pub fn pattern(&self, identifier: &str) -> Result<Option<InflectionPattern>> {
        self.pattern_id(identifier)
            .map(|id| self.pattern_by_id(id))
            .transpose()
    }

    /// Decodes the pattern with id `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] for an unknown id, or a
    /// [`FormatError`] if the record is corrupt.
    pub fn pattern_by_id(&self, id: u32) -> Result<InflectionPattern> {
        let offset = self.identifiers.find_by_id(id)? as usize;
        let prefix = self.records.read(offset)?;
        let inflection_count = self.prefix_layout.get(prefix, PREFIX_INFLECTIONS) as usize;
        let lemma_count = self.prefix_layout.get(prefix, PREFIX_LEMMAS) as usize;
        let pos_index = self.prefix_layout.get(prefix, PREFIX_POS) as usize;
        let frequency_index = self.prefix_layout.get(prefix, PREFIX_FREQUENCY) as usize;

        let frequency = self
            .frequencies
            .get(frequency_index)
            .ok_or_else(|| FormatError::corrupt("inflection table", format!("frequency index {frequency_index}")))?;

        let lemma_start = offset + 1;
        let lemma_suffixes = (lemma_start..lemma_start + lemma_count)
            .map(|i| self.suffixes.get(self.records.read(i)? as u32))
            .collect::<Result<Vec<_>>>()?;

        let entry_start = lemma_start + lemma_count;
        let inflections = (entry_start..entry_start + inflection_count)
            .map(|i| {
                let entry = self.records.read(i)?;
                Ok(Inflection {
                    suffix: self.suffixes.get(self.entry_layout.get(entry, ENTRY_SUFFIX) as u32)?,
                    grammemes: self.grammeme_pattern(self.entry_layout.get(entry, ENTRY_GRAMMEMES) as usize)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(InflectionPattern {
            id,
            identifier: self.identifiers.get_key(id)?,
            frequency,
            part_of_speech: self.grammeme_pattern(pos_index)?,
            lemma_suffixes,
            inflections,
        })
    }

    fn grammeme_pattern(&self, index: usize) -> Result<GrammemeSet> {
        let mask = self
            .grammeme_patterns
            .get(index)
            .ok_or_else(|| FormatError::corrupt("inflection table", format!("grammeme pattern {index}")))?;
        Ok(GrammemeSet::from_bits(mask as u64))
    }

    /// Patterns whose lemma ends in `suffix`, most frequent first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the dictionary was built without
    /// affix mappings, or a [`FormatError`] if a run is corrupt.
    pub fn patterns_for_suffix(&self, suffix: &str) -> Result<Vec<InflectionPattern>> {
        if !self.has_suffix_mappings() {
            return Err(Error::InvalidConfig(
                "dictionary was built without affix pattern mappings".to_string(),
            ));
        }
        let Some(packed) = self.suffix_runs.find(suffix) else {
            return Ok(Vec::new());
        };
        let offset = self.run_layout.get(packed, RUN_OFFSET) as usize;
        let count = self.run_layout.get(packed, RUN_COUNT) as usize;
        (offset..offset + count)
            .map(|i| self.pattern_by_id(self.runs.read(i)? as u32))
            .collect()
    }

    /// Writes the table.
    ///
    /// # Errors
    ///
    /// Returns an error if a section is too large or the writer fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let w = &self.widths;
        format::write_version(writer, INFLECTION_VERSION, self.options)?;
        format::write_count(writer, "grammeme pattern", self.grammeme_patterns.len())?;
        self.grammeme_patterns.write_to(writer)?;
        self.suffixes.write_to(writer)?;
        self.records.write_to(writer)?;
        for width in [w.grammeme_index, w.suffix_index, w.run_offset, w.run_length] {
            writer.write_u8(width)?;
        }
        format::write_count(writer, "frequency", self.frequencies.len())?;
        self.frequencies.write_to(writer)?;
        self.identifiers.write_to(writer)?;
        self.suffix_runs.write_to(writer)?;
        self.runs.write_to(writer)?;
        for width in [w.frequency, w.part_of_speech, w.lemma_count, w.inflection_count] {
            writer.write_u8(width)?;
        }
        // Prefix width, reserved.
        writer.write_u8(0)?;
        Ok(())
    }

    /// Reads a table at the cursor, sharing the cursor's bytes.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] for a foreign or truncated section.
    pub fn deserialize(cursor: &mut ByteCursor) -> Result<Self> {
        let options = format::read_version(cursor, "inflection table", INFLECTION_VERSION)?;
        let pattern_count = cursor.read_count("inflection table")?;
        let grammeme_patterns = RawArray::read(cursor, pattern_count)?;
        let suffixes = StringSet::deserialize(cursor)?;
        let records = BitPackedArray::deserialize(cursor)?;
        let mut widths = InflectionWidths {
            grammeme_index: cursor.read_u8()?,
            suffix_index: cursor.read_u8()?,
            run_offset: cursor.read_u8()?,
            run_length: cursor.read_u8()?,
            ..InflectionWidths::default()
        };
        let frequency_count = cursor.read_count("inflection table")?;
        let frequencies = RawArray::read(cursor, frequency_count)?;
        let identifiers = TrieIndex::deserialize(cursor)?;
        let suffix_runs = TrieIndex::deserialize(cursor)?;
        let runs = BitPackedArray::deserialize(cursor)?;
        widths.frequency = cursor.read_u8()?;
        widths.part_of_speech = cursor.read_u8()?;
        widths.lemma_count = cursor.read_u8()?;
        widths.inflection_count = cursor.read_u8()?;
        let prefix_width = cursor.read_u8()?;
        if prefix_width != 0 {
            return Err(FormatError::corrupt("inflection table", format!("prefix width {prefix_width}")).into());
        }

        let mut table = Self::from_parts(InflectionParts {
            grammeme_patterns,
            suffixes,
            records,
            widths,
            frequencies,
            identifiers,
            suffix_runs,
            runs,
        })
        .map_err(|e| FormatError::corrupt("inflection table", e.to_string()))?;
        table.options = options;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(b: u64) -> GrammemeSet {
        GrammemeSet::from_bits(b)
    }

    fn pattern() -> InflectionPattern {
        let form = |suffix: &str, grammemes: u64| Inflection {
            suffix: suffix.to_string(),
            grammemes: bits(grammemes),
        };
        InflectionPattern {
            id: 0,
            identifier: "es-o".to_string(),
            frequency: 10,
            part_of_speech: bits(0b1),
            lemma_suffixes: vec!["o".to_string()],
            // masculine = 0b10, feminine = 0b100, singular = 0b1000, plural = 0b10000
            inflections: vec![
                form("o", 0b01010),
                form("os", 0b10010),
                form("a", 0b01100),
                form("as", 0b10100),
            ],
        }
    }

    #[test]
    fn test_contains_suffix() {
        let p = pattern();
        assert!(p.contains_suffix("os"));
        assert!(!p.contains_suffix("es"));
    }

    #[test]
    fn test_constrain() {
        let p = pattern();
        let masculine_plural = p.constrain(bits(0b10010));
        assert_eq!(masculine_plural.len(), 1);
        assert_eq!(masculine_plural[0].suffix, "os");

        let all_masculine = p.constrain(bits(0b11010));
        assert_eq!(all_masculine.len(), 2);
        assert!(p.constrain(bits(0b10)).is_empty());
    }

    #[test]
    fn test_lemma_inflections() {
        let p = pattern();
        let lemma: Vec<_> = p.lemma_inflections().iter().map(|i| i.suffix.as_str()).collect();
        assert_eq!(lemma, vec!["o"]);
    }

    #[test]
    fn test_surface_form_prefers_longest_suffix() {
        let p = pattern();
        let any = bits(0b11110);
        let found = p.inflections_for_surface_form("gatos", any);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].suffix, "os");

        // Without plural allowed, "os" is filtered out and nothing else matches.
        assert!(p.inflections_for_surface_form("gatos", bits(0b01110)).is_empty());
        assert_eq!(p.inflections_for_surface_form("gata", any)[0].suffix, "a");
    }
}
