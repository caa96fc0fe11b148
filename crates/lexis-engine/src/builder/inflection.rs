//! Inflection table construction.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use lexis_adapters::source::PatternSource;
use lexis_common::utils::error::{Error, Result, SourceError};
use lexis_common::utils::hash::FxHashMap;
use lexis_core::index::TrieIndex;
use lexis_core::storage::{BitPackedArray, DedupSpanStore, FieldLayout, StringArray, StringSet, calculate_bit_width};

use crate::format::RawArray;
use crate::inflection::{InflectionParts, InflectionTable, InflectionWidths};

/// Grammeme masks in slot order, deduplicated.
#[derive(Default)]
struct GrammemePatterns {
    masks: Vec<i64>,
    slots: FxHashMap<u64, u64>,
}

impl GrammemePatterns {
    fn slot(&mut self, mask: u64) -> u64 {
        *self.slots.entry(mask).or_insert_with(|| {
            self.masks.push(mask as i64);
            self.masks.len() as u64 - 1
        })
    }
}

struct ResolvedPattern<'a> {
    source: &'a PatternSource,
    part_of_speech: u64,
    inflections: Vec<u64>,
}

fn mask_of<'a>(grammemes: &StringArray, names: impl IntoIterator<Item = &'a String>) -> Result<u64> {
    names.into_iter().try_fold(0u64, |mask, name| {
        grammemes
            .index_of(name)
            .map(|index| mask | 1 << index)
            .ok_or_else(|| SourceError::UnknownGrammeme(name.clone()).into())
    })
}

fn suffix_id(suffixes: &StringSet, suffix: &str) -> Result<u64> {
    suffixes
        .id(suffix)
        .map(u64::from)
        .ok_or_else(|| Error::Internal(format!("suffix {suffix:?} missing from set")))
}

/// Builds the inflection table for `patterns`.
///
/// Grammeme names resolve against the dictionary's sorted grammeme table.
pub(crate) fn build(patterns: &[PatternSource], grammemes: &StringArray, affix_mappings: bool) -> Result<InflectionTable> {
    let resolved = patterns
        .iter()
        .map(|source| {
            Ok(ResolvedPattern {
                source,
                part_of_speech: mask_of(grammemes, &source.parts_of_speech)?,
                inflections: source
                    .inflections
                    .iter()
                    .map(|i| mask_of(grammemes, &i.grammemes))
                    .collect::<Result<_>>()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let frequencies: Vec<i32> = patterns
        .iter()
        .map(|p| p.frequency)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    // Part-of-speech masks take the low slots so their index field stays narrow.
    let mut grammeme_patterns = GrammemePatterns::default();
    let pos_slots: Vec<u64> = resolved
        .iter()
        .map(|p| grammeme_patterns.slot(p.part_of_speech))
        .collect();
    let pos_width = calculate_bit_width(grammeme_patterns.masks.len() as u64);
    let inflection_slots: Vec<Vec<u64>> = resolved
        .iter()
        .map(|p| p.inflections.iter().map(|&m| grammeme_patterns.slot(m)).collect())
        .collect();

    let suffixes: StringSet = StringSet::new(patterns.iter().flat_map(|p| {
        p.lemma_suffixes
            .iter()
            .chain(p.inflections.iter().map(|i| &i.suffix))
    }))?;

    let (lemma_bits, inflection_bits) = patterns.iter().fold((0u64, 0u64), |(l, i), p| {
        (l | p.lemma_suffixes.len() as u64, i | p.inflections.len() as u64)
    });
    let mut widths = InflectionWidths {
        grammeme_index: calculate_bit_width(grammeme_patterns.masks.len().saturating_sub(1) as u64),
        suffix_index: calculate_bit_width(suffixes.len() as u64),
        frequency: calculate_bit_width(frequencies.len() as u64),
        part_of_speech: pos_width,
        lemma_count: calculate_bit_width(lemma_bits),
        inflection_count: calculate_bit_width(inflection_bits),
        ..InflectionWidths::default()
    };
    let prefix_layout = FieldLayout::new(
        "inflection pattern prefix",
        &[widths.inflection_count, widths.lemma_count, widths.part_of_speech, widths.frequency],
        64,
    )?;
    let entry_layout = FieldLayout::new("inflection entry", &[widths.grammeme_index, widths.suffix_index], 64)?;

    let mut records = Vec::new();
    let mut offsets = Vec::with_capacity(resolved.len());
    for (i, pattern) in resolved.iter().enumerate() {
        let source = pattern.source;
        let frequency_index = frequencies.binary_search(&source.frequency).unwrap_or_default();
        offsets.push((source.name.as_str(), records.len() as u64));
        records.push(prefix_layout.pack(&[
            source.inflections.len() as u64,
            source.lemma_suffixes.len() as u64,
            pos_slots[i],
            frequency_index as u64,
        ])?);
        for suffix in &source.lemma_suffixes {
            records.push(suffix_id(&suffixes, suffix)?);
        }
        for (inflection, &slot) in source.inflections.iter().zip(&inflection_slots[i]) {
            records.push(entry_layout.pack(&[slot, suffix_id(&suffixes, &inflection.suffix)?])?);
        }
    }
    let identifiers: TrieIndex = TrieIndex::build(offsets)?;

    let (suffix_runs, runs) = if affix_mappings {
        suffix_mappings(patterns, &identifiers, &mut widths)?
    } else {
        (TrieIndex::default(), BitPackedArray::default())
    };

    tracing::debug!(
        patterns = patterns.len(),
        grammeme_patterns = grammeme_patterns.masks.len(),
        suffixes = suffixes.len(),
        record_entries = records.len(),
        suffix_runs = suffix_runs.len(),
        "built inflection table"
    );
    InflectionTable::from_parts(InflectionParts {
        grammeme_patterns: RawArray::from_values(&grammeme_patterns.masks),
        suffixes,
        records: BitPackedArray::from_values(&records).freeze(),
        widths,
        frequencies: RawArray::from_values(&frequencies),
        identifiers,
        suffix_runs,
        runs,
    })
}

/// Maps each lemma suffix to the ids of the patterns using it, most
/// frequent first, ties by identifier.
fn suffix_mappings(
    patterns: &[PatternSource],
    identifiers: &TrieIndex,
    widths: &mut InflectionWidths,
) -> Result<(TrieIndex, BitPackedArray<Bytes>)> {
    let mut by_suffix: BTreeMap<&str, Vec<&PatternSource>> = BTreeMap::new();
    for pattern in patterns {
        let unique: BTreeSet<&str> = pattern.lemma_suffixes.iter().map(String::as_str).collect();
        for suffix in unique {
            by_suffix.entry(suffix).or_default().push(pattern);
        }
    }

    let mut store = DedupSpanStore::new();
    let mut spans = Vec::with_capacity(by_suffix.len());
    let (mut offset_bits, mut count_bits) = (0u64, 0u64);
    for (suffix, mut users) in by_suffix {
        users.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.name.cmp(&b.name)));
        let run = users
            .iter()
            .map(|p| {
                identifiers
                    .find_id(&p.name)
                    .map(u64::from)
                    .ok_or_else(|| Error::Internal(format!("pattern {:?} missing from identifiers", p.name)))
            })
            .collect::<Result<Vec<_>>>()?;
        let offset = store.get_offset(&run) as u64;
        offset_bits |= offset;
        count_bits |= run.len() as u64;
        spans.push((suffix, offset, run.len() as u64));
    }

    widths.run_offset = calculate_bit_width(offset_bits);
    widths.run_length = calculate_bit_width(count_bits);
    let layout = FieldLayout::new("suffix run", &[widths.run_length, widths.run_offset], 32)?;
    let packed = spans
        .into_iter()
        .map(|(suffix, offset, count)| Ok((suffix, layout.pack(&[count, offset])?)))
        .collect::<Result<Vec<_>>>()?;

    Ok((TrieIndex::build(packed)?, store.to_packed().freeze()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_adapters::source::parse_patterns;
    use lexis_common::memory::ByteCursor;
    use lexis_common::types::GrammemeSet;

    const PATTERNS: &str = r#"<patterns>
  <pattern name="es-o" words="1520">
    <pos>noun</pos>
    <suffix>o</suffix>
    <inflections>
      <inflection gender="masculine" number="singular">o</inflection>
      <inflection gender="masculine" number="plural">os</inflection>
    </inflections>
  </pattern>
  <pattern name="es-oa" words="2000">
    <pos>noun</pos>
    <suffix>o</suffix>
    <inflections>
      <inflection gender="masculine" number="singular">o</inflection>
      <inflection gender="feminine" number="singular">a</inflection>
    </inflections>
  </pattern>
  <pattern name="es-z" words="7">
    <pos>noun</pos>
    <suffix>z</suffix>
    <inflections>
      <inflection number="plural">ces</inflection>
    </inflections>
  </pattern>
</patterns>"#;

    fn grammemes() -> StringArray {
        StringArray::new(["feminine", "masculine", "noun", "plural", "singular"]).unwrap()
    }

    fn bit(name: &str) -> GrammemeSet {
        GrammemeSet::single(grammemes().index_of(name).unwrap()).unwrap()
    }

    fn table(affix: bool) -> InflectionTable {
        let patterns = parse_patterns("es.xml", PATTERNS).unwrap();
        build(&patterns, &grammemes(), affix).unwrap()
    }

    #[test]
    fn test_patterns_decode() {
        let table = table(false);
        assert_eq!(table.len(), 3);
        assert!(!table.has_suffix_mappings());

        let p = table.pattern("es-o").unwrap().unwrap();
        assert_eq!(p.identifier, "es-o");
        assert_eq!(p.frequency, 1520);
        assert_eq!(p.part_of_speech, bit("noun"));
        assert_eq!(p.lemma_suffixes, vec!["o"]);
        assert_eq!(p.inflections.len(), 2);
        assert_eq!(p.inflections[1].suffix, "os");
        assert_eq!(p.inflections[1].grammemes, bit("masculine") | bit("plural"));
        assert!(table.pattern("es-x").unwrap().is_none());
    }

    #[test]
    fn test_pos_slots_first() {
        let table = table(false);
        // One shared POS mask, then four distinct inflection masks.
        assert_eq!(table.grammeme_pattern_count(), 5);
        assert_eq!(table.suffix_count(), 5);
    }

    #[test]
    fn test_suffix_runs_by_frequency() {
        let table = table(true);
        assert!(table.has_suffix_mappings());
        let names: Vec<_> = table
            .patterns_for_suffix("o")
            .unwrap()
            .into_iter()
            .map(|p| p.identifier)
            .collect();
        assert_eq!(names, vec!["es-oa", "es-o"]);
        assert_eq!(table.patterns_for_suffix("z").unwrap()[0].identifier, "es-z");
        assert!(table.patterns_for_suffix("q").unwrap().is_empty());
    }

    #[test]
    fn test_suffix_lookup_without_mappings() {
        let err = table(false).patterns_for_suffix("o").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_grammeme() {
        let patterns = parse_patterns(
            "x.xml",
            "<patterns><pattern name=\"a\"><pos>verb</pos></pattern></patterns>",
        )
        .unwrap();
        let err = build(&patterns, &grammemes(), false).unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::UnknownGrammeme(ref g)) if g == "verb"));
    }

    #[test]
    fn test_serialize_round_trip() {
        for affix in [false, true] {
            let table = table(affix);
            let mut buf = Vec::new();
            table.write_to(&mut buf).unwrap();

            let mut cursor = ByteCursor::new(Bytes::from(buf.clone()));
            let loaded = InflectionTable::deserialize(&mut cursor).unwrap();
            assert_eq!(cursor.remaining(), 0);
            assert_eq!(loaded.pattern("es-z").unwrap().unwrap(), table.pattern("es-z").unwrap().unwrap());
            assert_eq!(loaded.has_suffix_mappings(), affix);

            let mut again = Vec::new();
            loaded.write_to(&mut again).unwrap();
            assert_eq!(again, buf);
        }
    }
}
