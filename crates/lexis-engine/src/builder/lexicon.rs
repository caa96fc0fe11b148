//! In-memory word table filled from lexicon entries.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use lexis_adapters::source::LexiconEntry;
use lexis_common::types::{GrammemeSet, LanguageCode};
use lexis_common::utils::error::{CapacityError, Result};
use lexis_common::utils::hash::FxIndexSet;
use lexis_common::utils::{Interner, Symbol};
use smallvec::{SmallVec, smallvec};

/// Most values one property of one word may carry.
pub const MAX_PROPERTY_VALUES: usize = 255;

/// Values of one property, in line order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PropertyValues {
    pub name: Symbol,
    pub values: SmallVec<[Symbol; 2]>,
}

/// What the lexicon says about one word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct WordRecord {
    /// Grammemes, as first-seen bits.
    pub grammemes: u64,
    pub properties: SmallVec<[PropertyValues; 2]>,
}

/// Words, grammemes and property strings collected from lexicon files.
pub(crate) struct WordTable {
    locale: String,
    language: LanguageCode,
    /// Grammeme names; the position of a name is its first-seen bit.
    grammemes: FxIndexSet<String>,
    strings: Interner,
    words: BTreeMap<String, WordRecord>,
    collisions: usize,
}

impl WordTable {
    pub fn new(locale: &str, language: LanguageCode) -> Self {
        Self {
            locale: locale.to_string(),
            language,
            grammemes: FxIndexSet::default(),
            strings: Interner::new(),
            words: BTreeMap::new(),
            collisions: 0,
        }
    }

    pub fn language(&self) -> LanguageCode {
        self.language
    }

    pub fn words(&self) -> &BTreeMap<String, WordRecord> {
        &self.words
    }

    pub fn grammemes(&self) -> &FxIndexSet<String> {
        &self.grammemes
    }

    pub fn strings(&self) -> &Interner {
        &self.strings
    }

    /// Normalized forms skipped because the key was already present.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    fn grammeme_bit(&mut self, name: &str) -> Result<u64> {
        if let Some(index) = self.grammemes.get_index_of(name) {
            return Ok(1 << index);
        }
        if self.grammemes.len() >= GrammemeSet::MAX_GRAMMEMES {
            return Err(CapacityError::TooManyGrammemes {
                locale: self.locale.clone(),
                grammeme: name.to_string(),
            }
            .into());
        }
        let (index, _) = self.grammemes.insert_full(name.to_string());
        Ok(1 << index)
    }

    /// Adds one lexicon line.
    ///
    /// The entry replaces the grammemes of an earlier line for the same
    /// word, and its properties unless it has none. The lowercase form gets
    /// the grammemes only if it is a new key, and the properties only if it
    /// has none yet.
    pub fn add(&mut self, entry: LexiconEntry) -> Result<()> {
        let mut record = WordRecord::default();
        for grammeme in &entry.grammemes {
            record.grammemes |= self.grammeme_bit(grammeme)?;
        }
        for (name, value) in &entry.properties {
            let name = self.strings.intern(name);
            let value = self.strings.intern(value);
            match record.properties.iter_mut().find(|p| p.name == name) {
                Some(property) => property.values.push(value),
                None => record.properties.push(PropertyValues {
                    name,
                    values: smallvec![value],
                }),
            }
        }
        if let Some(property) = record
            .properties
            .iter()
            .find(|p| p.values.len() > MAX_PROPERTY_VALUES)
        {
            return Err(CapacityError::TooManyPropertyValues {
                locale: self.locale.clone(),
                word: entry.word,
                property: self.strings.resolve(property.name).to_string(),
                count: property.values.len(),
            }
            .into());
        }

        let normalized = self.language.lowercase(&entry.word);
        if normalized != entry.word {
            match self.words.entry(normalized) {
                Entry::Vacant(slot) => {
                    slot.insert(record.clone());
                }
                Entry::Occupied(mut slot) => {
                    tracing::trace!(word = %entry.word, normalized = %slot.key(), "normalized form already present");
                    self.collisions += 1;
                    let existing = slot.get_mut();
                    if existing.properties.is_empty() {
                        existing.properties = record.properties.clone();
                    }
                }
            }
        }
        match self.words.entry(entry.word) {
            Entry::Vacant(slot) => {
                slot.insert(record);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.grammemes = record.grammemes;
                if !record.properties.is_empty() {
                    existing.properties = record.properties;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> WordTable {
        WordTable::new("es_ES", LanguageCode::from_locale("es_ES").unwrap())
    }

    fn entry(line: &str) -> LexiconEntry {
        LexiconEntry::parse(line).unwrap()
    }

    #[test]
    fn test_first_seen_bits() {
        let mut t = table();
        t.add(entry("gato: noun masculine singular")).unwrap();
        t.add(entry("gata: noun feminine singular")).unwrap();
        assert_eq!(t.words()["gato"].grammemes, 0b0111);
        assert_eq!(t.words()["gata"].grammemes, 0b1101);
        assert_eq!(t.grammemes().get_index_of("feminine"), Some(3));
    }

    #[test]
    fn test_properties_grouped_by_name() {
        let mut t = table();
        t.add(entry("Roma: proper-noun wikidata=Q220 inflection=x wikidata=Q1")).unwrap();
        let record = &t.words()["Roma"];
        assert_eq!(record.properties.len(), 2);
        let values: Vec<_> = record.properties[0]
            .values
            .iter()
            .map(|&s| t.strings().resolve(s))
            .collect();
        assert_eq!(values, vec!["Q220", "Q1"]);
    }

    #[test]
    fn test_normalized_form_does_not_overwrite() {
        let mut t = table();
        t.add(entry("roma: noun")).unwrap();
        t.add(entry("Roma: proper-noun")).unwrap();
        assert_eq!(t.words()["roma"].grammemes, 0b01);
        assert_eq!(t.words()["Roma"].grammemes, 0b10);
        assert_eq!(t.collisions(), 1);

        // An exact entry still replaces a normalized copy.
        t.add(entry("Sol: proper-noun")).unwrap();
        t.add(entry("sol: noun")).unwrap();
        assert_eq!(t.words()["sol"].grammemes, 0b01);
    }

    #[test]
    fn test_later_line_replaces_word() {
        let mut t = table();
        t.add(entry("gato: noun a=1")).unwrap();
        t.add(entry("gato: verb b=2")).unwrap();
        let record = &t.words()["gato"];
        assert_eq!(record.grammemes, 0b10);
        assert_eq!(record.properties.len(), 1);
        assert_eq!(t.strings().resolve(record.properties[0].name), "b");
    }

    #[test]
    fn test_later_line_without_properties_keeps_them() {
        let mut t = table();
        t.add(entry("gata: feminine singular wikidata=Q1")).unwrap();
        t.add(entry("gata: feminine plural")).unwrap();
        let record = &t.words()["gata"];
        assert_eq!(record.grammemes, 0b101);
        assert_eq!(record.properties.len(), 1);
        let values: Vec<_> = record.properties[0]
            .values
            .iter()
            .map(|&s| t.strings().resolve(s))
            .collect();
        assert_eq!(values, vec!["Q1"]);
    }

    #[test]
    fn test_normalized_form_takes_properties_separately() {
        let mut t = table();
        t.add(entry("roma: noun")).unwrap();
        t.add(entry("Roma: proper-noun wikidata=Q220")).unwrap();
        let roma = &t.words()["roma"];
        assert_eq!(roma.grammemes, 0b01);
        assert_eq!(roma.properties.len(), 1);
        assert_eq!(t.strings().resolve(roma.properties[0].values[0]), "Q220");

        // Existing properties of the lowercase key are not replaced.
        t.add(entry("ROMA: noun wikidata=Q9")).unwrap();
        assert_eq!(t.strings().resolve(t.words()["roma"].properties[0].values[0]), "Q220");
    }

    #[test]
    fn test_too_many_grammemes() {
        let mut t = table();
        let names: Vec<String> = (0..63).map(|i| format!("g{i}")).collect();
        t.add(entry(&format!("w: {}", names.join(" ")))).unwrap();
        let err = t.add(entry("x: g64")).unwrap_err();
        assert!(err.to_string().contains("g64"));
    }

    #[test]
    fn test_too_many_property_values() {
        let mut t = table();
        let values: Vec<String> = (0..256).map(|i| format!("p={i}")).collect();
        let err = t.add(entry(&format!("w: {}", values.join(" ")))).unwrap_err();
        assert!(err.to_string().contains("256"));

        let values: Vec<String> = (0..255).map(|i| format!("p={i}")).collect();
        assert!(t.add(entry(&format!("w: {}", values.join(" ")))).is_ok());
    }
}
