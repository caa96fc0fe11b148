//! Property value map construction.
//!
//! Every word with properties gets an offset into one flat array. At that
//! offset sit one header entry per property key, in ascending key id, then
//! all values in the same key order:
//!
//! ```text
//! [map size][value count][key id]   first header entry
//!           [value count][key id]   following header entries
//! value id ...
//! ```
//!
//! Offset 0 holds a placeholder so that 0 can mean "no properties".
//! Identical maps share one offset.

use bytes::Bytes;
use lexis_common::utils::Symbol;
use lexis_common::utils::error::{Error, Result, SourceError};
use lexis_common::utils::hash::{FxHashMap, FxHashSet};
use lexis_core::storage::{BitPackedArray, FieldLayout, StringArray, StringSet, calculate_bit_width};

use super::lexicon::WordTable;
use crate::inflection::InflectionTable;

/// Name of the property whose values are inflection pattern ids.
pub const INFLECTION_PROPERTY: &str = "inflection";

/// Fields of a property map header entry, lowest first.
pub(crate) const HEADER_KEY: usize = 0;
pub(crate) const HEADER_COUNT: usize = 1;
pub(crate) const HEADER_SIZE: usize = 2;

/// Layout of a property map header entry for `key_count` distinct keys.
pub(crate) fn header_layout(key_count: usize, bits_key_id: u8, bits_value_count: u8) -> Result<FieldLayout> {
    FieldLayout::new(
        "property map header",
        &[bits_key_id, bits_value_count, calculate_bit_width(key_count as u64)],
        32,
    )
}

/// The property sections of a dictionary.
pub(crate) struct PropertySections {
    pub names: StringArray,
    pub values: StringSet,
    pub maps: BitPackedArray<Bytes>,
    pub bits_key_id: u8,
    pub bits_value_count: u8,
    /// Map offset of each word, in word table order; 0 for none.
    pub offsets: Vec<u64>,
}

/// Builds the property sections for every word of `table`.
///
/// With an inflection table, `inflection` values are stored as pattern ids.
pub(crate) fn build(table: &WordTable, inflection: Option<&InflectionTable>) -> Result<PropertySections> {
    let strings = table.strings();
    let mut name_symbols = FxHashSet::default();
    let mut value_symbols = FxHashSet::default();
    let pattern_key = inflection.and(strings.get(INFLECTION_PROPERTY));
    let mut count_bits = 0u64;
    for record in table.words().values() {
        for property in &record.properties {
            name_symbols.insert(property.name);
            count_bits |= property.values.len() as u64;
            if Some(property.name) != pattern_key {
                value_symbols.extend(property.values.iter().copied());
            }
        }
    }

    let names = StringArray::new(name_symbols.iter().map(|&s| strings.resolve(s)))?;
    let values: StringSet = StringSet::new(value_symbols.iter().map(|&s| strings.resolve(s)))?;
    let key_ids: FxHashMap<Symbol, u64> = name_symbols
        .iter()
        .map(|&s| {
            let id = names
                .index_of(strings.resolve(s))
                .ok_or_else(|| Error::Internal("property name missing from table".to_string()))?;
            Ok((s, id as u64))
        })
        .collect::<Result<_>>()?;

    if names.is_empty() {
        return Ok(PropertySections {
            names,
            values,
            maps: BitPackedArray::from_values(&[0]).freeze(),
            bits_key_id: 0,
            bits_value_count: 0,
            offsets: vec![0; table.words().len()],
        });
    }

    let bits_key_id = calculate_bit_width(names.len() as u64 - 1);
    let bits_value_count = calculate_bit_width(count_bits);
    let layout = header_layout(names.len(), bits_key_id, bits_value_count)?;

    let mut value_ids: FxHashMap<Symbol, u64> = FxHashMap::default();
    let mut buffer: Vec<u64> = vec![0];
    let mut shared: FxHashMap<Vec<u64>, u64> = FxHashMap::default();
    let mut offsets = Vec::with_capacity(table.words().len());
    let mut map = Vec::new();

    for (word, record) in table.words() {
        if record.properties.is_empty() {
            offsets.push(0);
            continue;
        }
        let mut keyed: Vec<_> = record
            .properties
            .iter()
            .map(|p| (key_ids[&p.name], p))
            .collect();
        keyed.sort_unstable_by_key(|&(id, _)| id);

        map.clear();
        for (i, &(id, property)) in keyed.iter().enumerate() {
            let size = if i == 0 { keyed.len() as u64 } else { 0 };
            map.push(layout.pack(&[id, property.values.len() as u64, size])?);
        }
        for &(_, property) in &keyed {
            for &value in &property.values {
                let id = if Some(property.name) == pattern_key {
                    pattern_id(inflection, word, strings.resolve(value))?
                } else {
                    value_id(&mut value_ids, &values, value, strings.resolve(value))?
                };
                map.push(id);
            }
        }

        let offset = match shared.get(&map) {
            Some(&offset) => offset,
            None => {
                let offset = buffer.len() as u64;
                buffer.extend_from_slice(&map);
                shared.insert(map.clone(), offset);
                offset
            }
        };
        offsets.push(offset);
    }

    tracing::debug!(
        keys = names.len(),
        values = values.len(),
        maps = shared.len(),
        entries = buffer.len(),
        "built property value maps"
    );
    Ok(PropertySections {
        names,
        values,
        maps: BitPackedArray::from_values(&buffer).freeze(),
        bits_key_id,
        bits_value_count,
        offsets,
    })
}

fn pattern_id(inflection: Option<&InflectionTable>, word: &str, pattern: &str) -> Result<u64> {
    inflection
        .and_then(|table| table.pattern_id(pattern))
        .map(u64::from)
        .ok_or_else(|| {
            SourceError::UnknownPattern {
                word: word.to_string(),
                pattern: pattern.to_string(),
            }
            .into()
        })
}

fn value_id(cache: &mut FxHashMap<Symbol, u64>, values: &StringSet, symbol: Symbol, value: &str) -> Result<u64> {
    if let Some(&id) = cache.get(&symbol) {
        return Ok(id);
    }
    let id = values
        .id(value)
        .map(u64::from)
        .ok_or_else(|| Error::Internal(format!("property value {value:?} missing from set")))?;
    cache.insert(symbol, id);
    Ok(id)
}
