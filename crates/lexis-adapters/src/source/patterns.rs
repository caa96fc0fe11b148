//! Inflection pattern XML reader.
//!
//! ```xml
//! <patterns>
//!   <pattern name="es-o" words="1520">
//!     <pos>noun</pos>
//!     <suffix>o</suffix>
//!     <inflections>
//!       <inflection gender="masculine" number="singular">o</inflection>
//!       <inflection gender="masculine" number="plural">os</inflection>
//!     </inflections>
//!   </pattern>
//! </patterns>
//! ```
//!
//! Every attribute value of an `<inflection>` is a grammeme name; the
//! attribute names are documentation only. Unknown elements inside a
//! `<pattern>` are skipped.

use std::path::{Path, PathBuf};

use lexis_common::utils::error::{Result, SourceError};
use lexis_common::utils::hash::FxHashSet;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// One inflected form of a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InflectionSource {
    /// Suffix replacing the lemma suffix.
    pub suffix: String,
    /// Grammeme names describing the form.
    pub grammemes: Vec<String>,
}

/// One `<pattern>` element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternSource {
    /// Unique pattern identifier.
    pub name: String,
    /// Number of words following the pattern (`words` attribute, 0 if absent).
    pub frequency: i32,
    /// Part-of-speech grammeme names.
    pub parts_of_speech: Vec<String>,
    /// Lemma suffixes, in document order.
    pub lemma_suffixes: Vec<String>,
    /// Inflected forms, in document order.
    pub inflections: Vec<InflectionSource>,
}

/// Where the reader is inside a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Pos,
    Suffix,
    Inflection,
}

/// Reads and parses a pattern file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is malformed.
pub fn read_patterns(path: impl AsRef<Path>) -> Result<Vec<PatternSource>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_patterns(path, &content)
}

/// Parses pattern XML; `path` is used in error messages.
///
/// # Errors
///
/// Returns [`SourceError::Xml`] for a wrong root or child element, a pattern
/// without `name`, or invalid XML, and [`SourceError::DuplicatePattern`] when
/// two patterns share a name.
pub fn parse_patterns(path: impl Into<PathBuf>, content: &str) -> Result<Vec<PatternSource>> {
    let path = path.into();
    let xml_error = |message: String| SourceError::Xml {
        path: path.clone(),
        message,
    };

    let mut reader = Reader::from_str(content);
    let mut patterns: Vec<PatternSource> = Vec::new();
    let mut names = FxHashSet::default();
    let mut depth = 0usize;
    let mut seen_root = false;
    let mut in_inflections = false;
    let mut slot: Option<Slot> = None;
    let mut text = String::new();
    let mut pending_grammemes: Vec<String> = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| xml_error(format!("XML parse error: {e}")))?;
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_empty = matches!(event, Event::Empty(_));
                let name = element_name(e);
                match depth {
                    0 => {
                        if name != "patterns" {
                            return Err(xml_error(format!(
                                "incorrect root element, expecting <patterns>, got <{name}>"
                            ))
                            .into());
                        }
                        seen_root = true;
                    }
                    1 => {
                        if name != "pattern" {
                            return Err(xml_error(format!("expecting element <pattern>, got <{name}>")).into());
                        }
                        let pattern = start_pattern(e).map_err(xml_error)?;
                        if !names.insert(pattern.name.clone()) {
                            return Err(SourceError::DuplicatePattern(pattern.name).into());
                        }
                        patterns.push(pattern);
                    }
                    2 => match name.as_str() {
                        "pos" => slot = Some(Slot::Pos),
                        "suffix" => slot = Some(Slot::Suffix),
                        "inflections" => in_inflections = true,
                        _ => {}
                    },
                    3 if in_inflections && name == "inflection" => {
                        pending_grammemes = attribute_values(e).map_err(xml_error)?;
                        slot = Some(Slot::Inflection);
                    }
                    _ => {}
                }
                text.clear();
                if is_empty {
                    if let Some(current) = slot.take() {
                        finish_slot(current, &mut patterns, "", &mut pending_grammemes);
                    }
                    if depth == 2 && name == "inflections" {
                        in_inflections = false;
                    }
                } else {
                    depth += 1;
                }
            }
            Event::Text(ref e) => {
                if slot.is_some() {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| xml_error(format!("bad text: {err}")))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(ref e) => {
                if slot.is_some() {
                    text.push_str(&String::from_utf8_lossy(e));
                }
            }
            Event::End(ref e) => {
                depth = depth.saturating_sub(1);
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if depth == 2 && name == "inflections" {
                    in_inflections = false;
                } else if let Some(current) = slot {
                    let closes = match current {
                        Slot::Pos => depth == 2 && name == "pos",
                        Slot::Suffix => depth == 2 && name == "suffix",
                        Slot::Inflection => depth == 3 && name == "inflection",
                    };
                    if closes {
                        slot = None;
                        finish_slot(current, &mut patterns, text.trim(), &mut pending_grammemes);
                        text.clear();
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(xml_error("incorrect root element, expecting <patterns>, got nothing".to_string()).into());
    }
    tracing::debug!(path = %path.display(), patterns = patterns.len(), "read inflection patterns");
    Ok(patterns)
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn start_pattern(e: &BytesStart<'_>) -> std::result::Result<PatternSource, String> {
    let mut pattern = PatternSource::default();
    let mut has_name = false;
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("bad attribute: {err}"))?;
        let value = attr
            .unescape_value()
            .map_err(|err| format!("bad attribute value: {err}"))?;
        match attr.key.as_ref() {
            b"name" => {
                pattern.name = value.into_owned();
                has_name = true;
            }
            b"words" => pattern.frequency = parse_frequency(&value),
            _ => {}
        }
    }
    if !has_name {
        return Err("attribute \"name\" not specified in <pattern> element".to_string());
    }
    Ok(pattern)
}

/// Leading decimal digits of `value`, like `strtol`; 0 when there are none.
fn parse_frequency(value: &str) -> i32 {
    let trimmed = value.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end].parse::<i32>().map_or(0, |n| sign * n)
}

fn attribute_values(e: &BytesStart<'_>) -> std::result::Result<Vec<String>, String> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| format!("bad attribute: {err}"))?;
            attr.unescape_value()
                .map(|v| v.into_owned())
                .map_err(|err| format!("bad attribute value: {err}"))
        })
        .collect()
}

fn finish_slot(slot: Slot, patterns: &mut [PatternSource], text: &str, grammemes: &mut Vec<String>) {
    let Some(pattern) = patterns.last_mut() else {
        return;
    };
    match slot {
        Slot::Pos => pattern.parts_of_speech.push(text.to_string()),
        Slot::Suffix => pattern.lemma_suffixes.push(text.to_string()),
        Slot::Inflection => pattern.inflections.push(InflectionSource {
            suffix: text.to_string(),
            grammemes: std::mem::take(grammemes),
        }),
    }
}
