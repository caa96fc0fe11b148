//! Lexicon line-format reader.
//!
//! ```text
//! gato: noun masculine singular inflection=es-o
//! gatos: noun masculine plural
//! ====
//! ```
//!
//! Each line is a word, `": "`, then space-separated annotations. A token
//! of the form `name=value` is a property value; any other token is a
//! grammeme. A line starting with `====` ends the data, and everything
//! after it is ignored.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use lexis_common::utils::error::{Result, SourceError};

const END_MARKER: &str = "====";
const LFS_POINTER: &str = "version https://git-lfs.github.com/";
const DELIMITER: &str = ": ";

/// One parsed lexicon line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexiconEntry {
    /// The word exactly as written.
    pub word: String,
    /// Grammeme names, in line order.
    pub grammemes: Vec<String>,
    /// `(name, value)` pairs, in line order.
    pub properties: Vec<(String, String)>,
}

impl LexiconEntry {
    /// Parses one non-blank line.
    ///
    /// Returns `None` when the line has no `": "` delimiter. A line ending
    /// in a bare `':'` is a word with no annotations.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (word, annotations) = match line.find(DELIMITER) {
            Some(idx) => (&line[..idx], &line[idx + DELIMITER.len()..]),
            None => (line.strip_suffix(':')?, ""),
        };

        let mut entry = Self {
            word: word.to_string(),
            ..Self::default()
        };
        for token in annotations.split(' ').filter(|t| !t.is_empty()) {
            match token.split_once('=') {
                Some((name, value)) => entry.properties.push((name.to_string(), value.to_string())),
                None => entry.grammemes.push(token.to_string()),
            }
        }
        Some(entry)
    }
}

/// Streaming reader over a lexicon file.
///
/// Yields one [`LexiconEntry`] per data line and fails on the first
/// malformed line.
pub struct LexiconReader<R> {
    lines: Lines<R>,
    path: PathBuf,
    locale: String,
    line: usize,
    done: bool,
}

impl LexiconReader<BufReader<File>> {
    /// Opens a lexicon file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>, locale: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::new(BufReader::new(file), path, locale))
    }
}

impl<R: BufRead> LexiconReader<R> {
    /// Reads lexicon lines from `reader`; `path` and `locale` are used in
    /// error messages only.
    pub fn new(reader: R, path: impl Into<PathBuf>, locale: &str) -> Self {
        Self {
            lines: reader.lines(),
            path: path.into(),
            locale: locale.to_string(),
            line: 0,
            done: false,
        }
    }

    /// Number of lines consumed so far.
    #[must_use]
    pub fn line_number(&self) -> usize {
        self.line
    }

    fn next_entry(&mut self) -> Result<Option<LexiconEntry>> {
        loop {
            let Some(raw) = self.lines.next() else {
                return Err(SourceError::MissingEndMarker {
                    path: self.path.clone(),
                }
                .into());
            };
            let raw = raw?;
            self.line += 1;
            let text = raw.strip_suffix('\r').unwrap_or(&raw);

            if self.line == 1 && text.starts_with(LFS_POINTER) {
                return Err(SourceError::LfsPointer {
                    path: self.path.clone(),
                    locale: self.locale.clone(),
                }
                .into());
            }
            if text.starts_with(END_MARKER) {
                return Ok(None);
            }
            if text.trim().is_empty() {
                continue;
            }
            return LexiconEntry::parse(text).map(Some).ok_or_else(|| {
                SourceError::MissingDelimiter {
                    path: self.path.clone(),
                    line: self.line,
                }
                .into()
            });
        }
    }
}

impl<R: BufRead> Iterator for LexiconReader<R> {
    type Item = Result<LexiconEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_common::utils::error::Error;
    use std::io::Cursor;

    fn read(text: &str) -> Result<Vec<LexiconEntry>> {
        LexiconReader::new(Cursor::new(text), "es.lst", "es_ES").collect()
    }

    #[test]
    fn test_parse_line() {
        let entry = LexiconEntry::parse("gato: noun masculine singular inflection=es-o").unwrap();
        assert_eq!(entry.word, "gato");
        assert_eq!(entry.grammemes, vec!["noun", "masculine", "singular"]);
        assert_eq!(entry.properties, vec![("inflection".to_string(), "es-o".to_string())]);
    }

    #[test]
    fn test_parse_multiword_and_repeated_property() {
        let entry = LexiconEntry::parse("New York: proper-noun wikidata=Q60 wikidata=Q1384").unwrap();
        assert_eq!(entry.word, "New York");
        assert_eq!(entry.grammemes, vec!["proper-noun"]);
        assert_eq!(entry.properties.len(), 2);
    }

    #[test]
    fn test_parse_trailing_colon() {
        let entry = LexiconEntry::parse("hola:").unwrap();
        assert_eq!(entry.word, "hola");
        assert!(entry.grammemes.is_empty());
        assert!(LexiconEntry::parse("hola").is_none());
    }

    #[test]
    fn test_reader_stops_at_marker() {
        let entries = read("gato: noun\n\ngata: noun feminine\n====\nignored line\n").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].word, "gata");
    }

    #[test]
    fn test_reader_crlf() {
        let entries = read("gato: noun\r\n====\r\n").unwrap();
        assert_eq!(entries[0].grammemes, vec!["noun"]);
    }

    #[test]
    fn test_missing_end_marker() {
        let err = read("gato: noun\n").unwrap_err();
        assert!(matches!(err, Error::Source(SourceError::MissingEndMarker { .. })));
    }

    #[test]
    fn test_missing_delimiter_reports_line() {
        let err = read("gato: noun\nperro noun\n====\n").unwrap_err();
        match err {
            Error::Source(SourceError::MissingDelimiter { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_lfs_pointer() {
        let err = read("version https://git-lfs.github.com/spec/v1\noid sha256:abc\n").unwrap_err();
        assert!(err.to_string().contains("es_ES"));
    }
}
