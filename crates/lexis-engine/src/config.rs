//! Build configuration.

use std::path::{Path, PathBuf};

use lexis_common::utils::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options for one dictionary build.
///
/// # Examples
///
/// ```
/// use lexis_engine::BuildConfig;
///
/// let config = BuildConfig::new("es_ES", "es.lst", "es.dict")
///     .with_inflection("es-patterns.xml")
///     .with_affix_mappings(true);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Locale being built; its language subtag goes into the header.
    pub locale: String,

    /// Main lexicon file.
    pub infile: PathBuf,

    /// Where the compiled dictionary is written.
    pub outfile: PathBuf,

    /// Lexicon read after `infile` into the same dictionary.
    pub supplemental: Option<PathBuf>,

    /// Inflection pattern XML. Enables the inflection table.
    pub inflection: Option<PathBuf>,

    /// Store the lemma suffix → pattern mappings.
    pub affix_mappings: bool,

    /// Emit per-section debug logging.
    pub verbose: bool,
}

impl BuildConfig {
    /// Creates a configuration with only the required inputs.
    #[must_use]
    pub fn new(locale: impl Into<String>, infile: impl AsRef<Path>, outfile: impl AsRef<Path>) -> Self {
        Self {
            locale: locale.into(),
            infile: infile.as_ref().to_path_buf(),
            outfile: outfile.as_ref().to_path_buf(),
            supplemental: None,
            inflection: None,
            affix_mappings: false,
            verbose: false,
        }
    }

    /// Adds a supplemental lexicon.
    #[must_use]
    pub fn with_supplemental(mut self, path: impl AsRef<Path>) -> Self {
        self.supplemental = Some(path.as_ref().to_path_buf());
        self
    }

    /// Adds an inflection pattern file.
    #[must_use]
    pub fn with_inflection(mut self, path: impl AsRef<Path>) -> Self {
        self.inflection = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables or disables the suffix → pattern mappings.
    #[must_use]
    pub fn with_affix_mappings(mut self, enabled: bool) -> Self {
        self.affix_mappings = enabled;
        self
    }

    /// Enables or disables verbose logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Lexicon files in reading order.
    pub fn lexicons(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.infile.as_path()).chain(self.supplemental.as_deref())
    }

    /// Checks option combinations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when affix mappings are requested
    /// without an inflection file.
    pub fn validate(&self) -> Result<()> {
        if self.affix_mappings && self.inflection.is_none() {
            return Err(Error::InvalidConfig(
                "affix pattern mappings require an inflection file".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_methods() {
        let config = BuildConfig::new("es_ES", "es.lst", "out/es.dict")
            .with_supplemental("es-extra.lst")
            .with_verbose(true);
        assert_eq!(config.locale, "es_ES");
        assert!(config.verbose);
        let lexicons: Vec<_> = config.lexicons().collect();
        assert_eq!(lexicons, vec![Path::new("es.lst"), Path::new("es-extra.lst")]);
    }

    #[test]
    fn test_affix_requires_inflection() {
        let config = BuildConfig::new("es", "a", "b").with_affix_mappings(true);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        assert!(config.with_inflection("p.xml").validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let config = BuildConfig::new("de", "de.lst", "de.dict").with_inflection("de.xml");
        let json = serde_json::to_string(&config).unwrap();
        let back: BuildConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
