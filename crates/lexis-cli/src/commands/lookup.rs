//! Word lookup command.

use std::path::Path;

use anyhow::{Context, Result};
use comfy_table::{Cell, Color};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Lookup result output.
#[derive(Serialize)]
struct LookupOutput {
    word: String,
    found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    property: Option<String>,
    values: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    inflection_patterns: Vec<String>,
}

/// Run the lookup command.
pub fn run(
    path: &Path,
    word: &str,
    property: Option<&str>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let dict = super::open(path)?;

    let output = match property {
        Some(name) => {
            let values = dict
                .lookup_property(word, name)
                .with_context(|| format!("failed to read property {name} of {word}"))?;
            LookupOutput {
                word: word.to_string(),
                found: values.is_some(),
                property: Some(name.to_string()),
                values: values.unwrap_or_default(),
                inflection_patterns: Vec::new(),
            }
        }
        None => {
            let grammemes = dict
                .lookup(word)
                .with_context(|| format!("failed to look up {word}"))?;
            let inflection_patterns = if grammemes.is_some() && dict.has_inflection_table() {
                dict.inflection_patterns_for_word(word)?
                    .into_iter()
                    .map(|p| p.identifier)
                    .collect()
            } else {
                Vec::new()
            };
            LookupOutput {
                word: word.to_string(),
                found: grammemes.is_some(),
                property: None,
                values: grammemes.map(|set| dict.grammeme_names(set)).unwrap_or_default(),
                inflection_patterns,
            }
        }
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if !output.found {
                output::status(&format!("{} is not in the dictionary", output.word), quiet);
                return Ok(());
            }
            if quiet {
                return Ok(());
            }
            let mut table = output::create_table();
            let label = output.property.as_deref().unwrap_or("Grammemes");
            output::add_header(&mut table, &["Word", label]);
            table.add_row(vec![
                Cell::new(&output.word).fg(Color::Green),
                Cell::new(output.values.join(" ")),
            ]);
            if !output.inflection_patterns.is_empty() {
                table.add_row(vec![
                    Cell::new("inflection").fg(Color::Yellow),
                    Cell::new(output.inflection_patterns.join(" ")),
                ]);
            }
            println!("{table}");
        }
    }

    Ok(())
}
