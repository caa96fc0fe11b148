//! Dictionary info command.

use std::path::Path;

use anyhow::Result;
use lexis_engine::DictionaryStats;
use serde::Serialize;

use super::build::format_bytes;
use crate::OutputFormat;
use crate::output::{self, Format};

/// Information about a dictionary file.
#[derive(Serialize)]
struct DictionaryInfoOutput {
    path: String,
    bytes: u64,
    two_stage: bool,
    #[serde(flatten)]
    stats: DictionaryStats,
    grammeme_names: Vec<String>,
    property_keys: Vec<String>,
}

/// Run the info command.
pub fn run(path: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let dict = super::open(path)?;
    let bytes = std::fs::metadata(path)?.len();

    let output = DictionaryInfoOutput {
        path: path.display().to_string(),
        bytes,
        two_stage: dict.is_two_stage(),
        stats: dict.stats(),
        grammeme_names: dict.grammemes().map(str::to_string).collect(),
        property_keys: dict.property_names().map(str::to_string).collect(),
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            let stats = &output.stats;
            let items = vec![
                ("Path", output.path.clone()),
                ("Size", format_bytes(output.bytes)),
                ("Language", stats.language.as_str().to_string()),
                ("Words", stats.words.to_string()),
                ("Grammemes", output.grammeme_names.join(" ")),
                ("Grammeme combinations", stats.type_singletons.to_string()),
                ("Two-stage word data", output.two_stage.to_string()),
                ("Word data singletons", stats.data_singletons.to_string()),
                ("Property names", output.property_keys.join(" ")),
                ("Property values", stats.property_values.to_string()),
                ("Property map entries", stats.property_map_entries.to_string()),
                ("Inflection patterns", stats.inflection_patterns.to_string()),
                ("Suffix mappings", stats.suffix_mappings.to_string()),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }

    Ok(())
}
