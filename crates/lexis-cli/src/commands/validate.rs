//! Dictionary validation command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Color};
use lexis_engine::Dictionary;
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format, console_format};

/// Validation result output.
#[derive(Serialize)]
struct ValidationOutput {
    valid: bool,
    error_count: usize,
    errors: Vec<ErrorOutput>,
}

/// Error output.
#[derive(Serialize)]
struct ErrorOutput {
    code: String,
    message: String,
}

impl ErrorOutput {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Checks that `bytes` decode and serialize back to the same bytes.
fn check(bytes: &[u8]) -> Vec<ErrorOutput> {
    let dict = match Dictionary::from_bytes(bytes.to_vec().into()) {
        Ok(dict) => dict,
        Err(e) => return vec![ErrorOutput::new("load", e.to_string())],
    };

    let mut rewritten = Vec::with_capacity(bytes.len());
    if let Err(e) = dict.write_to(&mut rewritten) {
        return vec![ErrorOutput::new("write", e.to_string())];
    }

    let mut errors = Vec::new();
    if rewritten.len() != bytes.len() {
        errors.push(ErrorOutput::new(
            "size",
            format!("re-serialized {} bytes, file has {}", rewritten.len(), bytes.len()),
        ));
    }
    if let Some(offset) = rewritten.iter().zip(bytes).position(|(a, b)| a != b) {
        errors.push(ErrorOutput::new(
            "content",
            format!("re-serialized bytes differ at offset {offset}"),
        ));
    }
    errors
}

/// Run the validate command.
pub fn run(path: &Path, format: OutputFormat, quiet: bool) -> Result<()> {
    let bytes = std::fs::read(path)?;
    let errors = check(&bytes);

    let output = ValidationOutput {
        valid: errors.is_empty(),
        error_count: errors.len(),
        errors,
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if !quiet {
                if output.valid {
                    println!("{}", console_format("✓ Dictionary is valid", Color::Green));
                } else {
                    println!("{}", console_format("✗ Dictionary has errors", Color::Red));
                    let mut table = output::create_table();
                    output::add_header(&mut table, &["Code", "Message"]);
                    for error in &output.errors {
                        table.add_row(vec![
                            Cell::new(&error.code).fg(Color::Red),
                            Cell::new(&error.message),
                        ]);
                    }
                    println!("\n{table}");
                }
            }
        }
    }

    // Return error exit code if validation failed
    if !output.valid {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexis_adapters::source::LexiconEntry;
    use lexis_engine::OfflineBuilder;

    fn dictionary_bytes() -> Vec<u8> {
        let mut builder = OfflineBuilder::new("es").unwrap();
        for line in ["gato: masculine singular", "gatos: masculine plural"] {
            builder.add_entry(LexiconEntry::parse(line).unwrap()).unwrap();
        }
        let mut bytes = Vec::new();
        builder.compile().unwrap().write_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_check_accepts_built_dictionary() {
        assert!(check(&dictionary_bytes()).is_empty());
    }

    #[test]
    fn test_check_reports_load_failure() {
        let mut bytes = dictionary_bytes();
        bytes.truncate(10);
        let errors = check(&bytes);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "load");
    }
}
