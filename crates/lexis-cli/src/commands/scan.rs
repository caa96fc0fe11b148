//! Prefix scan command.

use std::path::Path;

use anyhow::Result;
use comfy_table::{Cell, Color};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// One scanned word.
#[derive(Serialize)]
struct ScanEntry {
    word: String,
    grammemes: Vec<String>,
}

/// Scan result output.
#[derive(Serialize)]
struct ScanOutput {
    prefix: String,
    count: usize,
    truncated: bool,
    words: Vec<ScanEntry>,
}

/// Run the scan command.
pub fn run(
    path: &Path,
    prefix: &str,
    limit: Option<usize>,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let dict = super::open(path)?;
    let limit = limit.unwrap_or(usize::MAX);

    let mut words = Vec::new();
    let mut truncated = false;
    for item in dict.prefix_scan(prefix) {
        let (word, grammemes) = item?;
        if words.len() == limit {
            truncated = true;
            break;
        }
        words.push(ScanEntry {
            word,
            grammemes: dict.grammeme_names(grammemes),
        });
    }

    let output = ScanOutput {
        prefix: prefix.to_string(),
        count: words.len(),
        truncated,
        words,
    };

    let fmt: Format = format.into();
    match fmt {
        Format::Json => output::print_json(&output, quiet)?,
        Format::Table => {
            if output.words.is_empty() {
                output::status(&format!("No words start with {:?}", output.prefix), quiet);
                return Ok(());
            }
            if quiet {
                return Ok(());
            }
            let mut table = output::create_table();
            output::add_header(&mut table, &["Word", "Grammemes"]);
            for entry in &output.words {
                table.add_row(vec![
                    Cell::new(&entry.word).fg(Color::Green),
                    Cell::new(entry.grammemes.join(" ")),
                ]);
            }
            println!("{table}");
            if output.truncated {
                println!("(showing the first {} words)", output.count);
            }
        }
    }

    Ok(())
}
