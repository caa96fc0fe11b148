//! Dictionary build command.

use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use lexis_engine::{BuildConfig, OfflineBuilder};
use serde::Serialize;

use crate::output::{self, Format};
use crate::{BuildArgs, OutputFormat};

/// Build result output.
#[derive(Serialize)]
struct BuildOutput<'a> {
    config: &'a BuildConfig,
    outfile: String,
    bytes: u64,
    words: usize,
    grammemes: usize,
    two_stage: bool,
    property_names: usize,
    inflection_patterns: usize,
    suffix_mappings: bool,
    normalization_collisions: usize,
}

/// Turns command-line arguments into a build configuration.
fn config_from_args(args: BuildArgs, verbose: bool) -> BuildConfig {
    let mut config = BuildConfig::new(args.locale, &args.infile, &args.outfile)
        .with_affix_mappings(args.affix_patterns_mappings)
        .with_verbose(verbose);
    if let Some(path) = &args.supplementalfile {
        config = config.with_supplemental(path);
    }
    if let Some(path) = &args.inflectionfile {
        config = config.with_inflection(path);
    }
    config
}

/// Run the build command.
pub fn run(args: BuildArgs, verbose: bool, format: OutputFormat, quiet: bool) -> Result<()> {
    let config = config_from_args(args, verbose);

    let spinner = if quiet {
        ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(ProgressStyle::with_template("{spinner:.dim} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Reading {}", config.infile.display()));

    let builder = OfflineBuilder::from_config(&config)
        .with_context(|| format!("failed to read sources for locale {}", config.locale))?;

    spinner.set_message(format!("Compiling {} words", builder.word_count()));
    let summary = builder
        .write(&config.outfile)
        .with_context(|| format!("failed to build {}", config.outfile.display()))?;
    spinner.finish_and_clear();

    let out = BuildOutput {
        config: &config,
        outfile: summary.outfile.display().to_string(),
        bytes: summary.bytes,
        words: summary.stats.words,
        grammemes: summary.stats.grammemes,
        two_stage: summary.two_stage,
        property_names: summary.stats.property_names,
        inflection_patterns: summary.stats.inflection_patterns,
        suffix_mappings: summary.stats.suffix_mappings,
        normalization_collisions: summary.normalization_collisions,
    };

    match Format::from(format) {
        Format::Json => output::print_json(&out, quiet)?,
        Format::Table => {
            output::success(&format!("Built {}", out.outfile), quiet);
            let items = vec![
                ("Language", summary.stats.language.as_str().to_string()),
                ("Size", format_bytes(out.bytes)),
                ("Words", out.words.to_string()),
                ("Grammemes", out.grammemes.to_string()),
                ("Two-stage word data", out.two_stage.to_string()),
                ("Property names", out.property_names.to_string()),
                ("Inflection patterns", out.inflection_patterns.to_string()),
                ("Suffix mappings", out.suffix_mappings.to_string()),
                ("Lowercase collisions", out.normalization_collisions.to_string()),
            ];
            output::print_key_value_table(&items, quiet);
        }
    }

    Ok(())
}

/// Format bytes into human-readable form.
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
