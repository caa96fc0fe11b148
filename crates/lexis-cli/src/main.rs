//! Lexis CLI - builds and inspects compiled dictionaries.
//!
//! `build` compiles lexicon and inflection pattern sources into a single
//! dictionary file. The remaining commands open a compiled file read-only.

mod commands;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Lexis dictionary tool.
///
/// Compiles word lists into compact memory-mappable dictionaries and
/// queries the result.
#[derive(Parser)]
#[command(name = "lexis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress progress and info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format (default for TTY)
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Compile a lexicon into a dictionary file
    Build(BuildArgs),

    /// Display dictionary information (language, counts, section sizes)
    Info {
        /// Path to the dictionary
        path: PathBuf,
    },

    /// Look up the grammemes or a property of a word
    Lookup {
        /// Path to the dictionary
        path: PathBuf,

        /// Word to look up
        word: String,

        /// Property name to fetch instead of grammemes
        #[arg(long)]
        property: Option<String>,
    },

    /// List words starting with a prefix
    Scan {
        /// Path to the dictionary
        path: PathBuf,

        /// Key prefix
        prefix: String,

        /// Maximum number of words to print
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Validate that a dictionary loads and re-serializes byte for byte
    Validate {
        /// Path to the dictionary
        path: PathBuf,
    },
}

/// Arguments of the build command.
#[derive(clap::Args)]
struct BuildArgs {
    /// Locale of the lexicon, e.g. es_ES
    #[arg(long)]
    locale: String,

    /// Main lexicon file
    #[arg(long)]
    infile: PathBuf,

    /// Dictionary file to write
    #[arg(long)]
    outfile: PathBuf,

    /// Lexicon read after the main file, overriding its entries
    #[arg(long)]
    supplementalfile: Option<PathBuf>,

    /// Inflection pattern XML file
    #[arg(long)]
    inflectionfile: Option<PathBuf>,

    /// Also store suffix to pattern mappings
    #[arg(long, requires = "inflectionfile")]
    affix_patterns_mappings: bool,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .init();
    }

    let result = match cli.command {
        Commands::Build(args) => commands::build::run(args, cli.verbose, cli.format, cli.quiet),
        Commands::Info { path } => commands::info::run(&path, cli.format, cli.quiet),
        Commands::Lookup { path, word, property } => {
            commands::lookup::run(&path, &word, property.as_deref(), cli.format, cli.quiet)
        }
        Commands::Scan { path, prefix, limit } => {
            commands::scan::run(&path, &prefix, limit, cli.format, cli.quiet)
        }
        Commands::Validate { path } => commands::validate::run(&path, cli.format, cli.quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    const BUILD: [&str; 8] = [
        "lexis", "build", "--locale", "es_ES", "--infile", "es.lst", "--outfile", "es.dict",
    ];

    #[test]
    fn test_build_args() {
        let cli = Cli::try_parse_from(BUILD).unwrap();
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.locale, "es_ES");
        assert!(args.supplementalfile.is_none());
        assert!(!args.affix_patterns_mappings);
    }

    #[test]
    fn test_affix_mappings_require_inflection_file() {
        let mut argv = BUILD.to_vec();
        argv.push("--affix-patterns-mappings");
        let err = Cli::try_parse_from(argv.iter().copied()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        argv.extend(["--inflectionfile", "es.xml"]);
        let cli = Cli::try_parse_from(argv.iter().copied()).unwrap();
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert!(args.affix_patterns_mappings);
        assert_eq!(args.inflectionfile.as_deref(), Some(std::path::Path::new("es.xml")));
    }

    #[test]
    fn test_build_requires_outfile() {
        let err = Cli::try_parse_from(BUILD[..6].iter().copied()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
