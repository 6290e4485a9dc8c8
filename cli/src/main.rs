//! mdmend CLI - Markdown sanitization tool
//!
//! A command-line tool for repairing structurally broken Markdown produced
//! by language models.

use clap::{Parser, Subcommand};
use colored::*;
use mdmend::{sanitize_with_report, SanitizeOptions, SanitizeReport};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Markdown sanitization and repair for model-produced text
#[derive(Parser)]
#[command(
    name = "mdmend",
    version,
    about = "Repair structurally broken Markdown from language models",
    long_about = "mdmend - Markdown sanitization and repair tool.\n\n\
                  Closes unterminated code fences, splits inline code off opening\n\
                  fence lines, collapses duplicated lines, normalizes heading and\n\
                  list markers, and strips invisible Unicode.\n\n\
                  Usage:\n  \
                  mdmend <file>             Sanitize a file to stdout\n  \
                  mdmend <file> <output>    Sanitize a file to a new file\n  \
                  mdmend check <file>       Report defects without writing output"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input file path, or `-` for stdin (for default sanitization)
    input: Option<PathBuf>,

    /// Output file path (for default sanitization)
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize a document (default command)
    Sanitize {
        /// Input file path, or `-` for stdin
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print a repair summary to stderr
        #[arg(long)]
        report: bool,

        /// Skip duplicate-line removal
        #[arg(long)]
        no_dedup: bool,

        /// Skip heading/list marker normalization
        #[arg(long)]
        no_structure: bool,

        /// Skip fence repair
        #[arg(long)]
        no_fences: bool,
    },

    /// Check a document for defects without writing repaired output
    ///
    /// Exits with status 1 when the document needed repair.
    Check {
        /// Input file path, or `-` for stdin
        input: PathBuf,

        /// Output the repair report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Handle default command (mdmend <file> [output])
    let command = match cli.command {
        Some(command) => command,
        None => match cli.input {
            Some(input) => Commands::Sanitize {
                input,
                output: cli.output,
                report: false,
                no_dedup: false,
                no_structure: false,
                no_fences: false,
            },
            None => {
                use clap::CommandFactory;
                Cli::command().print_help()?;
                return Ok(ExitCode::SUCCESS);
            }
        },
    };

    match command {
        Commands::Sanitize {
            input,
            output,
            report,
            no_dedup,
            no_structure,
            no_fences,
        } => {
            let text = read_input(&input)?;

            let mut options = SanitizeOptions::new();
            if no_dedup {
                options = options.without_dedup();
            }
            if no_structure {
                options = options.without_structure();
            }
            if no_fences {
                options = options.without_fence_repair();
            }

            let (repaired, summary) = sanitize_with_report(&text, &options);
            write_output(output.as_ref(), &repaired)?;

            if let Some(path) = output {
                println!("{} Sanitized to {}", "✓".green().bold(), path.display());
            }
            if report {
                print_report(&summary);
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Check { input, json } => {
            let text = read_input(&input)?;
            let (_, summary) = sanitize_with_report(&text, &SanitizeOptions::default());

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else if summary.modified() {
                println!("{} Document needs repair", "!".yellow().bold());
                print_report(&summary);
            } else {
                println!("{} No defects found", "✓".green().bold());
            }

            if summary.modified() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }

        Commands::Version => {
            println!("{} {}", "mdmend".green().bold(), env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Read input from a file, or from stdin when the path is `-`.
fn read_input(path: &PathBuf) -> io::Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(path)
    }
}

/// Write output to a file, or to stdout when no path is given.
fn write_output(path: Option<&PathBuf>, content: &str) -> io::Result<()> {
    match path {
        Some(path) => fs::write(path, content),
        None => io::stdout().write_all(content.as_bytes()),
    }
}

fn print_report(report: &SanitizeReport) {
    eprintln!("{}", "Repair Summary".cyan().bold());
    eprintln!("{}", "─".repeat(40));
    print_count("Invisible glyphs removed", report.glyphs_removed);
    print_count("Glyphs folded", report.glyphs_folded);
    print_count("Dangling backslashes", report.backslashes_stripped);
    print_count("Duplicate lines dropped", report.duplicate_lines_dropped);
    print_count(
        "Structural duplicates dropped",
        report.structural_duplicates_dropped,
    );
    print_count("Headings normalized", report.headings_normalized);
    print_count("Bullets normalized", report.bullets_normalized);
    print_count("Inline code splits", report.inline_code_splits);
    print_count("Fences closed", report.fences_closed);
    if report.insertion_budget_exhausted {
        eprintln!("{} Fence insertion budget exhausted", "!".yellow().bold());
    }
    if report.size_bypassed {
        eprintln!(
            "{} Input over size threshold; glyph normalization only",
            "!".yellow().bold()
        );
    }
    if !report.modified() {
        eprintln!("{}: nothing to repair", "Clean".bold());
    }
}

fn print_count(label: &str, count: usize) {
    if count > 0 {
        eprintln!("{}: {}", label.bold(), count);
    }
}
