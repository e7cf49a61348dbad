//! Tracked-change XML diff tool CLI
//!
//! Compares two XML documents and writes the left document annotated
//! with insert and delete markers describing the edits that produce
//! the right document.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use clap::Parser;
use wmldiff::{document_element, parse_file, DiffConfig, DocDiffer, Error};

/// Tracked-change XML diff tool
#[derive(Parser)]
#[command(name = "wmldiff")]
#[command(version)]
#[command(about = "Diff two XML documents into tracked-change markup", long_about = None)]
struct Cli {
    /// Left (original) file
    left: String,
    /// Right (edited) file
    right: String,
    /// Output file (default: stdout)
    output: Option<String>,

    /// Combined event count above which a changed run is replaced
    /// wholesale instead of being diffed in detail
    #[arg(short = 'm', long, default_value = "2000")]
    max_fine_events: usize,

    /// Drop whitespace-only text nodes instead of preserving them
    #[arg(long)]
    strip_whitespace: bool,

    /// Log stage decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("wmldiff=debug")),
            )
            .with_writer(io::stderr)
            .init();
    }

    match run_diff(&cli) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

/// Parses both inputs and runs the diff driver.
fn run_diff(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing left: {}", cli.left);
    let left = parse_file(&cli.left)?;

    eprintln!("Parsing right: {}", cli.right);
    let right = parse_file(&cli.right)?;

    let left_root = document_element(&left)
        .ok_or_else(|| Error::Parse(format!("{}: no document element", cli.left)))?;
    let right_root = document_element(&right)
        .ok_or_else(|| Error::Parse(format!("{}: no document element", cli.right)))?;

    let config = DiffConfig {
        preserve_whitespace: !cli.strip_whitespace,
        max_fine_events: cli.max_fine_events,
        ..DiffConfig::default()
    };
    let differ = DocDiffer::with_config(config)?;

    let mut output: Box<dyn Write> = match cli.output.as_deref() {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };

    eprintln!("Diffing...");
    differ.diff(&left_root, &right_root, &mut output)?;
    output.flush()?;

    eprintln!("Diff complete.");
    Ok(())
}
