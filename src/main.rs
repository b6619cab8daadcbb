//! nexfasta - NEXUS to FASTA converter
//!
//! ## Usage
//!
//! ```bash
//! nexfasta <input.nex> <output.fasta>
//! nexfasta <input.nex> -             # Write to stdout
//! nexfasta -w 80 <input.nex> <output.fasta>
//! ```
//!
//! Warnings about skipped lines and taxa go to stderr. Set `RUST_LOG` to
//! override the log level chosen by `-v`/`-q`.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use nexfasta::formats::{convert_str, read_document, write_atomic, ConvertOptions};

/// Convert a TreeBASE NEXUS file into a FASTA file
///
/// Reads the TAXLABELS and MATRIX commands of the input and writes one
/// FASTA record per taxon. The output file is only written once the whole
/// input has been converted.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// NEXUS input file
    input: PathBuf,

    /// FASTA output file. Use "-" for stdout.
    output: String,

    /// Sequence characters per output line
    #[arg(
        short = 'w',
        long = "line-width",
        default_value = "60",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    line_width: u32,

    /// More log output (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    quiet: bool,
}

fn setup_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    setup_tracing(args.verbose, args.quiet);

    let options = ConvertOptions {
        line_width: args.line_width as usize,
    };

    let content = read_document(&args.input)?;
    let conversion = convert_str(&content)?;

    for diagnostic in &conversion.diagnostics {
        warn!("{}", diagnostic);
    }

    let fasta = conversion.to_fasta(&options);
    if args.output == "-" {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(fasta.as_bytes())
            .and_then(|()| handle.flush())
            .context("Failed to write to stdout")?;
    } else {
        write_atomic(&args.output, &fasta)?;
    }

    info!(
        "Successfully converted {} sequences to FASTA format",
        conversion.records.len()
    );

    Ok(())
}
