//! # nexfasta - NEXUS to FASTA converter
//!
//! Converts the character matrix of a NEXUS file, as exported by TreeBASE,
//! into FASTA records.
//!
//! ## Architecture
//!
//! The conversion is a single synchronous pass over an in-memory document:
//! - `formats::lexer`: comment stripping, command extraction, tokens
//! - `formats::nexus`: TAXLABELS reading and the document entry point
//! - `formats::matrix`: attribution of MATRIX lines to taxa
//! - `formats::fasta`: record assembly, unique headers, FASTA output
//! - `model`: taxon table, fragment log and records
//! - `diagnostic`: non-fatal problems reported alongside the result
//!
//! ## Example
//!
//! ```
//! use nexfasta::formats::{convert_str, ConvertOptions};
//!
//! let nexus = "#NEXUS\nBEGIN DATA;\nMATRIX\nT1 ACGT\nT2 TGCA\n;\nEND;\n";
//! let conversion = convert_str(nexus).unwrap();
//! assert_eq!(
//!     conversion.to_fasta(&ConvertOptions::default()),
//!     ">T1\nACGT\n>T2\nTGCA\n"
//! );
//! ```

pub mod diagnostic;
pub mod formats;
pub mod model;
