//! NEXUS to FASTA conversion pipeline.
//!
//! The conversion is a one-shot batch transform over an in-memory document:
//! 1. `nexus` locates TAXLABELS and MATRIX (via `lexer`) and `matrix`
//!    attributes every matrix line to a taxon
//! 2. `fasta` assembles one record per taxon and renders the output
//!
//! Output is rendered into a buffer first and only written once the whole
//! document has been processed, so a fatal error never leaves a partial
//! FASTA file behind.

pub mod fasta;
pub mod lexer;
pub mod matrix;
pub mod nexus;

use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::diagnostic::Diagnostic;
use crate::model::FastaRecord;

/// Errors that stop a conversion.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Input file '{}' is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("NEXUS error: {0}")]
    NexusError(#[from] nexus::NexusError),
}

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Conversion settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Sequence characters per FASTA line (0 disables wrapping)
    pub line_width: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            line_width: fasta::DEFAULT_LINE_WIDTH,
        }
    }
}

/// Result of a successful conversion.
#[derive(Debug, Clone, Default)]
pub struct Conversion {
    /// Output records, in taxon table order
    pub records: Vec<FastaRecord>,
    /// Everything that was skipped or worked around
    pub diagnostics: Vec<Diagnostic>,
}

impl Conversion {
    /// Renders the records as FASTA text.
    pub fn to_fasta(&self, options: &ConvertOptions) -> String {
        fasta::to_fasta_string(&self.records, options.line_width)
    }
}

/// Converts NEXUS text into FASTA records.
pub fn convert_str(content: &str) -> ConvertResult<Conversion> {
    let resolution = nexus::parse_nexus_str(content)?;
    let (records, missing) = fasta::assemble_records(&resolution.table, &resolution.fragments);

    let mut diagnostics = resolution.diagnostics;
    diagnostics.extend(missing);

    debug!(
        taxa = resolution.table.len(),
        records = records.len(),
        diagnostics = diagnostics.len(),
        "assembled records"
    );

    Ok(Conversion {
        records,
        diagnostics,
    })
}

/// Reads a whole input document as UTF-8.
pub fn read_document<P: AsRef<Path>>(path: P) -> ConvertResult<String> {
    let path = path.as_ref();
    let read_error = |source: io::Error| ConvertError::Read {
        path: path.to_path_buf(),
        source,
    };

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ConvertError::InputNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(read_error(e)),
    };
    if !metadata.is_file() {
        return Err(ConvertError::NotAFile(path.to_path_buf()));
    }

    let file = File::open(path).map_err(read_error)?;
    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut content = String::with_capacity(metadata.len() as usize);
    reader.read_to_string(&mut content).map_err(read_error)?;

    debug!(path = %path.display(), bytes = content.len(), "read input");
    Ok(content)
}

/// Writes `content` to `path` atomically.
///
/// The data goes to a temporary file in the destination directory, which
/// is then renamed over `path`.
pub fn write_atomic<P: AsRef<Path>>(path: P, content: &str) -> ConvertResult<()> {
    let path = path.as_ref();
    let write_error = |source: io::Error| ConvertError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_error)?;
    tmp.write_all(content.as_bytes()).map_err(write_error)?;
    tmp.flush().map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(write_error)?;
    }

    tmp.persist(path).map_err(|e| write_error(e.error))?;

    debug!(path = %path.display(), bytes = content.len(), "wrote output");
    Ok(())
}

/// Converts the NEXUS file at `input` into the FASTA file at `output`.
pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    options: &ConvertOptions,
) -> ConvertResult<Conversion> {
    let content = read_document(input)?;
    let conversion = convert_str(&content)?;
    write_atomic(output, &conversion.to_fasta(options))?;
    Ok(conversion)
}
