//! Non-fatal conversion diagnostics.
//!
//! These are collected alongside the result rather than aborting the
//! conversion. The binary reports them on stderr through `tracing`.

use std::fmt;

/// Something the converter noticed and worked around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The document does not start with `#NEXUS`.
    MissingNexusHeader,
    /// A TAXLABELS command was found but never terminated; it is ignored.
    UnterminatedTaxlabels,
    /// The same taxon name was declared more than once in TAXLABELS.
    DuplicateTaxon { name: String },
    /// A line that starts with a name-like token matched no taxon and had
    /// no positional slot left.
    UnmatchedLine { line: usize, text: String },
    /// A bare sequence line arrived after every taxon of the current block
    /// had already received one.
    PositionalOverflow { line: usize, text: String },
    /// A taxon ended up with no sequence data.
    MissingSequence { name: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingNexusHeader => {
                write!(f, "Input does not start with #NEXUS, continuing anyway")
            }
            Diagnostic::UnterminatedTaxlabels => {
                write!(f, "TAXLABELS is not terminated by ';', ignoring it")
            }
            Diagnostic::DuplicateTaxon { name } => {
                write!(f, "Taxon '{}' is declared more than once in TAXLABELS", name)
            }
            Diagnostic::UnmatchedLine { line, text } => {
                write!(f, "MATRIX line {} matches no taxon, skipping: {}", line, text)
            }
            Diagnostic::PositionalOverflow { line, text } => write!(
                f,
                "MATRIX line {} has no taxon left in this block, skipping: {}",
                line, text
            ),
            Diagnostic::MissingSequence { name } => {
                write!(f, "No sequence found for taxon '{}'", name)
            }
        }
    }
}
