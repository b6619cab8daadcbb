//! NEXUS character matrix reader.
//!
//! Reads the TAXLABELS and MATRIX commands of a NEXUS document, in the
//! dialect exported by TreeBASE. All other commands and blocks (TREES,
//! CODONS, ...) are ignored.
//!
//! ## NEXUS Format
//!
//! ```text
//! #NEXUS
//! BEGIN TAXA;
//!   DIMENSIONS NTAX=2;
//!   TAXLABELS 'Homo sapiens' Pan_troglodytes;
//! END;
//! BEGIN CHARACTERS;
//!   FORMAT DATATYPE=DNA INTERLEAVE;
//!   MATRIX
//!     'Homo sapiens'    ACGTAC [1-6]
//!     Pan_troglodytes   ACGTTC
//!
//!     'Homo sapiens'    GGT
//!     Pan_troglodytes   GGA
//!   ;
//! END;
//! ```
//!
//! ## Relaxed Parsing
//!
//! - Case insensitive keywords
//! - TAXLABELS is optional; without it taxa are discovered from the matrix
//! - Sequential and interleaved matrices, with or without repeated names
//! - Taxon names alone on a line, followed by their sequence
//! - Nested bracket comments anywhere outside quoted names

use std::collections::HashSet;

use thiserror::Error;
use tracing::debug;

use crate::diagnostic::Diagnostic;
use crate::formats::lexer::{contains_keyword, extract_block, strip_comments, tokens};
use crate::formats::matrix::{resolve_matrix, Resolution};
use crate::model::{TaxonIdentity, TaxonTable};

/// Errors that can occur during NEXUS parsing.
#[derive(Error, Debug)]
pub enum NexusError {
    #[error("Could not find the MATRIX section in the NEXUS file")]
    MissingMatrix,

    #[error("Unterminated MATRIX (missing ';')")]
    UnterminatedMatrix,
}

/// Result type for NEXUS operations.
pub type NexusResult<T> = Result<T, NexusError>;

/// Reads taxon identities from a comment-stripped TAXLABELS body.
///
/// Every token becomes one identity, in order. Repeated names are kept.
pub fn read_taxlabels(block: &str) -> Vec<TaxonIdentity> {
    tokens(block).map(TaxonIdentity::new).collect()
}

fn has_nexus_header(content: &str) -> bool {
    content
        .trim_start()
        .as_bytes()
        .get(..6)
        .is_some_and(|b| b.eq_ignore_ascii_case(b"#NEXUS"))
}

/// Reads the taxon table from TAXLABELS, if there is one.
///
/// Returns the table and whether it closes the taxon set.
fn read_taxon_table(content: &str, diagnostics: &mut Vec<Diagnostic>) -> (TaxonTable, bool) {
    let Some(block) = extract_block(content, "TAXLABELS") else {
        if contains_keyword(content, "TAXLABELS") {
            diagnostics.push(Diagnostic::UnterminatedTaxlabels);
        }
        debug!("no TAXLABELS, discovering taxa from MATRIX");
        return (TaxonTable::new(), false);
    };

    let identities = read_taxlabels(&strip_comments(block));

    let mut seen = HashSet::new();
    for identity in &identities {
        if !seen.insert(identity.canonical_key.as_str()) {
            diagnostics.push(Diagnostic::DuplicateTaxon {
                name: identity.display_form.clone(),
            });
        }
    }

    debug!(taxa = identities.len(), "read TAXLABELS");
    let closed = !identities.is_empty();
    (TaxonTable::from_identities(identities), closed)
}

/// Parses NEXUS content and attributes the MATRIX data to taxa.
///
/// Fails only when the MATRIX command is missing or unterminated. Anything
/// else that looks wrong is reported in [`Resolution::diagnostics`].
pub fn parse_nexus_str(content: &str) -> NexusResult<Resolution> {
    let matrix = match extract_block(content, "MATRIX") {
        Some(block) => block,
        None if contains_keyword(content, "MATRIX") => return Err(NexusError::UnterminatedMatrix),
        None => return Err(NexusError::MissingMatrix),
    };

    let mut diagnostics = Vec::new();
    if !has_nexus_header(content) {
        diagnostics.push(Diagnostic::MissingNexusHeader);
    }

    let (table, has_taxlabels) = read_taxon_table(content, &mut diagnostics);
    debug!(lines = matrix.lines().count(), has_taxlabels, "resolving MATRIX");

    let mut resolution = resolve_matrix(matrix, table, has_taxlabels);
    diagnostics.append(&mut resolution.diagnostics);
    resolution.diagnostics = diagnostics;

    Ok(resolution)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequence(resolution: &Resolution, name: &str) -> String {
        let index = resolution
            .table
            .position(&crate::formats::lexer::canonical_key(name))
            .unwrap();
        resolution
            .fragments
            .fragments(index)
            .concat()
            .split_whitespace()
            .collect()
    }

    #[test]
    fn test_read_taxlabels() {
        let ids = read_taxlabels("T1 'taxon two' \"three\" {A}");
        let display: Vec<&str> = ids.iter().map(|id| id.display_form.as_str()).collect();
        assert_eq!(display, vec!["T1", "'taxon two'", "\"three\"", "{A}"]);
        assert_eq!(ids[1].canonical_key, "taxon two");
    }

    #[test]
    fn test_parse_simple_nexus() {
        let content = r#"
#NEXUS
BEGIN TAXA;
    TAXLABELS T1 T2 T3;
END;
BEGIN CHARACTERS;
    MATRIX
    T1 ACGT
    T2 TGCA
    T3 AAAA
    ;
END;
"#;
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(r.table.len(), 3);
        assert_eq!(sequence(&r, "T1"), "ACGT");
        assert_eq!(sequence(&r, "T3"), "AAAA");
        assert!(r.diagnostics.is_empty());
    }

    #[test]
    fn test_single_line_blocks() {
        let content = r#"
#NEXUS
BEGIN TAXA; TAXLABELS "taxon two"; END;
BEGIN CHARACTERS; MATRIX "taxon two" TGCA; END;
"#;
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(sequence(&r, "'taxon two'"), "TGCA");
    }

    #[test]
    fn test_missing_matrix() {
        let content = "#NEXUS SIMPLIFIED CONTENT NOMATRIX";
        assert!(matches!(
            parse_nexus_str(content),
            Err(NexusError::MissingMatrix)
        ));
    }

    #[test]
    fn test_unterminated_matrix() {
        let content = "#NEXUS\nBEGIN DATA;\nMATRIX\nA ACGT\nB 'TTTT;\nEND;\n";
        assert!(matches!(
            parse_nexus_str(content),
            Err(NexusError::UnterminatedMatrix)
        ));
    }

    #[test]
    fn test_comments_removed_from_matrix() {
        let content = r#"#NEXUS
BEGIN DATA;
  DIMENSIONS NTAX=2 NCHAR=8;
  FORMAT DATATYPE=DNA;
  MATRIX
  [1] seq_1 ACGT [pos 4] ACGT
  [2] seq_2 TT[nested [deep] comment]TTGGGG
  ;
END;
"#;
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(r.table.len(), 2);
        assert_eq!(sequence(&r, "seq_1"), "ACGTACGT");
        assert_eq!(sequence(&r, "seq_2"), "TTTTGGGG");
    }

    #[test]
    fn test_comment_with_semicolon_in_matrix() {
        let content = "#NEXUS\nBEGIN DATA;\nMATRIX\n[note; not the end]\nA ACGT\n;\nEND;\n";
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(sequence(&r, "A"), "ACGT");
    }

    #[test]
    fn test_quoted_name_with_brackets() {
        let content = r#"#NEXUS
BEGIN TAXA;
    TAXLABELS "name[with]bracket" {A};
END;
BEGIN CHARACTERS;
    MATRIX
    "name[with]bracket" ACGT
    {A} TTTT
    ;
END;
"#;
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(r.table.get(0).unwrap().display_form, "\"name[with]bracket\"");
        assert_eq!(sequence(&r, "\"name[with]bracket\""), "ACGT");
        assert_eq!(sequence(&r, "{A}"), "TTTT");
    }

    #[test]
    fn test_interleaved_with_taxlabels() {
        let content = r#"#NEXUS
BEGIN TAXA;
    TAXLABELS A B;
END;
BEGIN CHARACTERS;
    MATRIX
    A ACG
    B ACG

    A T G C
    B T G C
    ;
END;
"#;
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(sequence(&r, "A"), "ACGTGC");
        assert_eq!(sequence(&r, "B"), "ACGTGC");
    }

    #[test]
    fn test_empty_taxlabels_means_discovery() {
        let content = "#NEXUS\nBEGIN TAXA; TAXLABELS ; END;\nMATRIX\nX AC\nY GT\n;\n";
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(r.table.len(), 2);
        assert_eq!(sequence(&r, "Y"), "GT");
    }

    #[test]
    fn test_duplicate_taxlabels_reported() {
        let content = "#NEXUS\nTAXLABELS A B a;\nMATRIX\nA AC\nB GT\n;\n";
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(r.table.len(), 3);
        assert_eq!(
            r.diagnostics,
            vec![Diagnostic::DuplicateTaxon {
                name: "a".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_header_is_not_fatal() {
        let r = parse_nexus_str("MATRIX A ACGT;").unwrap();
        assert_eq!(r.diagnostics, vec![Diagnostic::MissingNexusHeader]);
        assert_eq!(sequence(&r, "A"), "ACGT");
    }

    #[test]
    fn test_diagnostic_line_skips_multiline_comment() {
        let content = "#NEXUS\nTAXLABELS A;\nMATRIX\nA AC [first\nsecond] GT\nZ T\n;\n";
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(sequence(&r, "A"), "ACGT");
        assert_eq!(
            r.diagnostics,
            vec![Diagnostic::UnmatchedLine {
                line: 4,
                text: "Z T".to_string()
            }]
        );
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let content = "#nexus\nbegin taxa; taxlabels TaxonA; end;\nbegin data; matrix\ntaxona ACGT\n;\nend;\n";
        let r = parse_nexus_str(content).unwrap();
        assert_eq!(r.table.len(), 1);
        assert_eq!(sequence(&r, "TaxonA"), "ACGT");
    }
}
