//! FASTA record assembly and writing.
//!
//! Turns the per-taxon fragments of a MATRIX pass into FASTA records and
//! renders them with fixed-width sequence lines.
//!
//! ## FASTA Format
//!
//! ```text
//! >taxon_name
//! ACGTACGTACGT...   (at most 60 characters per line by default)
//! ```

use std::collections::HashSet;

use crate::diagnostic::Diagnostic;
use crate::model::{FastaRecord, FragmentLog, TaxonTable};

/// Default number of sequence characters per output line.
pub const DEFAULT_LINE_WIDTH: usize = 60;

/// Derives a FASTA header from a taxon's display form.
///
/// Quote characters are dropped and every run of whitespace becomes a
/// single underscore.
pub fn clean_header(display_form: &str) -> String {
    let mut header = String::with_capacity(display_form.len());
    let mut in_space = false;

    for c in display_form.chars().filter(|c| !matches!(c, '\'' | '"')) {
        if c.is_whitespace() {
            if !in_space {
                header.push('_');
            }
            in_space = true;
        } else {
            header.push(c);
            in_space = false;
        }
    }

    header
}

/// Hands out headers that are unique across one output file.
#[derive(Debug, Default)]
pub struct HeaderUniquifier {
    used: HashSet<String>,
}

impl HeaderUniquifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `header`, or `header_N` with the smallest free `N >= 2`.
    pub fn claim(&mut self, header: &str) -> String {
        let mut unique = header.to_string();
        let mut n = 2;
        while self.used.contains(&unique) {
            unique = format!("{}_{}", header, n);
            n += 1;
        }
        self.used.insert(unique.clone());
        unique
    }
}

/// Builds one record per taxon that has sequence data, in table order.
///
/// Fragments are concatenated in arrival order and all whitespace is
/// removed. Taxa without data are skipped and reported.
pub fn assemble_records(
    table: &TaxonTable,
    fragments: &FragmentLog,
) -> (Vec<FastaRecord>, Vec<Diagnostic>) {
    let mut records = Vec::with_capacity(table.len());
    let mut diagnostics = Vec::new();
    let mut headers = HeaderUniquifier::new();

    for (index, identity) in table.iter().enumerate() {
        let header = clean_header(&identity.display_form);
        let sequence: String = fragments
            .fragments(index)
            .iter()
            .flat_map(|fragment| fragment.chars())
            .filter(|c| !c.is_whitespace())
            .collect();

        if sequence.is_empty() {
            diagnostics.push(Diagnostic::MissingSequence { name: header });
            continue;
        }

        records.push(FastaRecord::new(headers.claim(&header), sequence));
    }

    (records, diagnostics)
}

/// Splits a sequence into lines of at most `width` characters.
///
/// A width of zero puts the whole sequence on one line. An empty sequence
/// yields no lines.
pub fn wrap_sequence(sequence: &str, width: usize) -> impl Iterator<Item = &str> {
    let mut rest = sequence;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        let end = match width {
            0 => rest.len(),
            _ => rest.char_indices().nth(width).map_or(rest.len(), |(i, _)| i),
        };
        let (line, tail) = rest.split_at(end);
        rest = tail;
        Some(line)
    })
}

/// Renders records as a FASTA string, one `>header` line per record
/// followed by its wrapped sequence lines.
pub fn to_fasta_string(records: &[FastaRecord], width: usize) -> String {
    let capacity = records
        .iter()
        .map(|r| r.header.len() + r.sequence.len() * 2 + 2)
        .sum();
    let mut out = String::with_capacity(capacity);

    for record in records {
        out.push('>');
        out.push_str(&record.header);
        out.push('\n');
        for line in wrap_sequence(&record.sequence, width) {
            out.push_str(line);
            out.push('\n');
        }
    }

    out
}
