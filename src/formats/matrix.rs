//! MATRIX resolver.
//!
//! Walks the MATRIX body line by line, comments removed, and attributes each
//! line's sequence payload to a taxon. A line is attributed by the first
//! rule that applies:
//!
//! 1. blank line: resets the interleave cursor
//! 2. named line: the leading name matches a known taxon
//! 3. discovered line: only without TAXLABELS, the leading name starts a new taxon
//! 4. header-only line: the whole line is a known taxon name; the next
//!    line belongs to it
//! 5. positional line: the whole line goes to the taxon under the cursor
//! 6. anything else is reported and dropped
//!
//! Rules 4 and 5 only apply while the cursor is inside the table.
//!
//! A line is "named" only when its first token is followed by whitespace,
//! so a bare sequence line is never split into name and data.
//!
//! The cursor is the index of the taxon expected next. It moves to
//! `index + 1` after every attributed line and never wraps within a block
//! of consecutive non-blank lines.

use tracing::trace;

use crate::diagnostic::Diagnostic;
use crate::formats::lexer::{canonical_key, comment_free_lines, folded_prefix_len, next_token};
use crate::model::{FragmentLog, TaxonTable};

/// How a single MATRIX line is attributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass<'a> {
    /// Empty line.
    Blank,
    /// Leading name matched the taxon at `taxon`.
    Named { taxon: usize, payload: &'a str },
    /// Leading name is a taxon not seen before.
    Discovered { name: &'a str, payload: &'a str },
    /// The line is nothing but the name of the taxon at `taxon`.
    HeaderOnly { taxon: usize },
    /// The line carries only sequence data for the taxon under the cursor.
    Positional { taxon: usize, payload: &'a str },
    /// Sequence-only line with no taxon left in the current block.
    Overflow,
    /// Name-like line that matched nothing and had no slot left.
    Unmatched,
}

/// Classifies one MATRIX line.
///
/// `cursor` is the interleave cursor before this line; `closed` is true
/// when the taxon set was declared by TAXLABELS and may not grow.
pub fn classify_line<'a>(
    line: &'a str,
    table: &TaxonTable,
    cursor: usize,
    closed: bool,
) -> LineClass<'a> {
    let line = line.trim();
    let Some((token, rest)) = next_token(line) else {
        return LineClass::Blank;
    };
    let named = rest.starts_with(char::is_whitespace);

    if named {
        if let Some((taxon, payload)) = match_named(line, token, rest, table) {
            return LineClass::Named { taxon, payload };
        }
        if !closed {
            return LineClass::Discovered {
                name: token,
                payload: rest,
            };
        }
    }

    if cursor < table.len() {
        if let Some(taxon) = table.position(&canonical_key(line)) {
            return LineClass::HeaderOnly { taxon };
        }
        return LineClass::Positional {
            taxon: cursor,
            payload: line,
        };
    }

    if named {
        LineClass::Unmatched
    } else {
        LineClass::Overflow
    }
}

/// Finds the taxon named at the start of `line`.
///
/// The first token is compared by canonical key. Keys that contain
/// whitespace are also matched against the raw line prefix, longest key
/// first, so `taxon two ACGT` goes to `'taxon two'` rather than `taxon`.
fn match_named<'a>(
    line: &'a str,
    token: &str,
    rest: &'a str,
    table: &TaxonTable,
) -> Option<(usize, &'a str)> {
    let token_key = canonical_key(token);

    if !table.has_spaced_keys() {
        return table.position(&token_key).map(|taxon| (taxon, rest));
    }

    table.longest_first().find_map(|(taxon, identity)| {
        let key = identity.canonical_key.as_str();
        if key == token_key {
            return Some((taxon, rest));
        }
        if !identity.is_spaced() {
            return None;
        }
        let end = folded_prefix_len(line, key)?;
        let after = &line[end..];
        after
            .starts_with(char::is_whitespace)
            .then_some((taxon, after))
    })
}

/// Output of a MATRIX pass.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Declared taxa followed by any discovered ones
    pub table: TaxonTable,
    /// Payload fragments per taxon index
    pub fragments: FragmentLog,
    /// Lines that could not be attributed
    pub diagnostics: Vec<Diagnostic>,
}

/// Line-by-line MATRIX state machine.
#[derive(Debug)]
pub struct MatrixResolver {
    table: TaxonTable,
    fragments: FragmentLog,
    cursor: usize,
    closed: bool,
    diagnostics: Vec<Diagnostic>,
}

impl MatrixResolver {
    /// Creates a resolver over `table`.
    ///
    /// With `has_taxlabels` false, unknown names found in the matrix are
    /// appended to the table.
    pub fn new(table: TaxonTable, has_taxlabels: bool) -> Self {
        Self {
            table,
            fragments: FragmentLog::new(),
            cursor: 0,
            closed: has_taxlabels,
            diagnostics: Vec::new(),
        }
    }

    /// Index of the taxon the next unlabelled line would go to.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Processes one line. `line_number` is only used for diagnostics.
    pub fn feed_line(&mut self, line_number: usize, line: &str) {
        let class = classify_line(line, &self.table, self.cursor, self.closed);
        trace!(line = line_number, cursor = self.cursor, ?class, "MATRIX line");

        match class {
            LineClass::Blank => self.cursor = 0,
            LineClass::Named { taxon, payload } | LineClass::Positional { taxon, payload } => {
                self.fragments.append(taxon, payload);
                self.cursor = taxon + 1;
            }
            LineClass::Discovered { name, payload } => {
                let taxon = self.table.get_or_insert(name);
                self.fragments.append(taxon, payload);
                self.cursor = taxon + 1;
            }
            LineClass::HeaderOnly { taxon } => self.cursor = taxon,
            LineClass::Overflow => self.diagnostics.push(Diagnostic::PositionalOverflow {
                line: line_number,
                text: line.trim().to_string(),
            }),
            LineClass::Unmatched => self.diagnostics.push(Diagnostic::UnmatchedLine {
                line: line_number,
                text: line.trim().to_string(),
            }),
        }
    }

    /// Finishes the pass.
    pub fn finish(self) -> Resolution {
        Resolution {
            table: self.table,
            fragments: self.fragments,
            diagnostics: self.diagnostics,
        }
    }
}

/// Resolves a whole MATRIX body.
///
/// Comments are removed here; diagnostics carry line numbers of the raw
/// body.
pub fn resolve_matrix(matrix: &str, table: TaxonTable, has_taxlabels: bool) -> Resolution {
    let mut resolver = MatrixResolver::new(table, has_taxlabels);
    for (line_number, line) in comment_free_lines(matrix) {
        resolver.feed_line(line_number, &line);
    }
    resolver.finish()
}
