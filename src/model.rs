//! Data model for the NEXUS to FASTA conversion.
//!
//! This module contains the structures shared by the pipeline stages:
//! - Taxon identities and the ordered identity table
//! - The per-taxon fragment log built while reading the MATRIX
//! - Finished FASTA records

use std::collections::HashMap;

use crate::formats::lexer::canonical_key;

/// A taxon as declared in TAXLABELS or discovered in the MATRIX.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonIdentity {
    /// Unquoted, case-folded spelling used for matching
    pub canonical_key: String,
    /// The token exactly as written (quotes included)
    pub display_form: String,
}

impl TaxonIdentity {
    /// Creates an identity from a raw token, deriving its canonical key.
    pub fn new(display_form: impl Into<String>) -> Self {
        let display_form = display_form.into();
        Self {
            canonical_key: canonical_key(&display_form),
            display_form,
        }
    }

    /// Length of the canonical key in characters.
    fn key_len(&self) -> usize {
        self.canonical_key.chars().count()
    }

    /// Returns true if the canonical key contains whitespace (a quoted
    /// multi-word name).
    pub fn is_spaced(&self) -> bool {
        self.canonical_key.contains(char::is_whitespace)
    }
}

/// Ordered table of taxon identities.
///
/// The position of an identity in the table is its index, which is what
/// the interleave cursor points at. Alongside the ordered list the table
/// keeps a key index (first index per canonical key) and a view of all
/// indices sorted by descending key length, which is kept sorted as
/// entries are appended.
#[derive(Debug, Clone, Default)]
pub struct TaxonTable {
    identities: Vec<TaxonIdentity>,
    by_key: HashMap<String, usize>,
    longest_first: Vec<usize>,
    spaced_keys: usize,
}

impl TaxonTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from declared identities, in declaration order.
    ///
    /// Identities sharing a canonical key are all kept; lookups by key
    /// resolve to the first one.
    pub fn from_identities(identities: Vec<TaxonIdentity>) -> Self {
        let mut by_key = HashMap::with_capacity(identities.len());
        for (index, identity) in identities.iter().enumerate() {
            by_key.entry(identity.canonical_key.clone()).or_insert(index);
        }

        let mut longest_first: Vec<usize> = (0..identities.len()).collect();
        // Stable, so equal lengths keep declaration order.
        longest_first.sort_by_key(|&i| std::cmp::Reverse(identities[i].key_len()));
        let spaced_keys = identities.iter().filter(|id| id.is_spaced()).count();

        Self {
            identities,
            by_key,
            longest_first,
            spaced_keys,
        }
    }

    /// Appends an identity and returns its index.
    pub fn push(&mut self, identity: TaxonIdentity) -> usize {
        let index = self.identities.len();
        let len = identity.key_len();

        let slot = self
            .longest_first
            .partition_point(|&i| self.identities[i].key_len() >= len);
        self.longest_first.insert(slot, index);
        if identity.is_spaced() {
            self.spaced_keys += 1;
        }
        self.by_key
            .entry(identity.canonical_key.clone())
            .or_insert(index);
        self.identities.push(identity);

        index
    }

    /// Returns the index for `display_form`'s key, appending a new identity
    /// if the key is not known yet.
    pub fn get_or_insert(&mut self, display_form: &str) -> usize {
        let identity = TaxonIdentity::new(display_form);
        match self.position(&identity.canonical_key) {
            Some(index) => index,
            None => self.push(identity),
        }
    }

    /// Index of the first identity with the given canonical key.
    pub fn position(&self, canonical_key: &str) -> Option<usize> {
        self.by_key.get(canonical_key).copied()
    }

    /// Gets an identity by index.
    pub fn get(&self, index: usize) -> Option<&TaxonIdentity> {
        self.identities.get(index)
    }

    /// Number of identities.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Returns true if the table holds no identities.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    /// Returns true if any canonical key contains whitespace.
    pub fn has_spaced_keys(&self) -> bool {
        self.spaced_keys > 0
    }

    /// Identities in table order.
    pub fn iter(&self) -> impl Iterator<Item = &TaxonIdentity> {
        self.identities.iter()
    }

    /// `(index, identity)` pairs, longest canonical key first.
    pub fn longest_first(&self) -> impl Iterator<Item = (usize, &TaxonIdentity)> {
        self.longest_first
            .iter()
            .map(move |&i| (i, &self.identities[i]))
    }
}

/// Raw sequence fragments collected per taxon, in arrival order.
///
/// Fragments are stored as they appeared on the matrix line, whitespace
/// included. Slots are addressed by taxon table index.
#[derive(Debug, Clone, Default)]
pub struct FragmentLog {
    slots: Vec<Vec<String>>,
}

impl FragmentLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment for the taxon at `index`.
    pub fn append(&mut self, index: usize, fragment: impl Into<String>) {
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, Vec::new);
        }
        self.slots[index].push(fragment.into());
    }

    /// Fragments for the taxon at `index` (empty if none were logged).
    pub fn fragments(&self, index: usize) -> &[String] {
        self.slots.get(index).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A finished FASTA record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    /// Header line content, without the leading '>'
    pub header: String,
    /// Sequence with all whitespace removed
    pub sequence: String,
}

impl FastaRecord {
    /// Creates a new record.
    pub fn new(header: impl Into<String>, sequence: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            sequence: sequence.into(),
        }
    }
}
