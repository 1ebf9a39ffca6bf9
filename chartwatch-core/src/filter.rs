//! Kind/name selection over rendered documents.
//!
//! A [`FilterSpec`] is an ordered list of [`FilterEntry`] values. An entry
//! matches a document when the lower-cased document kind equals the entry
//! kind and the entry pattern finds a match anywhere in `metadata.name`.
//! Patterns are not anchored; write `^web$` for an exact name.
//!
//! Entries are independent: a document satisfying two entries is selected
//! twice.

use std::fmt;

use regex::Regex;

use crate::error::{FilterError, MalformedDocumentError};
use crate::types::Document;

/// Pattern used when an entry gives a kind but no name pattern.
pub const ANY_NAME: &str = ".*";

/// One kind → name-pattern pair.
#[derive(Debug, Clone)]
pub struct FilterEntry {
    kind: String,
    pattern: Regex,
}

impl FilterEntry {
    pub fn new(kind: &str, pattern: &str) -> Result<Self, FilterError> {
        let normalized = kind.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(FilterError::EmptyKind {
                spec: format!("{kind}={pattern}"),
            });
        }
        let pattern = Regex::new(pattern).map_err(|source| FilterError::InvalidPattern {
            kind: normalized.clone(),
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            kind: normalized,
            pattern,
        })
    }

    /// Entry selecting every document of `kind`.
    pub fn any_name(kind: &str) -> Result<Self, FilterError> {
        Self::new(kind, ANY_NAME)
    }

    /// Lower-cased kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// Whether this entry selects `doc`.
    ///
    /// The name is only consulted once the kind matches, so an unnamed
    /// document of another kind never fails.
    pub fn matches(&self, doc: &Document) -> Result<bool, MalformedDocumentError> {
        if doc.kind().to_lowercase() != self.kind {
            return Ok(false);
        }
        let name = doc.require_name()?;
        Ok(self.pattern.is_match(name))
    }
}

impl fmt::Display for FilterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.pattern.as_str())
    }
}

/// The full selection criteria for a render cycle.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    entries: Vec<FilterEntry>,
}

impl FilterSpec {
    pub fn new(entries: Vec<FilterEntry>) -> Result<Self, FilterError> {
        if entries.is_empty() {
            return Err(FilterError::NoEntries);
        }
        Ok(Self { entries })
    }

    /// Single kind/name spec, the degenerate one-entry case.
    pub fn single(kind: &str, pattern: &str) -> Result<Self, FilterError> {
        Self::new(vec![FilterEntry::new(kind, pattern)?])
    }

    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// Indices of every entry selecting `doc`, in entry order.
    ///
    /// Fails when a matching kind needs `metadata.name` and the document has
    /// none; the caller skips that document.
    pub fn select(&self, doc: &Document) -> Result<Vec<usize>, MalformedDocumentError> {
        let mut hits = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.matches(doc)? {
                hits.push(index);
            }
        }
        Ok(hits)
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{entry}")?;
        }
        Ok(())
    }
}
