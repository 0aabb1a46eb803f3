//! Name matching policy
//!
//! One store uses exactly one [`MatchMode`] and one [`CaseMatching`]; the two
//! modes select different rows and are never mixed within a store.

use memchr::memmem;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Which names a term selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Name starts with the term
    #[default]
    Prefix,
    /// Name contains the term anywhere
    Substring,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMatching {
    #[default]
    Sensitive,
    /// Compare lowercase folds of name and term
    Insensitive,
}

/// Applies a mode and case policy to names
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    pub mode: MatchMode,
    pub case: CaseMatching,
}

impl Matcher {
    pub fn new(mode: MatchMode, case: CaseMatching) -> Self {
        Self { mode, case }
    }

    /// Key used for ordering and matching
    ///
    /// Sensitive mode matches the raw name, so no key is materialised.
    pub fn fold(&self, s: &str) -> Option<String> {
        match self.case {
            CaseMatching::Sensitive => None,
            CaseMatching::Insensitive => Some(s.to_lowercase()),
        }
    }

    /// Does `key` (already folded) match `term` (already folded)?
    pub fn is_match(&self, key: &str, term: &str) -> bool {
        match self.mode {
            MatchMode::Prefix => key.starts_with(term),
            MatchMode::Substring => memmem::find(key.as_bytes(), term.as_bytes()).is_some(),
        }
    }

    /// Byte range of the match inside `name`, for highlighting
    ///
    /// Returns `None` when nothing matches, the term is empty, or case folding
    /// changed the byte length of the name (offsets would not line up).
    pub fn match_range(&self, name: &str, term: &str) -> Option<Range<usize>> {
        if term.is_empty() {
            return None;
        }

        let folded_name = self.fold(name);
        let folded_term = self.fold(term);
        let key = folded_name.as_deref().unwrap_or(name);
        let needle = folded_term.as_deref().unwrap_or(term);

        if key.len() != name.len() {
            return None;
        }

        let start = match self.mode {
            MatchMode::Prefix => key.starts_with(needle).then_some(0)?,
            MatchMode::Substring => memmem::find(key.as_bytes(), needle.as_bytes())?,
        };
        let end = start + needle.len();

        (name.is_char_boundary(start) && name.is_char_boundary(end)).then_some(start..end)
    }
}
