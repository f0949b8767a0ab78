//! Library search outcome

use std::fmt;

/// Result of searching the template library for the features in a buffer
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SearchResult {
    /// A stored template matched
    Found {
        /// Library slot of the matching template
        slot: u16,

        /// Match score reported by the module
        score: u16,
    },

    /// No template in the searched range matched
    NotFound,
}

impl SearchResult {
    /// Check if a template matched
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found { .. })
    }

    /// Slot of the matching template, if any
    pub fn slot(&self) -> Option<u16> {
        match self {
            Self::Found { slot, .. } => Some(*slot),
            Self::NotFound => None,
        }
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Found { slot, score } => write!(f, "found in slot {} (score {})", slot, score),
            Self::NotFound => f.write_str("not found"),
        }
    }
}
