//! Formula cache key computation.

use sha2::{Digest, Sha256};

/// Everything that affects the typeset output of a formula.
#[derive(Debug, Clone, Copy)]
pub struct FormulaKey<'a> {
    pub source: &'a str,
    pub display: bool,
}

impl FormulaKey<'_> {
    /// Hex SHA-256 of `"{mode}:{source}"`, where mode is `display` or
    /// `inline`.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mode = if self.display { "display" } else { "inline" };
        let mut hasher = Sha256::new();
        hasher.update(mode.as_bytes());
        hasher.update(b":");
        hasher.update(self.source.as_bytes());
        hex::encode(hasher.finalize())
    }
}
