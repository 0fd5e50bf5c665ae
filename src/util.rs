//! Small numeric and naming helpers shared by the graph and the trainer.

use serde::{Deserialize, Serialize};

/// Restrict `n` to the closed range `[lo, hi]`.
///
/// Unlike [`f64::clamp`] this never panics on an inverted range; `lo` wins.
#[inline]
#[must_use]
pub fn clamp(n: f64, lo: f64, hi: f64) -> f64 {
    n.min(hi).max(lo)
}

/// Strictly increasing identifier source, starting at 0.
///
/// Each [`Network`](crate::Network) owns a fresh one, so identifiers are only
/// unique within a single network.
#[derive(Debug, Clone, Default)]
pub struct Identifier {
    next: u64,
}

impl Identifier {
    /// Create a sequence starting at 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }
}

impl Iterator for Identifier {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        let id = self.next;
        self.next += 1;
        Some(id)
    }
}

/// Counter-based display-name source.
///
/// Names are cosmetic; the only requirement is that one `Namer` never hands
/// out the same name twice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Namer {
    prefix: String,
    issued: u64,
}

impl Default for Namer {
    fn default() -> Self {
        Self::new("net")
    }
}

impl Namer {
    /// Create a namer producing `"{prefix}-0000"`, `"{prefix}-0001"`, ...
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            issued: 0,
        }
    }

    /// Issue the next name.
    pub fn next_name(&mut self) -> String {
        let name = format!("{}-{:04}", self.prefix, self.issued);
        self.issued += 1;
        name
    }

    /// Number of names issued so far.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp() {
        assert!((clamp(1.5, -1.0, 1.0) - 1.0).abs() < 1e-12);
        assert!((clamp(-3.0, -1.0, 1.0) + 1.0).abs() < 1e-12);
        assert!((clamp(0.25, -1.0, 1.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_clamp_inverted_range_does_not_panic() {
        assert!((clamp(0.0, 1.0, -1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_identifier_is_strictly_increasing_from_zero() {
        let ids: Vec<u64> = Identifier::new().take(5).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_identifier_restarts_per_instance() {
        let mut a = Identifier::new();
        let mut b = Identifier::new();
        a.next();
        a.next();
        assert_eq!(b.next(), Some(0));
        assert_eq!(a.next(), Some(2));
    }

    #[test]
    fn test_namer_never_repeats() {
        let mut namer = Namer::new("gen");
        let names: std::collections::HashSet<String> = (0..100).map(|_| namer.next_name()).collect();
        assert_eq!(names.len(), 100);
        assert_eq!(namer.issued(), 100);
        assert!(names.contains("gen-0000"));
    }
}
