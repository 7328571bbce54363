use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

pub const SHORT_HASH_LENGTH: usize = 10;
pub const MIN_PREFIX_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionHash(String);

impl RevisionHash {
    pub fn new(hash: &str) -> Self {
        Self(hash.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self.0.len().min(SHORT_HASH_LENGTH);
        &self.0[..end]
    }

    pub fn matches_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(&prefix.to_ascii_lowercase())
    }
}

impl fmt::Display for RevisionHash {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionId {
    pub hash: RevisionHash,
    pub sequence: u32,
}

impl RevisionId {
    pub fn new(hash: &str, sequence: u32) -> Self {
        Self {
            hash: RevisionHash::new(hash),
            sequence,
        }
    }

    pub fn short(&self) -> &str {
        self.hash.short()
    }
}

impl PartialEq for RevisionId {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for RevisionId {}

impl Hash for RevisionId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.short())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn hashes_normalize_to_lowercase() {
        let hash = RevisionHash::new(" AB12CD34EF56AB12CD34EF56AB12CD34EF56AB12 ");
        assert_eq!(hash.as_str(), "ab12cd34ef56ab12cd34ef56ab12cd34ef56ab12");
        assert_eq!(hash.short(), "ab12cd34ef");
    }

    #[test]
    fn prefix_matching_ignores_case_and_rejects_empty() {
        let hash = RevisionHash::new("deadbeef00deadbeef00deadbeef00deadbeef00");
        assert!(hash.matches_prefix("DEADBEEF"));
        assert!(hash.matches_prefix("deadbeef00dead"));
        assert!(!hash.matches_prefix("beef"));
        assert!(!hash.matches_prefix(""));
    }

    #[test]
    fn revision_equality_ignores_sequence_numbers() {
        let first = RevisionId::new("aaaa000011112222aaaa000011112222aaaa0000", 7);
        let second = RevisionId::new("aaaa000011112222aaaa000011112222aaaa0000", 99);
        let other = RevisionId::new("bbbb000011112222aaaa000011112222aaaa0000", 7);

        assert_eq!(first, second);
        assert_ne!(first, other);

        let mut seen = HashSet::new();
        seen.insert(first);
        assert!(seen.contains(&second));
    }

    #[test]
    fn short_form_is_ten_characters() {
        let revision = RevisionId::new("0123456789abcdef0123456789abcdef01234567", 0);
        assert_eq!(revision.short(), "0123456789");
        assert_eq!(revision.to_string(), "0123456789");
    }
}
