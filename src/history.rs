use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};

use crate::revision::{MIN_PREFIX_LENGTH, RevisionHash, RevisionId};

pub trait RevisionHistory {
    fn list_revisions(&self) -> &[RevisionId];

    fn commit_date(&self, revision: &RevisionId) -> Option<DateTime<Utc>>;

    fn resolve(&self, prefix: &str) -> Option<RevisionId>;
}

#[derive(Debug, Clone)]
pub struct CommitMap {
    revisions: Vec<RevisionId>,
    dates: HashMap<RevisionHash, DateTime<Utc>>,
}

impl CommitMap {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read revision map: {}", path.display()))?;
        Self::from_lines(&raw)
            .with_context(|| format!("failed to parse revision map: {}", path.display()))
    }

    pub fn from_lines(raw: &str) -> Result<Self> {
        let mut revisions = Vec::new();
        let mut dates = HashMap::new();

        for (line_number, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.splitn(3, ',').map(str::trim).collect();
            if fields.len() < 2 {
                bail!("line {}: expected '<sequence>, <hash>'", line_number + 1);
            }

            let sequence: u32 = fields[0].parse().with_context(|| {
                format!("line {}: invalid sequence number '{}'", line_number + 1, fields[0])
            })?;

            let hash = fields[1];
            if hash.is_empty() || !hash.chars().all(|ch| ch.is_ascii_hexdigit()) {
                bail!("line {}: invalid commit hash '{}'", line_number + 1, hash);
            }

            let revision = RevisionId::new(hash, sequence);
            if let Some(date_field) = fields.get(2) {
                let date = DateTime::parse_from_rfc3339(date_field).with_context(|| {
                    format!("line {}: invalid commit date '{}'", line_number + 1, date_field)
                })?;
                dates.insert(revision.hash.clone(), date.with_timezone(&Utc));
            }

            revisions.push(revision);
        }

        revisions.sort_by_key(|revision| revision.sequence);
        Ok(Self { revisions, dates })
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }
}

impl RevisionHistory for CommitMap {
    fn list_revisions(&self) -> &[RevisionId] {
        &self.revisions
    }

    fn commit_date(&self, revision: &RevisionId) -> Option<DateTime<Utc>> {
        self.dates.get(&revision.hash).copied()
    }

    fn resolve(&self, prefix: &str) -> Option<RevisionId> {
        let prefix = prefix.trim();
        if prefix.len() < MIN_PREFIX_LENGTH {
            return None;
        }

        let mut matches = self
            .revisions
            .iter()
            .filter(|revision| revision.hash.matches_prefix(prefix));

        match (matches.next(), matches.next()) {
            (Some(revision), None) => Some(revision.clone()),
            _ => None,
        }
    }
}
