use std::path::Path;

use anyhow::Result;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::history::RevisionHistory;
use crate::revision::RevisionId;
use crate::util;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseGranularity {
    Major,
    Minor,
}

impl ReleaseGranularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
        }
    }
}

pub trait ReleaseProvider {
    fn releases(&self, granularity: ReleaseGranularity) -> Result<Vec<(RevisionId, String)>>;
}

#[derive(Debug, Deserialize)]
struct ReleaseRecord {
    hash: String,
    version: String,
}

pub struct ReleaseFile {
    entries: Vec<(RevisionId, String)>,
}

impl ReleaseFile {
    pub fn load(path: &Path, history: &dyn RevisionHistory) -> Result<Self> {
        let records: Vec<ReleaseRecord> = util::read_json(path)?;

        let mut entries = Vec::new();
        for record in records {
            match history.resolve(&record.hash) {
                Some(revision) => entries.push((revision, record.version)),
                None => {
                    warn!(
                        hash = %record.hash,
                        version = %record.version,
                        "skipping release not present in revision map"
                    );
                }
            }
        }

        Ok(Self { entries })
    }
}

impl ReleaseProvider for ReleaseFile {
    fn releases(&self, granularity: ReleaseGranularity) -> Result<Vec<(RevisionId, String)>> {
        let mut selected: Vec<(RevisionId, String)> = Vec::new();
        for (revision, version) in &self.entries {
            let keep = match classify(version) {
                Some(ReleaseLevel::Major) => true,
                Some(ReleaseLevel::Minor) => granularity == ReleaseGranularity::Minor,
                Some(ReleaseLevel::Patch) => false,
                None => {
                    debug!(version = %version, "skipping unversioned release tag");
                    false
                }
            };
            if keep {
                selected.push((revision.clone(), version.clone()));
            }
        }
        selected.sort_by_key(|(revision, _)| revision.sequence);

        Ok(selected)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseLevel {
    Major,
    Minor,
    Patch,
}

fn classify(version: &str) -> Option<ReleaseLevel> {
    let trimmed = version.trim().trim_start_matches(['v', 'V']);
    let mut components = Vec::new();
    for part in trimmed.split('.') {
        components.push(part.parse::<u64>().ok()?);
    }
    while components.last() == Some(&0) {
        components.pop();
    }

    Some(match components.len() {
        0 | 1 => ReleaseLevel::Major,
        2 => ReleaseLevel::Minor,
        _ => ReleaseLevel::Patch,
    })
}
