use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::revision::{RevisionHash, RevisionId};
use crate::util::{read_json, write_json_atomic};

pub const CASE_STUDY_DOCUMENT: &str = "CaseStudy";
pub const CASE_STUDY_SCHEMA_VERSION: u32 = 1;
pub const CASE_STUDY_EXTENSION: &str = "case_study";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyEntry {
    pub hash: RevisionHash,
    pub sequence: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub config_ids: Vec<u32>,
}

impl StudyEntry {
    pub fn new(revision: &RevisionId, config_ids: &[u32]) -> Self {
        let mut config_ids = config_ids.to_vec();
        config_ids.sort_unstable();
        config_ids.dedup();

        Self {
            hash: revision.hash.clone(),
            sequence: revision.sequence,
            config_ids,
        }
    }

    pub fn revision(&self) -> RevisionId {
        RevisionId {
            hash: self.hash.clone(),
            sequence: self.sequence,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_method: Option<String>,
    #[serde(default)]
    pub revisions: Vec<StudyEntry>,
}

impl Stage {
    pub fn empty() -> Self {
        Self {
            name: None,
            sampling_method: None,
            revisions: Vec::new(),
        }
    }

    fn sort_newest_first(&mut self) {
        self.revisions.sort_by(|a, b| b.sequence.cmp(&a.sequence));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSelect {
    Last,
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseStudy {
    pub document: String,
    pub schema_version: u32,
    pub project: String,
    pub index: u32,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub configs: BTreeMap<u32, String>,
}

impl CaseStudy {
    pub fn new(project: &str, index: u32) -> Self {
        Self {
            document: CASE_STUDY_DOCUMENT.to_string(),
            schema_version: CASE_STUDY_SCHEMA_VERSION,
            project: project.to_string(),
            index,
            stages: Vec::new(),
            configs: BTreeMap::new(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.{}", self.project, self.index, CASE_STUDY_EXTENSION)
    }

    pub fn entries(&self) -> impl Iterator<Item = &StudyEntry> {
        self.stages.iter().flat_map(|stage| stage.revisions.iter())
    }

    pub fn revision_count(&self) -> usize {
        self.entries()
            .map(|entry| entry.hash.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn has_revision(&self, hash: &RevisionHash) -> bool {
        self.entries().any(|entry| &entry.hash == hash)
    }

    pub fn has_pair(&self, hash: &RevisionHash, config_id: u32) -> bool {
        self.entries()
            .any(|entry| &entry.hash == hash && entry.config_ids.contains(&config_id))
    }

    pub fn uses_configs(&self) -> bool {
        !self.configs.is_empty() || self.entries().any(|entry| !entry.config_ids.is_empty())
    }

    pub fn is_present(&self, revision: &RevisionId, config_ids: &[u32]) -> bool {
        if config_ids.is_empty() || !self.uses_configs() {
            self.has_revision(&revision.hash)
        } else {
            config_ids
                .iter()
                .all(|&config_id| self.has_pair(&revision.hash, config_id))
        }
    }

    pub fn stage_index(&mut self, select: StageSelect) -> usize {
        match select {
            StageSelect::Last => {
                if self.stages.is_empty() {
                    self.stages.push(Stage::empty());
                }
                self.stages.len() - 1
            }
            StageSelect::Index(index) => {
                while self.stages.len() <= index {
                    self.stages.push(Stage::empty());
                }
                index
            }
        }
    }

    pub fn stage_for_name(&mut self, name: &str) -> usize {
        if let Some(position) = self
            .stages
            .iter()
            .position(|stage| stage.name.as_deref() == Some(name))
        {
            return position;
        }

        let mut stage = Stage::empty();
        stage.name = Some(name.to_string());
        self.stages.push(stage);
        self.stages.len() - 1
    }

    pub fn record_sampling(&mut self, stage_index: usize, method_name: &str) {
        if let Some(stage) = self.stages.get_mut(stage_index) {
            stage.sampling_method = Some(method_name.to_string());
        }
    }

    pub fn name_stage(&mut self, stage_index: usize, name: &str) {
        if let Some(stage) = self.stages.get_mut(stage_index) {
            stage.name = Some(name.to_string());
        }
    }

    pub fn include(&mut self, stage_index: usize, revision: &RevisionId, config_ids: &[u32]) -> bool {
        while self.stages.len() <= stage_index {
            self.stages.push(Stage::empty());
        }

        if config_ids.is_empty() || !self.uses_configs() {
            if self.has_revision(&revision.hash) {
                return false;
            }

            let stage = &mut self.stages[stage_index];
            stage.revisions.push(StudyEntry::new(revision, config_ids));
            stage.sort_newest_first();
            return true;
        }

        let missing: Vec<u32> = config_ids
            .iter()
            .copied()
            .filter(|&config_id| !self.has_pair(&revision.hash, config_id))
            .collect();
        if missing.is_empty() {
            return false;
        }

        let stage = &mut self.stages[stage_index];
        match stage
            .revisions
            .iter()
            .position(|entry| entry.hash == revision.hash)
        {
            Some(position) => {
                let entry = &mut stage.revisions[position];
                entry.config_ids.extend(missing);
                entry.config_ids.sort_unstable();
                entry.config_ids.dedup();
            }
            None => stage.revisions.push(StudyEntry::new(revision, &missing)),
        }
        stage.sort_newest_first();
        true
    }

    pub fn clear_stages(&mut self) {
        self.stages.clear();
    }

    pub fn revision_configs(&self) -> Vec<(RevisionId, Vec<u32>)> {
        let mut order: Vec<RevisionId> = Vec::new();
        let mut merged: HashMap<RevisionHash, Vec<u32>> = HashMap::new();

        for entry in self.entries() {
            if !merged.contains_key(&entry.hash) {
                order.push(entry.revision());
            }
            merged
                .entry(entry.hash.clone())
                .or_default()
                .extend(entry.config_ids.iter().copied());
        }

        order
            .into_iter()
            .map(|revision| {
                let mut config_ids = merged.remove(&revision.hash).unwrap_or_default();
                config_ids.sort_unstable();
                config_ids.dedup();
                (revision, config_ids)
            })
            .collect()
    }
}

pub fn load_case_study(path: &Path) -> Result<CaseStudy> {
    let study: CaseStudy = read_json(path)?;

    if study.document != CASE_STUDY_DOCUMENT {
        bail!(
            "{}: expected a {} document, found '{}'",
            path.display(),
            CASE_STUDY_DOCUMENT,
            study.document
        );
    }
    if study.schema_version != CASE_STUDY_SCHEMA_VERSION {
        bail!(
            "{}: unsupported schema version {} (expected {})",
            path.display(),
            study.schema_version,
            CASE_STUDY_SCHEMA_VERSION
        );
    }

    Ok(study)
}

pub fn store_case_study(study: &CaseStudy, directory: &Path) -> Result<PathBuf> {
    let path = directory.join(study.file_name());
    write_json_atomic(&path, study)?;
    Ok(path)
}
