use std::collections::BTreeSet;

use anyhow::Result;
use chrono::Datelike;
use tracing::debug;

use crate::case_study::{CaseStudy, StageSelect};
use crate::history::RevisionHistory;
use crate::release::{ReleaseGranularity, ReleaseProvider};
use crate::revision::RevisionId;
use crate::sampling::SamplingMethod;

#[derive(Debug, Default)]
pub struct ExtensionSummary {
    pub requested: usize,
    pub added: usize,
    pub skipped: usize,
    pub unresolved: Vec<String>,
}

impl ExtensionSummary {
    pub fn is_under_fulfilled(&self) -> bool {
        self.added + self.skipped < self.requested || !self.unresolved.is_empty()
    }
}

pub fn generate(
    project: &str,
    index: u32,
    history: &dyn RevisionHistory,
    method: &SamplingMethod,
    count: usize,
    seed: u64,
    config_ids: &[u32],
) -> Result<(CaseStudy, ExtensionSummary)> {
    let mut study = CaseStudy::new(project, index);
    let summary = extend_distribution(
        &mut study,
        history,
        method,
        count,
        seed,
        config_ids,
        StageSelect::Last,
    )?;

    Ok((study, summary))
}

pub fn extend_simple_add(
    study: &mut CaseStudy,
    history: &dyn RevisionHistory,
    names: &[String],
    config_ids: &[u32],
    stage: StageSelect,
    override_stages: bool,
) -> ExtensionSummary {
    if override_stages {
        study.clear_stages();
    }
    let stage = study.stage_index(stage);

    let mut summary = ExtensionSummary {
        requested: names.len(),
        ..ExtensionSummary::default()
    };
    for name in names {
        match history.resolve(name) {
            Some(revision) => {
                if study.include(stage, &revision, config_ids) {
                    summary.added += 1;
                } else {
                    summary.skipped += 1;
                }
            }
            None => summary.unresolved.push(name.clone()),
        }
    }

    summary
}

pub fn extend_distribution(
    study: &mut CaseStudy,
    history: &dyn RevisionHistory,
    method: &SamplingMethod,
    count: usize,
    seed: u64,
    config_ids: &[u32],
    stage: StageSelect,
) -> Result<ExtensionSummary> {
    let pool: Vec<RevisionId> = history
        .list_revisions()
        .iter()
        .filter(|revision| !study.is_present(revision, config_ids))
        .cloned()
        .collect();

    let sample = method.sample(&pool, history, count, seed)?;
    let stage = study.stage_index(stage);

    let mut summary = ExtensionSummary {
        requested: sample.requested,
        unresolved: sample.unresolved.clone(),
        ..ExtensionSummary::default()
    };
    for revision in &sample.revisions {
        if study.include(stage, revision, config_ids) {
            summary.added += 1;
        } else {
            summary.skipped += 1;
        }
    }
    if summary.added > 0 {
        study.record_sampling(stage, method.name());
    }

    Ok(summary)
}

pub fn extend_per_year(
    study: &mut CaseStudy,
    history: &dyn RevisionHistory,
    per_year: usize,
    seed: u64,
    config_ids: &[u32],
    stage: StageSelect,
    separate_stages: bool,
) -> Result<ExtensionSummary> {
    let pool: Vec<RevisionId> = history
        .list_revisions()
        .iter()
        .filter(|revision| !study.is_present(revision, config_ids))
        .cloned()
        .collect();

    let sample = SamplingMethod::PerYear.sample(&pool, history, per_year, seed)?;

    let mut summary = ExtensionSummary {
        requested: sample.requested,
        unresolved: sample.unresolved.clone(),
        ..ExtensionSummary::default()
    };
    let mut touched = BTreeSet::new();
    for revision in &sample.revisions {
        let stage_index = match (separate_stages, history.commit_date(revision)) {
            (true, Some(date)) => study.stage_for_name(&date.year().to_string()),
            _ => study.stage_index(stage),
        };
        if study.include(stage_index, revision, config_ids) {
            summary.added += 1;
            touched.insert(stage_index);
        } else {
            summary.skipped += 1;
        }
    }
    for stage_index in touched {
        study.record_sampling(stage_index, SamplingMethod::PerYear.name());
    }

    Ok(summary)
}

pub fn extend_releases(
    study: &mut CaseStudy,
    provider: &dyn ReleaseProvider,
    granularity: ReleaseGranularity,
    config_ids: &[u32],
    stage: StageSelect,
) -> Result<ExtensionSummary> {
    let releases = provider.releases(granularity)?;
    let stage = study.stage_index(stage);

    let mut summary = ExtensionSummary {
        requested: releases.len(),
        ..ExtensionSummary::default()
    };
    for (revision, version) in &releases {
        if study.include(stage, revision, config_ids) {
            debug!(version = %version, revision = %revision, "pinned release");
            summary.added += 1;
        } else {
            summary.skipped += 1;
        }
    }
    if summary.added > 0 {
        study.record_sampling(stage, &format!("release_{}", granularity.as_str()));
    }

    Ok(summary)
}
