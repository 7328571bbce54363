use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::case_study::CaseStudy;
use crate::report::{FileNameParser, FileStatus, ParsedFileName, ReportDescriptor};
use crate::revision::RevisionId;

#[derive(Debug, Clone)]
pub struct ReportFile {
    pub descriptor: ReportDescriptor,
    pub path: PathBuf,
    pub modified: SystemTime,
}

pub fn scan_project_results(result_root: &Path, project: &str) -> Result<Vec<ReportFile>> {
    let directory = result_root.join(project);
    if !directory.exists() {
        warn!(
            path = %directory.display(),
            "result directory missing, treating as no reports"
        );
        return Ok(Vec::new());
    }

    let parser = FileNameParser::new()?;
    let mut files = Vec::new();
    collect_reports(&directory, &parser, &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(files)
}

fn collect_reports(
    directory: &Path,
    parser: &FileNameParser,
    files: &mut Vec<ReportFile>,
) -> Result<()> {
    let entries = fs::read_dir(directory)
        .with_context(|| format!("failed to read {}", directory.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", directory.display()))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?;

        if file_type.is_dir() {
            collect_reports(&path, parser, files)?;
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
            debug!(path = %path.display(), "skipping file with non-utf8 name");
            continue;
        };

        match parser.parse(file_name) {
            ParsedFileName::Report(descriptor) => {
                let modified = entry
                    .metadata()
                    .and_then(|metadata| metadata.modified())
                    .with_context(|| format!("failed to read mtime: {}", path.display()))?;
                files.push(ReportFile {
                    descriptor,
                    path,
                    modified,
                });
            }
            ParsedFileName::Unrecognized(name) => {
                debug!(file = %name, "ignoring unrecognized result file");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairStatus {
    Missing,
    Success,
    Failed,
    CompileError,
}

impl PairStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::CompileError => "cerror",
        }
    }

    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::CompileError)
    }

    fn from_file(status: FileStatus) -> Self {
        match status {
            FileStatus::Success => Self::Success,
            FileStatus::Failed => Self::Failed,
            FileStatus::CompileError => Self::CompileError,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Self::Success => 3,
            Self::Failed => 2,
            Self::CompileError => 1,
            Self::Missing => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionStatus {
    Missing,
    InProgress { success: usize, failed: usize },
    Success,
    Failed,
}

impl RevisionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::InProgress { .. } => "in_progress",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RevisionReport {
    pub revision: RevisionId,
    pub per_config: Vec<(Option<u32>, PairStatus)>,
    pub combined: RevisionStatus,
}

pub fn case_study_status(
    study: &CaseStudy,
    report_kind: &str,
    files: &[ReportFile],
) -> Vec<RevisionReport> {
    study
        .revision_configs()
        .into_iter()
        .map(|(revision, config_ids)| {
            let slots: Vec<Option<u32>> = if config_ids.is_empty() {
                vec![None]
            } else {
                config_ids.into_iter().map(Some).collect()
            };

            let per_config: Vec<(Option<u32>, PairStatus)> = slots
                .into_iter()
                .map(|slot| {
                    (
                        slot,
                        pair_status(&study.project, report_kind, &revision, slot, files),
                    )
                })
                .collect();
            let combined = combine(&per_config);

            RevisionReport {
                revision,
                per_config,
                combined,
            }
        })
        .collect()
}

fn pair_status(
    project: &str,
    report_kind: &str,
    revision: &RevisionId,
    config_id: Option<u32>,
    files: &[ReportFile],
) -> PairStatus {
    let newest = files
        .iter()
        .filter(|file| {
            file.descriptor.report_kind == report_kind
                && file.descriptor.project == project
                && file.descriptor.config_id == config_id
                && file.descriptor.matches_revision_of(revision.hash.as_str())
        })
        .max_by_key(|file| {
            (
                file.modified,
                PairStatus::from_file(file.descriptor.status).rank(),
            )
        });

    match newest {
        Some(file) => PairStatus::from_file(file.descriptor.status),
        None => PairStatus::Missing,
    }
}

fn combine(per_config: &[(Option<u32>, PairStatus)]) -> RevisionStatus {
    let total = per_config.len();
    let success = per_config
        .iter()
        .filter(|(_, status)| *status == PairStatus::Success)
        .count();
    let failed = per_config
        .iter()
        .filter(|(_, status)| status.is_failure())
        .count();
    let missing = total - success - failed;

    if missing == total {
        RevisionStatus::Missing
    } else if missing == 0 && failed == 0 {
        RevisionStatus::Success
    } else if missing == 0 {
        RevisionStatus::Failed
    } else {
        RevisionStatus::InProgress { success, failed }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StatusCounts {
    pub success: usize,
    pub in_progress: usize,
    pub failed: usize,
    pub missing: usize,
}

impl StatusCounts {
    pub fn tally(reports: &[RevisionReport]) -> Self {
        let mut counts = Self::default();
        for report in reports {
            match report.combined {
                RevisionStatus::Success => counts.success += 1,
                RevisionStatus::InProgress { .. } => counts.in_progress += 1,
                RevisionStatus::Failed => counts.failed += 1,
                RevisionStatus::Missing => counts.missing += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.success + self.in_progress + self.failed + self.missing
    }
}

#[derive(Debug)]
pub struct RunGroup<'a> {
    pub revision: String,
    pub config_id: Option<u32>,
    pub runs: Vec<&'a ReportFile>,
}

impl<'a> RunGroup<'a> {
    pub fn newest(&self) -> &'a ReportFile {
        self.runs[self.runs.len() - 1]
    }

    pub fn superseded(&self) -> &[&'a ReportFile] {
        &self.runs[..self.runs.len() - 1]
    }
}

pub fn group_runs<'a>(
    files: &'a [ReportFile],
    report_kind: &str,
    project: &str,
) -> Vec<RunGroup<'a>> {
    let mut groups: BTreeMap<(String, Option<u32>), Vec<&'a ReportFile>> = BTreeMap::new();

    for file in files {
        if file.descriptor.report_kind != report_kind || file.descriptor.project != project {
            continue;
        }
        groups
            .entry((file.descriptor.revision.clone(), file.descriptor.config_id))
            .or_default()
            .push(file);
    }

    groups
        .into_iter()
        .map(|((revision, config_id), mut runs)| {
            runs.sort_by_key(|file| {
                (
                    file.modified,
                    PairStatus::from_file(file.descriptor.status).rank(),
                )
            });
            RunGroup {
                revision,
                config_id,
                runs,
            }
        })
        .collect()
}
