use std::fs;

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::{CleanupArgs, CleanupMode};
use crate::paper_config::{PaperConfig, Workspace};
use crate::results::{self, ReportFile};

pub fn run(args: CleanupArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace, args.result_root.clone(), None);
    let config = workspace.resolve_config(args.paper_config.as_deref())?;

    let mut projects: Vec<String> = config
        .studies()
        .iter()
        .map(|study| study.project.clone())
        .collect();
    projects.sort();
    projects.dedup();

    let mut removed = 0usize;
    let mut kept = 0usize;
    for project in &projects {
        if let Some(filter) = &args.project {
            if project != filter {
                continue;
            }
        }

        let files = results::scan_project_results(workspace.result_root(), project)?;
        let victims = match args.mode {
            CleanupMode::Error => {
                error_victims(&config, project, &files, args.report_kind.as_deref())
            }
            CleanupMode::Old => superseded_victims(&files, project, args.report_kind.as_deref()),
        };
        kept += files.len() - victims.len();

        for file in victims {
            if args.dry_run {
                info!(path = %file.path.display(), "would delete");
            } else {
                fs::remove_file(&file.path)
                    .with_context(|| format!("failed to delete {}", file.path.display()))?;
                info!(path = %file.path.display(), "deleted");
            }
            removed += 1;
        }
    }

    info!(removed, kept, dry_run = args.dry_run, "cleanup finished");

    Ok(())
}

fn error_victims<'a>(
    config: &PaperConfig,
    project: &str,
    files: &'a [ReportFile],
    report_kind: Option<&str>,
) -> Vec<&'a ReportFile> {
    let tracked: Vec<String> = config
        .studies_for_project(project)
        .iter()
        .flat_map(|study| study.revision_configs())
        .map(|(revision, _)| revision.hash.as_str().to_string())
        .collect();

    files
        .iter()
        .filter(|file| {
            file.descriptor.status.is_failure()
                && report_kind.is_none_or(|kind| file.descriptor.report_kind == kind)
                && tracked
                    .iter()
                    .any(|hash| file.descriptor.matches_revision_of(hash))
        })
        .collect()
}

fn superseded_victims<'a>(
    files: &'a [ReportFile],
    project: &str,
    report_kind: Option<&str>,
) -> Vec<&'a ReportFile> {
    let kinds: Vec<String> = match report_kind {
        Some(kind) => vec![kind.to_string()],
        None => {
            let mut kinds: Vec<String> = files
                .iter()
                .map(|file| file.descriptor.report_kind.clone())
                .collect();
            kinds.sort();
            kinds.dedup();
            kinds
        }
    };

    let mut victims = Vec::new();
    for kind in &kinds {
        for group in results::group_runs(files, kind, project) {
            victims.extend(group.superseded().iter().copied());
        }
    }

    victims
}
