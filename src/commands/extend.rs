use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::case_study::{StageSelect, store_case_study};
use crate::cli::{Distribution, ExtendArgs, ExtendStrategy, Granularity};
use crate::extension::{self, ExtensionSummary};
use crate::history::CommitMap;
use crate::paper_config::Workspace;
use crate::release::{ReleaseFile, ReleaseGranularity};
use crate::sampling::SamplingMethod;

pub fn run(args: ExtendArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace, None, None);
    let config = workspace.resolve_config(args.paper_config.as_deref())?;
    let mut study = config.find_study(&args.project, args.index)?.clone();
    let history = CommitMap::from_file(&workspace.commit_map_path(&args.project))?;

    let stage = stage_select(args.stage);
    let summary = match args.strategy {
        ExtendStrategy::SimpleAdd => {
            if args.revisions.is_empty() {
                bail!("simple-add needs at least one --revision");
            }
            extension::extend_simple_add(
                &mut study,
                &history,
                &args.revisions,
                &args.config_ids,
                stage,
                args.override_stages,
            )
        }
        ExtendStrategy::DistributionAdd => {
            let Some(distribution) = args.distribution else {
                bail!("distribution-add needs --distribution");
            };
            extension::extend_distribution(
                &mut study,
                &history,
                &sampling_method(distribution),
                args.num_revisions,
                args.seed,
                &args.config_ids,
                stage,
            )?
        }
        ExtendStrategy::PerYearAdd => extension::extend_per_year(
            &mut study,
            &history,
            args.num_revisions,
            args.seed,
            &args.config_ids,
            stage,
            args.year_stages,
        )?,
        ExtendStrategy::ReleaseAdd => {
            let releases_path = workspace.releases_path(&args.project);
            if !releases_path.exists() {
                bail!(
                    "no release map for '{}' at {}",
                    args.project,
                    releases_path.display()
                );
            }
            let provider = ReleaseFile::load(&releases_path, &history)?;
            extension::extend_releases(
                &mut study,
                &provider,
                granularity(args.granularity),
                &args.config_ids,
                stage,
            )?
        }
    };

    if let Some(name) = &args.stage_name {
        if args.strategy == ExtendStrategy::PerYearAdd && args.year_stages {
            warn!("--stage-name is ignored when --year-stages names stages by year");
        } else {
            let stage_index = study.stage_index(stage);
            study.name_stage(stage_index, name);
        }
    }

    info!(
        project = %study.project,
        index = study.index,
        strategy = args.strategy.as_str(),
        added = summary.added,
        skipped = summary.skipped,
        "extended case study"
    );
    report_shortfall(&summary);

    let path = store_case_study(&study, config.path())?;
    info!(path = %path.display(), "stored case study");

    Ok(())
}

fn stage_select(stage: i64) -> StageSelect {
    if stage < 0 {
        StageSelect::Last
    } else {
        StageSelect::Index(stage as usize)
    }
}

fn sampling_method(distribution: Distribution) -> SamplingMethod {
    match distribution {
        Distribution::Uniform => SamplingMethod::Uniform,
        Distribution::HalfNormal => SamplingMethod::HalfNormal,
        Distribution::Normal => SamplingMethod::Normal,
        Distribution::PerYear => SamplingMethod::PerYear,
        Distribution::Latest => SamplingMethod::Latest,
    }
}

fn granularity(granularity: Granularity) -> ReleaseGranularity {
    match granularity {
        Granularity::Major => ReleaseGranularity::Major,
        Granularity::Minor => ReleaseGranularity::Minor,
    }
}

fn report_shortfall(summary: &ExtensionSummary) {
    if summary.is_under_fulfilled() {
        warn!(
            added = summary.added,
            skipped = summary.skipped,
            requested = summary.requested,
            "recorded fewer revisions than requested"
        );
    }
    for name in &summary.unresolved {
        warn!(revision = %name, "cannot resolve revision against the revision map");
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use tempfile::TempDir;

    use crate::case_study::{CaseStudy, load_case_study};

    use super::*;

    fn hash_for(index: usize) -> String {
        format!("{index:02x}").repeat(20)
    }

    fn seed_workspace(root: &Path) {
        let config_dir = root.join("paper_configs").join("test");
        fs::create_dir_all(&config_dir).unwrap();
        store_case_study(&CaseStudy::new("gzip", 0), &config_dir).unwrap();

        let maps = root.join("revision_maps");
        fs::create_dir_all(&maps).unwrap();
        let lines: String = (0..6)
            .map(|index| {
                let year = if index < 3 { 2019 } else { 2020 };
                format!(
                    "{}, {}, {}-{:02}-01T00:00:00+00:00\n",
                    index,
                    hash_for(index),
                    year,
                    index % 3 + 1
                )
            })
            .collect();
        fs::write(maps.join("gzip.rmap"), lines).unwrap();
    }

    fn base_args(root: &Path) -> ExtendArgs {
        ExtendArgs {
            workspace: root.to_path_buf(),
            paper_config: Some("test".to_string()),
            project: "gzip".to_string(),
            index: Some(0),
            strategy: ExtendStrategy::SimpleAdd,
            stage: -1,
            stage_name: None,
            distribution: None,
            num_revisions: 1,
            seed: 0,
            revisions: Vec::new(),
            config_ids: Vec::new(),
            override_stages: false,
            year_stages: false,
            granularity: Granularity::Minor,
        }
    }

    fn reload(root: &Path) -> CaseStudy {
        load_case_study(
            &root
                .join("paper_configs")
                .join("test")
                .join("gzip_0.case_study"),
        )
        .unwrap()
    }

    #[test]
    fn year_stages_keep_their_year_names() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        let mut args = base_args(dir.path());
        args.strategy = ExtendStrategy::PerYearAdd;
        args.year_stages = true;
        args.stage_name = Some("pinned".to_string());
        run(args).unwrap();

        let study = reload(dir.path());
        let names: Vec<Option<&str>> = study
            .stages
            .iter()
            .map(|stage| stage.name.as_deref())
            .collect();
        assert_eq!(names, vec![Some("2019"), Some("2020")]);
    }

    #[test]
    fn stage_name_labels_the_target_stage() {
        let dir = TempDir::new().unwrap();
        seed_workspace(dir.path());

        let mut args = base_args(dir.path());
        args.revisions = vec![hash_for(2)];
        args.stage_name = Some("pinned".to_string());
        run(args).unwrap();

        let study = reload(dir.path());
        assert_eq!(study.revision_count(), 1);
        assert_eq!(study.stages[0].name.as_deref(), Some("pinned"));
    }
}
