use anyhow::{Result, bail};
use tracing::{info, warn};

use crate::case_study::{StageSelect, store_case_study};
use crate::cli::{Distribution, GenerateArgs};
use crate::extension::{self, ExtensionSummary};
use crate::history::CommitMap;
use crate::paper_config::Workspace;
use crate::sampling::SamplingMethod;

pub fn run(args: GenerateArgs) -> Result<()> {
    if args.distribution.is_none() && args.revisions.is_empty() {
        bail!("nothing to generate, pass --distribution or at least one --revision");
    }

    let workspace = Workspace::new(&args.workspace, None, None);
    let config = workspace.resolve_config(args.paper_config.as_deref())?;
    let history = CommitMap::from_file(&workspace.commit_map_path(&args.project))?;

    let index = args
        .index
        .unwrap_or_else(|| config.next_index_for(&args.project));
    if config.has_study(&args.project, index) {
        bail!(
            "case study {}_{} already exists in paper config '{}', use extend instead",
            args.project,
            index,
            config.name()
        );
    }

    let method = match args.distribution {
        Some(distribution) => sampling_method(distribution),
        None => SamplingMethod::Specific(args.revisions.clone()),
    };

    let (mut study, summary) = extension::generate(
        &args.project,
        index,
        &history,
        &method,
        args.num_revisions,
        args.seed,
        &args.config_ids,
    )?;
    info!(
        project = %args.project,
        index,
        method = method.name(),
        added = summary.added,
        requested = summary.requested,
        "generated case study"
    );
    report_shortfall(&summary);

    if args.distribution.is_some() && !args.revisions.is_empty() {
        let pinned = extension::extend_simple_add(
            &mut study,
            &history,
            &args.revisions,
            &args.config_ids,
            StageSelect::Last,
            false,
        );
        info!(
            added = pinned.added,
            skipped = pinned.skipped,
            "pinned explicitly named revisions"
        );
        report_shortfall(&pinned);
    }

    let path = store_case_study(&study, config.path())?;
    info!(path = %path.display(), "stored case study");

    Ok(())
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
