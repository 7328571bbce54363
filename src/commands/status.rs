use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{self, Write};

use anyhow::Result;

use crate::cli::StatusArgs;
use crate::paper_config::Workspace;
use crate::results::{self, ReportFile, RevisionStatus, StatusCounts};

pub fn run(args: StatusArgs) -> Result<()> {
    let workspace = Workspace::new(&args.workspace, args.result_root.clone(), None);
    let config = workspace.resolve_config(args.paper_config.as_deref())?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(
        output,
        "Status of paper config '{}' for {} results",
        config.name(),
        args.report_kind
    )?;
    writeln!(
        output,
        "CS: <project>_<index>: (<success>/<total>) processed [success/in_progress/failed/missing]"
    )?;

    let mut scans: HashMap<String, Vec<ReportFile>> = HashMap::new();
    for study in config.studies() {
        if let Some(project) = &args.project {
            if &study.project != project {
                continue;
            }
        }

        let files = match scans.entry(study.project.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let files =
                    results::scan_project_results(workspace.result_root(), &study.project)?;
                entry.insert(files)
            }
        };

        let reports = results::case_study_status(study, &args.report_kind, files);
        let counts = StatusCounts::tally(&reports);

        writeln!(
            output,
            "CS: {}_{}: ({:3}/{:3}) processed [{}/{}/{}/{}]",
            study.project,
            study.index,
            counts.success,
            counts.total(),
            counts.success,
            counts.in_progress,
            counts.failed,
            counts.missing
        )?;

        if args.detail {
            for report in &reports {
                let label = match &report.combined {
                    RevisionStatus::InProgress { success, failed } => {
                        format!("in_progress ({success} done, {failed} failed)")
                    }
                    other => other.as_str().to_string(),
                };
                writeln!(output, "    {} {}", report.revision.short(), label)?;

                for (slot, status) in &report.per_config {
                    if let Some(config_id) = slot {
                        writeln!(output, "      config {config_id}: {}", status.as_str())?;
                    }
                }
            }
        }
    }
    output.flush()?;

    Ok(())
}
