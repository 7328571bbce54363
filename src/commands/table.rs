use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::cache::{DataCache, TabularData};
use crate::case_study::CaseStudy;
use crate::cli::TableArgs;
use crate::paper_config::Workspace;
use crate::results::{self, ReportFile};

pub fn run(args: TableArgs) -> Result<()> {
    let workspace = Workspace::new(
        &args.workspace,
        args.result_root.clone(),
        args.cache_root.clone(),
    );
    let config = workspace.resolve_config(args.paper_config.as_deref())?;
    let study = config.find_study(&args.project, args.index)?;

    let files = results::scan_project_results(workspace.result_root(), &study.project)?;
    let mut inputs: Vec<PathBuf> = files.iter().map(|file| file.path.clone()).collect();
    inputs.push(config.study_path(study));

    let key = format!(
        "report-overview-{}-{}-{}_{}",
        config.name(),
        args.report_kind,
        study.project,
        study.index
    );
    let cache = DataCache::new(workspace.cache_root(), args.refresh);
    let table = cache.get_or_build(&key, &inputs, || {
        Ok(build_table(study, &args.report_kind, &files))
    })?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "{}", table.columns.join("\t"))?;
    for row in &table.rows {
        writeln!(output, "{}", row.join("\t"))?;
    }
    output.flush()?;

    Ok(())
}

fn build_table(study: &CaseStudy, report_kind: &str, files: &[ReportFile]) -> TabularData {
    let groups = results::group_runs(files, report_kind, &study.project);

    let mut rows = Vec::new();
    for (revision, config_ids) in study.revision_configs() {
        let slots: Vec<Option<u32>> = if config_ids.is_empty() {
            vec![None]
        } else {
            config_ids.into_iter().map(Some).collect()
        };

        for slot in slots {
            let group = groups.iter().find(|group| {
                group.config_id == slot && revision.hash.as_str().starts_with(&group.revision)
            });

            let (status, runs, newest) = match group {
                Some(group) => {
                    let newest = group.newest();
                    (
                        newest.descriptor.status.as_str().to_string(),
                        group.runs.len().to_string(),
                        DateTime::<Utc>::from(newest.modified)
                            .to_rfc3339_opts(SecondsFormat::Secs, true),
                    )
                }
                None => ("missing".to_string(), "0".to_string(), "-".to_string()),
            };

            rows.push(vec![
                revision.short().to_string(),
                slot.map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                status,
                runs,
                newest,
            ]);
        }
    }

    TabularData {
        columns: ["revision", "config", "status", "runs", "newest_result"]
            .into_iter()
            .map(String::from)
            .collect(),
        rows,
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use crate::case_study::StageSelect;
    use crate::report::{FileStatus, ReportDescriptor};
    use crate::revision::RevisionId;

    use super::*;

    fn full_hash(letter: char) -> String {
        letter.to_string().repeat(40)
    }

    fn report_file(revision: char, config_id: Option<u32>, status: FileStatus) -> ReportFile {
        let descriptor = ReportDescriptor {
            report_kind: "TimeReport".to_string(),
            project: "gzip".to_string(),
            revision: full_hash(revision)[..10].to_string(),
            config_id,
            run_id: "11111111-1111-1111-1111-111111111111".to_string(),
            status,
            extension: "txt".to_string(),
        };
        let path = PathBuf::from(descriptor.file_name());

        ReportFile {
            descriptor,
            path,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(100),
        }
    }

    #[test]
    fn rows_carry_revision_config_and_status_columns() {
        let mut study = CaseStudy::new("gzip", 0);
        let stage = study.stage_index(StageSelect::Last);
        study.include(stage, &RevisionId::new(&full_hash('a'), 0), &[]);
        study.include(stage, &RevisionId::new(&full_hash('b'), 1), &[]);

        let files = vec![report_file('b', None, FileStatus::Success)];
        let table = build_table(&study, "TimeReport", &files);

        assert_eq!(
            table.columns,
            vec!["revision", "config", "status", "runs", "newest_result"]
        );
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][..4], ["bbbbbbbbbb", "-", "success", "1"]);
        assert_eq!(table.rows[1][..4], ["aaaaaaaaaa", "-", "missing", "0"]);
    }

    #[test]
    fn config_slots_become_separate_rows() {
        let mut study = CaseStudy::new("gzip", 0);
        study.include(0, &RevisionId::new(&full_hash('a'), 0), &[1, 2]);

        let files = vec![report_file('a', Some(2), FileStatus::Failed)];
        let table = build_table(&study, "TimeReport", &files);

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0][..3], ["aaaaaaaaaa", "1", "missing"]);
        assert_eq!(table.rows[1][..3], ["aaaaaaaaaa", "2", "failed"]);
    }
}
