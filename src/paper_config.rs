use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::case_study::{self, CaseStudy};
use crate::util;

pub const SETTINGS_VERSION: u32 = 1;
pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub settings_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_config: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            settings_version: SETTINGS_VERSION,
            current_config: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    result_root: PathBuf,
    cache_root: PathBuf,
}

impl Workspace {
    pub fn new(root: &Path, result_root: Option<PathBuf>, cache_root: Option<PathBuf>) -> Self {
        Self {
            result_root: result_root.unwrap_or_else(|| root.join("results")),
            cache_root: cache_root.unwrap_or_else(|| root.join("data_cache")),
            root: root.to_path_buf(),
        }
    }

    pub fn result_root(&self) -> &Path {
        &self.result_root
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn settings_path(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn paper_configs_root(&self) -> PathBuf {
        self.root.join("paper_configs")
    }

    pub fn revision_maps_root(&self) -> PathBuf {
        self.root.join("revision_maps")
    }

    pub fn commit_map_path(&self, project: &str) -> PathBuf {
        self.revision_maps_root().join(format!("{project}.rmap"))
    }

    pub fn releases_path(&self, project: &str) -> PathBuf {
        self.revision_maps_root()
            .join(format!("{project}.releases.json"))
    }

    pub fn config_path(&self, name: &str) -> PathBuf {
        self.paper_configs_root().join(name)
    }

    pub fn load_settings(&self) -> Result<Settings> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }

        let settings: Settings = util::read_json(&path)?;
        if settings.settings_version != SETTINGS_VERSION {
            bail!(
                "{}: unsupported settings version {} (expected {})",
                path.display(),
                settings.settings_version,
                SETTINGS_VERSION
            );
        }

        Ok(settings)
    }

    pub fn store_settings(&self, settings: &Settings) -> Result<()> {
        util::write_json_atomic(&self.settings_path(), settings)
    }

    pub fn current_config_name(&self) -> Result<String> {
        match self.load_settings()?.current_config {
            Some(name) => Ok(name),
            None => bail!("no paper config selected, run 'casepin config select <name>' first"),
        }
    }

    pub fn paper_config(&self, name: &str) -> Result<PaperConfig> {
        let path = self.config_path(name);
        if !path.is_dir() {
            bail!(
                "paper config '{name}' does not exist under {}",
                self.paper_configs_root().display()
            );
        }
        PaperConfig::load(name, &path)
    }

    pub fn resolve_config(&self, flag: Option<&str>) -> Result<PaperConfig> {
        let name = match flag {
            Some(name) => name.to_string(),
            None => self.current_config_name()?,
        };
        self.paper_config(&name)
    }

    pub fn list_config_names(&self) -> Result<Vec<String>> {
        let root = self.paper_configs_root();
        if !root.exists() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&root).with_context(|| format!("failed to read {}", root.display()))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", root.display()))?;
            let file_type = entry
                .file_type()
                .with_context(|| format!("failed to inspect {}", entry.path().display()))?;
            if !file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();

        Ok(names)
    }
}

#[derive(Debug, Clone)]
pub struct PaperConfig {
    name: String,
    path: PathBuf,
    studies: Vec<CaseStudy>,
}

impl PaperConfig {
    pub fn load(name: &str, path: &Path) -> Result<Self> {
        let entries = fs::read_dir(path)
            .with_context(|| format!("failed to read paper config {}", path.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry =
                entry.with_context(|| format!("failed to read entry in {}", path.display()))?;
            let file_path = entry.path();
            if file_path.extension().and_then(|ext| ext.to_str())
                == Some(case_study::CASE_STUDY_EXTENSION)
            {
                files.push(file_path);
            }
        }
        files.sort();

        let mut studies = Vec::new();
        for file in &files {
            studies.push(case_study::load_case_study(file)?);
        }

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            studies,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn studies(&self) -> &[CaseStudy] {
        &self.studies
    }

    pub fn studies_for_project(&self, project: &str) -> Vec<&CaseStudy> {
        self.studies
            .iter()
            .filter(|study| study.project == project)
            .collect()
    }

    pub fn next_index_for(&self, project: &str) -> u32 {
        self.studies_for_project(project)
            .iter()
            .map(|study| study.index + 1)
            .max()
            .unwrap_or(0)
    }

    pub fn has_study(&self, project: &str, index: u32) -> bool {
        self.studies
            .iter()
            .any(|study| study.project == project && study.index == index)
    }

    pub fn find_study(&self, project: &str, index: Option<u32>) -> Result<&CaseStudy> {
        let candidates = self.studies_for_project(project);
        match index {
            Some(index) => candidates
                .into_iter()
                .find(|study| study.index == index)
                .with_context(|| {
                    format!(
                        "no case study {project}_{index} in paper config '{}'",
                        self.name
                    )
                }),
            None => match candidates.as_slice() {
                [] => bail!(
                    "no case study for project '{project}' in paper config '{}'",
                    self.name
                ),
                [only] => Ok(*only),
                many => bail!(
                    "project '{project}' has {} case studies in '{}', pass --index to pick one",
                    many.len(),
                    self.name
                ),
            },
        }
    }

    pub fn study_path(&self, study: &CaseStudy) -> PathBuf {
        self.path.join(study.file_name())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use crate::case_study::store_case_study;

    use super::*;

    fn workspace(dir: &TempDir) -> Workspace {
        Workspace::new(dir.path(), None, None)
    }

    fn seeded_config(dir: &TempDir, name: &str, studies: &[(&str, u32)]) -> PathBuf {
        let path = workspace(dir).config_path(name);
        fs::create_dir_all(&path).unwrap();
        for &(project, index) in studies {
            store_case_study(&CaseStudy::new(project, index), &path).unwrap();
        }
        path
    }

    #[test]
    fn missing_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir);

        let settings = workspace.load_settings().unwrap();
        assert_eq!(settings.settings_version, SETTINGS_VERSION);
        assert!(settings.current_config.is_none());
    }

    #[test]
    fn settings_round_trip_through_the_workspace() {
        let dir = TempDir::new().unwrap();
        let workspace = workspace(&dir);

        let mut settings = Settings::default();
        settings.current_config = Some("icse-25".to_string());
        workspace.store_settings(&settings).unwrap();

        let loaded = workspace.load_settings().unwrap();
        assert_eq!(loaded.current_config.as_deref(), Some("icse-25"));
    }

    #[test]
    fn loading_collects_case_study_files_only() {
        let dir = TempDir::new().unwrap();
        let path = seeded_config(&dir, "icse-25", &[("gzip", 0), ("xz", 0)]);
        fs::write(path.join("notes.md"), b"scratch").unwrap();

        let config = workspace(&dir).paper_config("icse-25").unwrap();
        assert_eq!(config.studies().len(), 2);
        assert_eq!(config.studies()[0].project, "gzip");
        assert_eq!(config.studies()[1].project, "xz");
    }

    #[test]
    fn next_index_skips_past_existing_studies() {
        let dir = TempDir::new().unwrap();
        seeded_config(&dir, "icse-25", &[("gzip", 0), ("gzip", 2)]);

        let config = workspace(&dir).paper_config("icse-25").unwrap();
        assert_eq!(config.next_index_for("gzip"), 3);
        assert_eq!(config.next_index_for("xz"), 0);
        assert!(config.has_study("gzip", 2));
        assert!(!config.has_study("gzip", 1));
    }

    #[test]
    fn find_study_requires_index_only_when_ambiguous() {
        let dir = TempDir::new().unwrap();
        seeded_config(&dir, "icse-25", &[("gzip", 0), ("gzip", 1), ("xz", 0)]);
        let config = workspace(&dir).paper_config("icse-25").unwrap();

        assert_eq!(config.find_study("xz", None).unwrap().index, 0);
        assert_eq!(config.find_study("gzip", Some(1)).unwrap().index, 1);

        let ambiguous = config.find_study("gzip", None).unwrap_err();
        assert!(ambiguous.to_string().contains("--index"));

        let absent = config.find_study("gzip", Some(7)).unwrap_err();
        assert!(absent.to_string().contains("gzip_7"));
    }

    #[test]
    fn resolve_config_prefers_the_explicit_flag() {
        let dir = TempDir::new().unwrap();
        seeded_config(&dir, "icse-25", &[("gzip", 0)]);
        seeded_config(&dir, "fse-26", &[("xz", 0)]);
        let workspace = workspace(&dir);

        let mut settings = Settings::default();
        settings.current_config = Some("icse-25".to_string());
        workspace.store_settings(&settings).unwrap();

        assert_eq!(workspace.resolve_config(None).unwrap().name(), "icse-25");
        assert_eq!(
            workspace.resolve_config(Some("fse-26")).unwrap().name(),
            "fse-26"
        );

        let names = workspace.list_config_names().unwrap();
        assert_eq!(names, vec!["fse-26".to_string(), "icse-25".to_string()]);
    }

    #[test]
    fn unselected_workspace_reports_a_clear_error() {
        let dir = TempDir::new().unwrap();
        let error = workspace(&dir).resolve_config(None).unwrap_err();
        assert!(error.to_string().contains("config select"));
    }
}
