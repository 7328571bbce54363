use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create directory: {}", path.display()))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw =
        fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            ensure_directory(parent)?;
        }
    }

    let mut data = serde_json::to_vec_pretty(value)
        .with_context(|| format!("failed to serialize json: {}", path.display()))?;
    data.push(b'\n');

    let temp_path = temp_sibling(path);
    fs::write(&temp_path, &data)
        .with_context(|| format!("failed to write {}", temp_path.display()))?;
    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to move {} into place at {}",
            temp_path.display(),
            path.display()
        )
    })?;

    Ok(())
}

pub fn temp_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("entry");
    path.with_file_name(format!("{}.tmp-{}", file_name, std::process::id()))
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: u32,
    }

    #[test]
    fn json_write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sample.json");
        let value = Sample {
            name: "gzip".to_string(),
            count: 3,
        };

        write_json_atomic(&path, &value).unwrap();
        let loaded: Sample = read_json(&path).unwrap();

        assert_eq!(loaded, value);
    }

    #[test]
    fn atomic_write_leaves_no_temp_file_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");
        let value = Sample {
            name: "grep".to_string(),
            count: 1,
        };

        write_json_atomic(&path, &value).unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sample.json".to_string()]);
    }

    #[test]
    fn written_json_ends_with_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sample.json");

        write_json_atomic(
            &path,
            &Sample {
                name: "xz".to_string(),
                count: 0,
            },
        )
        .unwrap();

        let raw = fs::read(&path).unwrap();
        assert_eq!(raw.last(), Some(&b'\n'));
    }
}
