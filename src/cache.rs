use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::util;

pub const CACHE_SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn fingerprint_files(paths: &[PathBuf]) -> Result<String> {
    let mut sorted: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for path in sorted {
        match fs::metadata(path) {
            Ok(metadata) => {
                let modified = metadata
                    .modified()
                    .ok()
                    .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                    .map(|duration| duration.as_nanos())
                    .unwrap_or(0);
                hasher.update(format!(
                    "{}\n{}\n{}\n",
                    path.display(),
                    modified,
                    metadata.len()
                ));
            }
            Err(error) if error.kind() == ErrorKind::NotFound => {
                hasher.update(format!("{}\nmissing\n", path.display()));
            }
            Err(error) => {
                return Err(error).with_context(|| format!("failed to stat {}", path.display()));
            }
        }
    }

    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug)]
pub struct DataCache {
    root: PathBuf,
    refresh: bool,
}

impl DataCache {
    pub fn new(root: &Path, refresh: bool) -> Self {
        Self {
            root: root.to_path_buf(),
            refresh,
        }
    }

    pub fn get_or_build<F>(&self, key: &str, inputs: &[PathBuf], build: F) -> Result<TabularData>
    where
        F: FnOnce() -> Result<TabularData>,
    {
        let entry = self.entry_path(key);
        let fingerprint = fingerprint_files(inputs)?;

        if !self.refresh {
            match load_entry(&entry, &fingerprint) {
                Ok(Some(data)) => {
                    debug!(key, "serving table from cache");
                    return Ok(data);
                }
                Ok(None) => {}
                Err(error) => {
                    debug!(key, error = %error, "discarding unreadable cache entry");
                }
            }
        }

        info!(key, "building table");
        let data = build()?;
        store_entry(&entry, &fingerprint, &data)?;

        Ok(data)
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{safe}.sqlite"))
    }
}

fn load_entry(path: &Path, fingerprint: &str) -> Result<Option<TabularData>> {
    if !path.exists() {
        return Ok(None);
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open cache entry {}", path.display()))?;

    if metadata_value(&conn, "cache_schema_version")?.as_deref() != Some(CACHE_SCHEMA_VERSION) {
        return Ok(None);
    }
    if metadata_value(&conn, "fingerprint")?.as_deref() != Some(fingerprint) {
        return Ok(None);
    }
    let Some(columns_json) = metadata_value(&conn, "columns")? else {
        return Ok(None);
    };
    let columns: Vec<String> =
        serde_json::from_str(&columns_json).context("failed to decode cached column list")?;

    let mut statement = conn
        .prepare("SELECT cells FROM rows ORDER BY row_idx")
        .context("failed to prepare cache row query")?;
    let cells = statement
        .query_map([], |row| row.get::<_, String>(0))
        .context("failed to query cache rows")?;

    let mut rows = Vec::new();
    for cell in cells {
        let json = cell.context("failed to read cache row")?;
        let row: Vec<String> =
            serde_json::from_str(&json).context("failed to decode cached row")?;
        rows.push(row);
    }

    Ok(Some(TabularData { columns, rows }))
}

fn metadata_value(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM metadata WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to read cache metadata key '{key}'"))
}

fn store_entry(path: &Path, fingerprint: &str, data: &TabularData) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            util::ensure_directory(parent)?;
        }
    }

    let temp = util::temp_sibling(path);
    if temp.exists() {
        fs::remove_file(&temp)
            .with_context(|| format!("failed to remove {}", temp.display()))?;
    }

    let mut conn = Connection::open(&temp)
        .with_context(|| format!("failed to create cache entry {}", temp.display()))?;
    conn.execute_batch(
        "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
         CREATE TABLE rows (row_idx INTEGER PRIMARY KEY, cells TEXT NOT NULL);",
    )
    .context("failed to create cache schema")?;

    let columns = serde_json::to_string(&data.columns).context("failed to encode column list")?;

    let tx = conn
        .transaction()
        .context("failed to begin cache transaction")?;
    {
        let mut insert_metadata = tx
            .prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")
            .context("failed to prepare metadata insert")?;
        insert_metadata.execute(params!["cache_schema_version", CACHE_SCHEMA_VERSION])?;
        insert_metadata.execute(params!["fingerprint", fingerprint])?;
        insert_metadata.execute(params!["built_at", util::now_utc_string()])?;
        insert_metadata.execute(params!["columns", columns])?;

        let mut insert_row = tx
            .prepare("INSERT INTO rows (row_idx, cells) VALUES (?1, ?2)")
            .context("failed to prepare row insert")?;
        for (index, row) in data.rows.iter().enumerate() {
            let cells = serde_json::to_string(row).context("failed to encode row")?;
            insert_row.execute(params![index as i64, cells])?;
        }
    }
    tx.commit().context("failed to commit cache entry")?;
    drop(conn);

    fs::rename(&temp, path)
        .with_context(|| format!("failed to move cache entry into place: {}", path.display()))?;

    Ok(())
}
