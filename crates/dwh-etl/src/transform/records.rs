//! Staging records as they appear in the raw JSON files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{EtlError, Result};

/// One line of the event log.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagingEvent {
    pub artist: Option<String>,
    pub auth: Option<String>,
    pub first_name: Option<String>,
    pub gender: Option<String>,
    pub item_in_session: Option<i64>,
    pub last_name: Option<String>,
    pub length: Option<f64>,
    pub level: Option<String>,
    pub location: Option<String>,
    pub method: Option<String>,
    pub page: Option<String>,
    pub registration: Option<f64>,
    pub session_id: Option<i64>,
    pub song: Option<String>,
    pub status: Option<i64>,
    /// Epoch milliseconds.
    pub ts: i64,
    pub user_agent: Option<String>,
    /// Logged out sessions carry `""`.
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
}

/// One song metadata record.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StagingSong {
    pub num_songs: Option<i64>,
    pub artist_id: Option<String>,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
    pub artist_location: Option<String>,
    pub artist_name: Option<String>,
    pub song_id: Option<String>,
    pub title: Option<String>,
    pub duration: Option<f64>,
    pub year: Option<i64>,
}

/// Accepts a number, a numeric string, an empty string or null.
fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Int(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid userId '{}'", s))),
    }
}

/// Read newline-delimited JSON records from a file, or from every `.json`
/// file below a directory.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut files = Vec::new();
    collect_json_files(path, &mut files)?;
    files.sort();

    let mut records = Vec::new();
    for file in &files {
        let content = fs::read_to_string(file)?;
        let before = records.len();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|source| EtlError::InvalidRecord {
                path: file.display().to_string(),
                line: index + 1,
                source,
            })?;
            records.push(record);
        }
        debug!("{}: {} records", file.display(), records.len() - before);
    }
    Ok(records)
}

fn collect_json_files(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !path.is_dir() {
        files.push(path.to_path_buf());
        return Ok(());
    }
    for entry in fs::read_dir(path)? {
        let entry_path = entry?.path();
        if entry_path.is_dir() {
            collect_json_files(&entry_path, files)?;
        } else if entry_path.extension().is_some_and(|ext| ext == "json") {
            files.push(entry_path);
        }
    }
    Ok(())
}
