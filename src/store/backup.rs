//! Backup snapshots of the lexicon.
//!
//! Every mutation writes a pre-image (`..._v{N}_{ts}.json`, the state before
//! the write) and a post-image (`..._v{N+1}_{ts}_postsave.json`, the state
//! after it). Backups are never rewritten or pruned.

use super::Lexicon;
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

pub const BACKUP_PREFIX: &str = "dictionary_es_qu_";

/// `metadata` block of a backup file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub reason: String,
    pub created_at: String,
    pub source: String,
    pub version: u64,
    pub entries: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Map<String, Value>>,
}

/// Full backup file: metadata plus the lexicon at snapshot time.
#[derive(Debug, Clone, Serialize)]
pub struct Backup<'a> {
    pub metadata: BackupMetadata,
    pub dictionary: &'a Lexicon,
}

/// A backup file as listed for operators.
#[derive(Debug, Clone, Serialize)]
pub struct BackupSummary {
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    pub metadata: Option<BackupMetadata>,
}

/// Deterministic file name for a backup of `version` taken at `at`.
pub fn file_name(version: u64, at: DateTime<Utc>, postsave: bool) -> String {
    let ts = at.format("%Y%m%d_%H%M%S");
    if postsave {
        format!("{BACKUP_PREFIX}v{version}_{ts}_postsave.json")
    } else {
        format!("{BACKUP_PREFIX}v{version}_{ts}.json")
    }
}

/// Reject names that could escape the backup directory.
pub fn validate_file_name(name: &str) -> StoreResult<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(StoreError::Validation("backup file is required".to_string()));
    }
    let escapes = name.contains('/') || name.contains('\\') || name.contains("..");
    if escapes || !name.ends_with(".json") {
        return Err(StoreError::NotFound(format!("backup {name}")));
    }
    Ok(name)
}

/// Pull the `dictionary` mapping out of a parsed backup payload.
///
/// Rejects payloads whose dictionary is missing, not an object, or holds
/// non-string values, before anything is mutated.
pub fn extract_dictionary(file: &str, payload: Value) -> StoreResult<Lexicon> {
    let corrupt = |reason: &str| StoreError::CorruptBackup {
        file: file.to_string(),
        reason: reason.to_string(),
    };

    let Value::Object(mut payload) = payload else {
        return Err(corrupt("payload is not an object"));
    };
    let Some(Value::Object(dictionary)) = payload.remove("dictionary") else {
        return Err(corrupt("dictionary is missing or not a mapping"));
    };

    dictionary
        .into_iter()
        .map(|(spanish, kichwa)| match kichwa {
            Value::String(kichwa) => Ok((spanish, kichwa)),
            _ => Err(corrupt(&format!("value for '{spanish}' is not a string"))),
        })
        .collect()
}

/// Whether a directory entry looks like a backup file.
pub fn is_backup_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
