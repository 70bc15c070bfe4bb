//! File-backed, versioned lexicon store.
//!
//! The store owns four pieces of persisted state under one data directory:
//!
//! - `dictionary_es_qu.json`: the live lexicon, `{spanish: kichwa}`
//! - `meta.json`: `current_version`, `last_updated`, `entry_count`
//! - `history.json`: append-only audit log, oldest first
//! - `backups/`: one immutable snapshot per pre- and post-image
//!
//! Every file is written through a temp file and an atomic rename, so
//! lock-free readers see either the previous or the new committed state.
//!
//! # Mutation
//!
//! All mutations go through a [`StoreGuard`] obtained from
//! [`LexiconStore::lock`]. The guard holds the process-wide write lock and
//! exposes every sub-operation as a method, so a composite routine (an import
//! that records one history entry per row, a restore that performs a full
//! mutate) runs under a single acquisition and can never deadlock on itself.
//!
//! A mutate walks `Locked -> BackupPre -> Write -> MetaUpdate -> BackupPost`
//! and any I/O failure along the way, backups included, fails the request.

pub mod backup;
mod fs;
pub mod history;

use crate::error::{StoreError, StoreResult};
use backup::{Backup, BackupMetadata, BackupSummary};
use chrono::{SecondsFormat, Utc};
use history::HistoryEntry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Spanish headword -> Kichwa translation.
pub type Lexicon = BTreeMap<String, String>;

pub const LEXICON_FILE: &str = "dictionary_es_qu.json";
pub const META_FILE: &str = "meta.json";
pub const HISTORY_FILE: &str = "history.json";
pub const BACKUP_DIR: &str = "backups";

/// Contents of `meta.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub current_version: u64,
    pub last_updated: Option<String>,
    pub entry_count: usize,
}

/// Outcome of a committed mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commit {
    pub version: u64,
    pub entry_count: usize,
    pub pre_backup: String,
    pub post_backup: String,
}

/// UTC timestamp with second precision, e.g. `2024-01-01T12:00:00Z`.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub struct LexiconStore {
    data_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl LexiconStore {
    /// Open (or create) a store rooted at `data_dir`.
    ///
    /// Creates the directory layout, heals `meta.json` and makes sure an
    /// empty history exists.
    pub fn open(data_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let store = Self {
            data_dir: data_dir.into(),
            write_lock: Mutex::new(()),
        };

        let backups = store.backup_dir();
        std::fs::create_dir_all(&backups).map_err(|e| StoreError::storage(&backups, e))?;

        let guard = store.lock();
        let metadata = guard.metadata()?;
        if !guard.store.history_path().exists() {
            fs::write_json_atomic(&guard.store.history_path(), &Vec::<HistoryEntry>::new())?;
        }
        drop(guard);

        info!(
            "Lexicon store opened at {} (version {}, {} entries)",
            store.data_dir.display(),
            metadata.current_version,
            metadata.entry_count
        );
        Ok(store)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn lexicon_path(&self) -> PathBuf {
        self.data_dir.join(LEXICON_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.data_dir.join(META_FILE)
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join(HISTORY_FILE)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join(BACKUP_DIR)
    }

    /// Lock-free read of the last committed lexicon.
    ///
    /// A missing or unreadable file reads as an empty lexicon.
    pub fn snapshot(&self) -> Lexicon {
        fs::read_json_or(&self.lexicon_path(), Lexicon::new())
    }

    /// Current metadata, healing `meta.json` if fields are missing.
    pub fn metadata(&self) -> StoreResult<Metadata> {
        self.lock().metadata()
    }

    /// Full history, oldest first. Unreadable history reads as empty.
    pub fn history(&self) -> Vec<HistoryEntry> {
        fs::read_json_or(&self.history_path(), Vec::new())
    }

    /// All backup files sorted by name, with size and metadata when readable.
    pub fn list_backups(&self) -> StoreResult<Vec<BackupSummary>> {
        let dir = self.backup_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::storage(&dir, e)),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::storage(&dir, e))?;
            let path = entry.path();
            if !backup::is_backup_file(&path) {
                continue;
            }
            let bytes = entry.metadata().ok().map(|m| m.len());
            let metadata = fs::read_json::<Value>(&path)
                .ok()
                .flatten()
                .and_then(|mut payload| payload.get_mut("metadata").map(Value::take))
                .and_then(|meta| serde_json::from_value(meta).ok());
            summaries.push(BackupSummary {
                file: entry.file_name().to_string_lossy().into_owned(),
                bytes,
                metadata,
            });
        }
        summaries.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(summaries)
    }

    /// Acquire the write lock.
    pub fn lock(&self) -> StoreGuard<'_> {
        // The lock guards no data, so a poisoned lock is still usable.
        let guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        StoreGuard {
            store: self,
            _guard: guard,
        }
    }

    /// Lock, then [`StoreGuard::mutate`].
    pub fn mutate(
        &self,
        lexicon: &Lexicon,
        reason: &str,
        info: Map<String, Value>,
    ) -> StoreResult<Commit> {
        self.lock().mutate(lexicon, reason, info)
    }

    /// Lock, then [`StoreGuard::restore`].
    pub fn restore(&self, file: &str) -> StoreResult<Commit> {
        self.lock().restore(file)
    }
}

/// Exclusive write access to a [`LexiconStore`].
pub struct StoreGuard<'a> {
    store: &'a LexiconStore,
    _guard: MutexGuard<'a, ()>,
}

impl StoreGuard<'_> {
    /// The committed lexicon, failing on an unreadable file so that a
    /// mutation never builds on a silently emptied dictionary.
    pub fn current(&self) -> StoreResult<Lexicon> {
        Ok(fs::read_json(&self.store.lexicon_path())?.unwrap_or_default())
    }

    /// Read `meta.json`, filling in any missing or malformed field.
    ///
    /// Absent fields start at version 0 and the on-disk lexicon size. The
    /// healed file is written back so later reads agree.
    pub fn metadata(&self) -> StoreResult<Metadata> {
        let path = self.store.meta_path();
        let mut raw: Map<String, Value> = fs::read_json_or(&path, Map::new());
        let mut changed = false;

        let current_version = match raw.get("current_version").and_then(Value::as_u64) {
            Some(version) => version,
            None => {
                raw.insert("current_version".to_string(), Value::from(0u64));
                changed = true;
                0
            }
        };

        let last_updated = match raw.get("last_updated") {
            Some(Value::String(at)) => Some(at.clone()),
            Some(Value::Null) => None,
            _ => {
                raw.insert("last_updated".to_string(), Value::Null);
                changed = true;
                None
            }
        };

        let entry_count = match raw.get("entry_count").and_then(Value::as_u64) {
            Some(count) => count as usize,
            None => {
                let count = self.store.snapshot().len();
                raw.insert("entry_count".to_string(), Value::from(count));
                changed = true;
                count
            }
        };

        if changed {
            warn!("Initializing missing metadata fields in {}", path.display());
            fs::write_json_atomic(&path, &raw)?;
        }

        Ok(Metadata {
            current_version,
            last_updated,
            entry_count,
        })
    }

    /// Atomically replace the lexicon and bump the version.
    ///
    /// Writes a pre-image backup of the current state, persists `lexicon`,
    /// updates metadata (`current_version + 1`, `last_updated`, `entry_count`)
    /// and writes a post-image backup tagged `{reason}-postsave` carrying
    /// `info`. History is left to the caller.
    pub fn mutate(
        &mut self,
        lexicon: &Lexicon,
        reason: &str,
        info: Map<String, Value>,
    ) -> StoreResult<Commit> {
        let store = self.store;
        let metadata = self.metadata()?;
        let now = Utc::now();
        let created_at = now.to_rfc3339_opts(SecondsFormat::Secs, true);

        // Best-known pre-image; an unreadable live file is captured as empty.
        let before = store.snapshot();
        let pre_backup = backup::file_name(metadata.current_version, now, false);
        fs::write_json_atomic(
            &store.backup_dir().join(&pre_backup),
            &Backup {
                metadata: BackupMetadata {
                    reason: reason.to_string(),
                    created_at: created_at.clone(),
                    source: "live-dictionary".to_string(),
                    version: metadata.current_version,
                    entries: before.len(),
                    info: None,
                },
                dictionary: &before,
            },
        )?;
        debug!("Wrote pre-image backup {}", pre_backup);

        fs::write_json_atomic(&store.lexicon_path(), lexicon)?;

        let committed = Metadata {
            current_version: metadata.current_version + 1,
            last_updated: Some(created_at.clone()),
            entry_count: lexicon.len(),
        };
        fs::write_json_atomic(&store.meta_path(), &committed)?;

        let post_backup = backup::file_name(committed.current_version, now, true);
        fs::write_json_atomic(
            &store.backup_dir().join(&post_backup),
            &Backup {
                metadata: BackupMetadata {
                    reason: format!("{reason}-postsave"),
                    created_at,
                    source: "new-dictionary".to_string(),
                    version: committed.current_version,
                    entries: lexicon.len(),
                    info: Some(info),
                },
                dictionary: lexicon,
            },
        )?;
        debug!("Wrote post-image backup {}", post_backup);

        info!(
            "Committed lexicon version {} ({}, {} entries)",
            committed.current_version, reason, committed.entry_count
        );

        Ok(Commit {
            version: committed.current_version,
            entry_count: committed.entry_count,
            pre_backup,
            post_backup,
        })
    }

    /// Replace the lexicon with the contents of a backup file.
    ///
    /// The backup is validated before anything is written. Restoring always
    /// produces a new version, never a rewind.
    pub fn restore(&mut self, file: &str) -> StoreResult<Commit> {
        let file = backup::validate_file_name(file)?;
        let path = self.store.backup_dir().join(file);
        let payload: Value = match fs::read_json(&path) {
            Ok(Some(payload)) => payload,
            Ok(None) => return Err(StoreError::NotFound(format!("backup {file}"))),
            // serde_json reports syntax and truncation as these kinds
            Err(StoreError::Storage { source, .. })
                if matches!(
                    source.kind(),
                    std::io::ErrorKind::InvalidData | std::io::ErrorKind::UnexpectedEof
                ) =>
            {
                return Err(StoreError::CorruptBackup {
                    file: file.to_string(),
                    reason: format!("not valid JSON: {source}"),
                });
            }
            Err(e) => return Err(e),
        };
        let lexicon = backup::extract_dictionary(file, payload)?;

        let mut info = Map::new();
        info.insert("file".to_string(), Value::from(file));
        let commit = self.mutate(&lexicon, "restore", info)?;
        info!("Restored {} entries from {}", lexicon.len(), file);
        Ok(commit)
    }

    /// Append entries to `history.json`, stamping each with the current time.
    ///
    /// An unreadable history fails the append instead of being replaced.
    pub fn append_history(
        &mut self,
        entries: impl IntoIterator<Item = HistoryEntry>,
    ) -> StoreResult<usize> {
        let path = self.store.history_path();
        let mut history: Vec<HistoryEntry> = fs::read_json(&path)?.unwrap_or_default();
        let timestamp = now_iso();
        let before = history.len();
        history.extend(entries.into_iter().map(|mut entry| {
            entry.timestamp = timestamp.clone();
            entry
        }));
        let appended = history.len() - before;
        if appended > 0 {
            fs::write_json_atomic(&path, &history)?;
        }
        Ok(appended)
    }
}
