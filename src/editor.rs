//! Lexicon editing operations.
//!
//! The editor is the mutation initiator: it validates input, computes the new
//! lexicon under the store's write lock, commits it and appends exactly one
//! history entry per logical change.

use crate::error::{StoreError, StoreResult};
use crate::store::history::{Action, HistoryEntry};
use crate::store::{Commit, Lexicon, LexiconStore};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-row outcome counts of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub added: usize,
    pub updated: usize,
    pub skipped_invalid: usize,
    pub skipped_duplicates: usize,
    pub total_rows: usize,
}

/// Result of a single-entry edit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditOutcome {
    pub spanish: String,
    pub kichwa: String,
    pub action: Action,
    pub version: u64,
}

/// Result of a bulk import. `version` is `None` when nothing changed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    #[serde(flatten)]
    pub stats: ImportStats,
    pub version: Option<u64>,
}

/// Result of a restore.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreOutcome {
    pub restored_from: String,
    pub entries: usize,
    pub version: u64,
}

#[derive(Clone)]
pub struct LexiconEditor {
    store: Arc<LexiconStore>,
}

/// Spanish keys are case-insensitive headwords.
fn spanish_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn info_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl LexiconEditor {
    pub fn new(store: Arc<LexiconStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<LexiconStore> {
        &self.store
    }

    /// Insert an entry or overwrite the translation of an existing one.
    pub fn add(&self, spanish: &str, kichwa: &str) -> StoreResult<EditOutcome> {
        let spanish = spanish_key(spanish);
        let kichwa = kichwa.trim();
        if spanish.is_empty() || kichwa.is_empty() {
            return Err(StoreError::Validation(
                "spanish and kichwa are required".to_string(),
            ));
        }

        let mut guard = self.store.lock();
        let mut lexicon = guard.current()?;
        let before = lexicon.insert(spanish.clone(), kichwa.to_string());

        let commit = guard.mutate(&lexicon, "add", info_map(json!({ "spanish": spanish })))?;

        let action = if before.is_some() {
            Action::Overwrite
        } else {
            Action::Add
        };
        let spanish_before = before.is_some().then_some(spanish.as_str());
        guard.append_history([HistoryEntry::new(action)
            .spanish(spanish_before, Some(spanish.as_str()))
            .kichwa(before.as_deref(), Some(kichwa))])?;

        info!("{} '{}' -> '{}'", action, spanish, kichwa);
        Ok(EditOutcome {
            spanish,
            kichwa: kichwa.to_string(),
            action,
            version: commit.version,
        })
    }

    /// Change the translation of an existing entry, optionally renaming it.
    ///
    /// Renaming onto a key that already exists replaces that entry.
    pub fn update(
        &self,
        spanish: &str,
        kichwa: &str,
        spanish_new: Option<&str>,
    ) -> StoreResult<EditOutcome> {
        let spanish = spanish_key(spanish);
        let kichwa = kichwa.trim();
        let spanish_new = spanish_new.map(spanish_key).filter(|s| !s.is_empty());
        if spanish.is_empty() || kichwa.is_empty() {
            return Err(StoreError::Validation(
                "spanish and kichwa are required".to_string(),
            ));
        }

        let mut guard = self.store.lock();
        let mut lexicon = guard.current()?;
        let Some(before) = lexicon.remove(&spanish) else {
            return Err(StoreError::NotFound(format!("word '{spanish}'")));
        };

        let (action, spanish_after) = match spanish_new.as_deref() {
            Some(renamed) if renamed != spanish => (Action::Rename, renamed.to_string()),
            _ => (Action::Update, spanish.clone()),
        };
        lexicon.insert(spanish_after.clone(), kichwa.to_string());

        let commit = guard.mutate(
            &lexicon,
            "update",
            info_map(json!({ "spanish": spanish, "spanish_new": spanish_new })),
        )?;
        guard.append_history([HistoryEntry::new(action)
            .spanish(Some(spanish.as_str()), Some(spanish_after.as_str()))
            .kichwa(Some(before.as_str()), Some(kichwa))])?;

        info!("{} '{}' -> '{}' = '{}'", action, spanish, spanish_after, kichwa);
        Ok(EditOutcome {
            spanish: spanish_after,
            kichwa: kichwa.to_string(),
            action,
            version: commit.version,
        })
    }

    /// Remove an entry. A missing key mutates nothing.
    pub fn delete(&self, spanish: &str) -> StoreResult<EditOutcome> {
        let spanish = spanish_key(spanish);
        if spanish.is_empty() {
            return Err(StoreError::Validation("spanish is required".to_string()));
        }

        let mut guard = self.store.lock();
        let mut lexicon = guard.current()?;
        let Some(before) = lexicon.remove(&spanish) else {
            return Err(StoreError::NotFound(format!("word '{spanish}'")));
        };

        let commit = guard.mutate(&lexicon, "delete", info_map(json!({ "spanish": spanish })))?;
        guard.append_history([HistoryEntry::new(Action::Delete)
            .spanish(Some(spanish.as_str()), None)
            .kichwa(Some(before.as_str()), None)])?;

        info!("delete '{}'", spanish);
        Ok(EditOutcome {
            spanish,
            kichwa: before,
            action: Action::Delete,
            version: commit.version,
        })
    }

    /// Merge `(spanish, kichwa)` rows into the lexicon in one commit.
    ///
    /// Rows with fewer than two cells or a blank cell are invalid. A pair
    /// already seen in this batch, or identical to the stored entry, is a
    /// duplicate. Each added or updated key gets its own history entry. A
    /// batch that changes nothing does not create a version.
    pub fn import_rows<I, R>(&self, rows: I) -> StoreResult<ImportOutcome>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[String]>,
    {
        let mut guard = self.store.lock();
        let mut lexicon = guard.current()?;
        let (stats, entries) = merge_rows(&mut lexicon, rows);

        if entries.is_empty() {
            info!("Import changed nothing ({} rows)", stats.total_rows);
            return Ok(ImportOutcome {
                stats,
                version: None,
            });
        }

        let commit: Commit =
            guard.mutate(&lexicon, "import-csv", info_map(json!({ "stats": stats })))?;
        guard.append_history(entries)?;

        info!(
            "Imported {} rows: {} added, {} updated, {} invalid, {} duplicates",
            stats.total_rows,
            stats.added,
            stats.updated,
            stats.skipped_invalid,
            stats.skipped_duplicates
        );
        Ok(ImportOutcome {
            stats,
            version: Some(commit.version),
        })
    }

    /// Decode and parse CSV bytes, then [`import_rows`](Self::import_rows).
    pub fn import_csv(&self, bytes: &[u8]) -> StoreResult<ImportOutcome> {
        let rows = crate::csv_io::parse_rows(bytes)?;
        self.import_rows(rows)
    }

    /// Replace the lexicon with a backup and record the restore.
    pub fn restore(&self, file: &str) -> StoreResult<RestoreOutcome> {
        let file = file.trim();
        let mut guard = self.store.lock();
        let commit = guard.restore(file).inspect_err(|e| {
            warn!("Restore from '{}' rejected: {}", file, e);
        })?;
        guard.append_history([HistoryEntry::new(Action::Restore).with_info("file", file)])?;

        Ok(RestoreOutcome {
            restored_from: file.to_string(),
            entries: commit.entry_count,
            version: commit.version,
        })
    }

    /// The lexicon as `spanish,kichwa` CSV rows sorted by key.
    pub fn export_csv(&self) -> StoreResult<String> {
        crate::csv_io::write_rows(&self.store.snapshot())
    }
}

/// Apply import rows to `lexicon`, returning counts and history entries.
fn merge_rows<I, R>(lexicon: &mut Lexicon, rows: I) -> (ImportStats, Vec<HistoryEntry>)
where
    I: IntoIterator<Item = R>,
    R: AsRef<[String]>,
{
    let mut stats = ImportStats::default();
    let mut entries = Vec::new();
    let mut seen_in_batch = HashSet::new();

    for row in rows {
        stats.total_rows += 1;
        let row = row.as_ref();
        if row.len() < 2 {
            stats.skipped_invalid += 1;
            continue;
        }

        let spanish = spanish_key(&row[0]);
        let kichwa = row[1].trim().to_string();
        if spanish.is_empty() || kichwa.is_empty() {
            stats.skipped_invalid += 1;
            continue;
        }

        if !seen_in_batch.insert((spanish.clone(), kichwa.clone())) {
            stats.skipped_duplicates += 1;
            continue;
        }

        match lexicon.get(&spanish) {
            Some(existing) if *existing == kichwa => stats.skipped_duplicates += 1,
            Some(existing) => {
                entries.push(
                    HistoryEntry::new(Action::BulkUpdate)
                        .spanish(Some(spanish.as_str()), Some(spanish.as_str()))
                        .kichwa(Some(existing.as_str()), Some(kichwa.as_str()))
                        .with_info("source", "import-csv"),
                );
                stats.updated += 1;
                lexicon.insert(spanish, kichwa);
            }
            None => {
                entries.push(
                    HistoryEntry::new(Action::BulkAdd)
                        .spanish(None, Some(spanish.as_str()))
                        .kichwa(None, Some(kichwa.as_str()))
                        .with_info("source", "import-csv"),
                );
                stats.added += 1;
                lexicon.insert(spanish, kichwa);
            }
        }
    }

    (stats, entries)
}
