//! JSON file helpers with temp-file + atomic rename writes.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

/// Read and parse a JSON file. A missing file is `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<Option<T>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StoreError::storage(path, e)),
    };
    serde_json::from_reader(BufReader::new(file))
        .map(Some)
        .map_err(|e| StoreError::storage(path, e))
}

/// Read a JSON file, falling back to `default` when it is missing or unreadable.
///
/// Only for read paths where a stale default is recoverable; mutation paths
/// use [`read_json`] and fail instead.
pub fn read_json_or<T: DeserializeOwned>(path: &Path, default: T) -> T {
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => default,
        Err(e) => {
            warn!("Falling back to default for {}: {}", path.display(), e);
            default
        }
    }
}

/// Serialize `value` as pretty JSON into a temp file next to `path`, then
/// atomically rename it over `path`. Readers never observe a partial file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| StoreError::storage(parent, e))?;

    let temp_file = NamedTempFile::new_in(parent).map_err(|e| StoreError::storage(parent, e))?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| StoreError::storage(path, e))?;
        writer.flush().map_err(|e| StoreError::storage(path, e))?;
    }
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| StoreError::storage(path, e))?;
    temp_file
        .persist(path)
        .map_err(|e| StoreError::storage(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn test_read_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let value: Option<BTreeMap<String, String>> =
            read_json(&dir.path().join("missing.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("lexicon.json");
        let mut lexicon = BTreeMap::new();
        lexicon.insert("niño".to_string(), "wawa".to_string());

        write_json_atomic(&path, &lexicon).unwrap();
        let read: BTreeMap<String, String> = read_json(&path).unwrap().unwrap();
        assert_eq!(read, lexicon);

        // non-ASCII stays readable on disk
        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("niño"));
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meta.json");
        write_json_atomic(&path, &serde_json::json!({"current_version": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"current_version": 2})).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_read_corrupt_file_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "[{ not json").unwrap();

        let result: StoreResult<Option<Vec<serde_json::Value>>> = read_json(&path);
        assert!(matches!(result, Err(StoreError::Storage { .. })));
    }

    #[test]
    fn test_read_or_falls_back_on_corruption() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dictionary.json");
        fs::write(&path, "garbage").unwrap();

        let value = read_json_or(&path, BTreeMap::<String, String>::new());
        assert!(value.is_empty());
    }
}
