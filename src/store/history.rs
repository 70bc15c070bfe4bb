//! Append-only audit log of lexicon changes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of logical change recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Add,
    Overwrite,
    Update,
    Rename,
    Delete,
    BulkAdd,
    BulkUpdate,
    Restore,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Add => "add",
            Action::Overwrite => "overwrite",
            Action::Update => "update",
            Action::Rename => "rename",
            Action::Delete => "delete",
            Action::BulkAdd => "bulk-add",
            Action::BulkUpdate => "bulk-update",
            Action::Restore => "restore",
        };
        f.write_str(name)
    }
}

/// One record of `history.json`.
///
/// The timestamp is filled in by the store when the entry is appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub action: Action,
    pub spanish_before: Option<String>,
    pub spanish_after: Option<String>,
    pub kichwa_before: Option<String>,
    pub kichwa_after: Option<String>,
    #[serde(default)]
    pub info: Map<String, Value>,
}

impl HistoryEntry {
    pub fn new(action: Action) -> Self {
        Self {
            timestamp: String::new(),
            action,
            spanish_before: None,
            spanish_after: None,
            kichwa_before: None,
            kichwa_after: None,
            info: Map::new(),
        }
    }

    pub fn spanish(mut self, before: Option<&str>, after: Option<&str>) -> Self {
        self.spanish_before = before.map(str::to_string);
        self.spanish_after = after.map(str::to_string);
        self
    }

    pub fn kichwa(mut self, before: Option<&str>, after: Option<&str>) -> Self {
        self.kichwa_before = before.map(str::to_string);
        self.kichwa_after = after.map(str::to_string);
        self
    }

    pub fn with_info(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.info.insert(key.to_string(), value.into());
        self
    }
}

/// The last `limit` entries, oldest first.
pub fn tail(history: &[HistoryEntry], limit: usize) -> &[HistoryEntry] {
    &history[history.len().saturating_sub(limit)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_names() {
        assert_eq!(serde_json::to_string(&Action::BulkAdd).unwrap(), "\"bulk-add\"");
        assert_eq!(serde_json::to_string(&Action::Overwrite).unwrap(), "\"overwrite\"");
        let parsed: Action = serde_json::from_str("\"bulk-update\"").unwrap();
        assert_eq!(parsed, Action::BulkUpdate);
        assert_eq!(Action::BulkUpdate.to_string(), "bulk-update");
    }

    #[test]
    fn test_entry_builder() {
        let entry = HistoryEntry::new(Action::Rename)
            .spanish(Some("casa"), Some("hogar"))
            .kichwa(Some("wasi"), Some("wasi"))
            .with_info("source", "test");

        assert_eq!(entry.spanish_before.as_deref(), Some("casa"));
        assert_eq!(entry.spanish_after.as_deref(), Some("hogar"));
        assert_eq!(entry.info["source"], "test");
    }

    #[test]
    fn test_entry_serializes_nulls_and_empty_info() {
        let json = serde_json::to_value(HistoryEntry::new(Action::Restore)).unwrap();
        assert!(json["spanish_before"].is_null());
        assert_eq!(json["info"], serde_json::json!({}));
        assert_eq!(json["action"], "restore");
    }

    #[test]
    fn test_entry_without_info_deserializes() {
        let entry: HistoryEntry = serde_json::from_str(
            r#"{"timestamp":"2024-01-01T00:00:00Z","action":"delete",
                "spanish_before":"casa","spanish_after":null,
                "kichwa_before":"wasi","kichwa_after":null}"#,
        )
        .unwrap();
        assert_eq!(entry.action, Action::Delete);
        assert!(entry.info.is_empty());
    }

    #[test]
    fn test_tail() {
        let entries: Vec<_> = [Action::Add, Action::Update, Action::Delete]
            .into_iter()
            .map(HistoryEntry::new)
            .collect();
        assert_eq!(tail(&entries, 2)[0].action, Action::Update);
        assert_eq!(tail(&entries, 10).len(), 3);
        assert!(tail(&entries, 0).is_empty());
    }
}
