//! # JSON Bookkeeping
//!
//! The bots keep their state in small JSON files that are reloaded on every
//! read and rewritten wholesale on every write:
//!
//! - the processed-tweet set (array of tweet IDs), which makes the poll loops
//!   idempotent across restarts
//! - the reply store (conversation ID -> audience replies), which the Emperor
//!   Agent reads when judging a duel

use crate::error::StoreError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One audience reply, trimmed to the fields the judge needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permanent_url: Option<String>,
    pub text: String,
    pub username: String,
    #[serde(default)]
    pub is_reply: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
}

/// Reads a JSON file, falling back to `T::default()` when the file is
/// missing or cannot be parsed.
fn read_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return T::default(),
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!("Ignoring malformed {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Pretty-prints `value` to a sibling temp file and renames it over `path`.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let display = path.display().to_string();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }

    let body = serde_json::to_string_pretty(value).map_err(|source| StoreError::Encode {
        path: display.clone(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, body).map_err(|source| StoreError::Io {
        path: tmp.display().to_string(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: display,
        source,
    })
}

/// JSON-backed set of tweet IDs that have already been handled.
#[derive(Debug, Clone)]
pub struct ProcessedTweetStore {
    path: PathBuf,
}

impl ProcessedTweetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> BTreeSet<String> {
        let ids: Vec<String> = read_or_default(&self.path);
        ids.into_iter().collect()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.load().contains(id)
    }

    /// Unions `new_ids` with whatever is on disk right now and writes the
    /// result back. IDs already on disk are never dropped.
    pub fn merge_save<I, S>(&self, new_ids: I) -> Result<BTreeSet<String>, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut all = self.load();
        let before = all.len();
        all.extend(new_ids.into_iter().map(Into::into));

        write_json(&self.path, &all)?;
        debug!(
            "Saved {} new tweet IDs to {} ({} total)",
            all.len() - before,
            self.path.display(),
            all.len()
        );
        Ok(all)
    }
}

/// JSON-backed map from conversation ID to the replies collected for it.
#[derive(Debug, Clone)]
pub struct ReplyStore {
    path: PathBuf,
}

impl ReplyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> BTreeMap<String, Vec<ReplyRecord>> {
        read_or_default(&self.path)
    }

    pub fn thread(&self, conversation_id: &str) -> Vec<ReplyRecord> {
        self.load().remove(conversation_id).unwrap_or_default()
    }

    /// Overwrites the replies stored for one conversation, leaving the others
    /// untouched.
    pub fn replace_thread(
        &self,
        conversation_id: &str,
        replies: Vec<ReplyRecord>,
    ) -> Result<(), StoreError> {
        let mut all = self.load();
        all.insert(conversation_id.to_string(), replies);
        write_json(&self.path, &all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(user: &str, text: &str) -> ReplyRecord {
        ReplyRecord {
            conversation_id: Some("100".into()),
            likes: Some(2),
            name: None,
            permanent_url: None,
            text: text.into(),
            username: user.into(),
            is_reply: true,
            timestamp: Some(1_700_000_000),
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProcessedTweetStore::new(dir.path().join("nope.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_malformed_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ProcessedTweetStore::new(&path).load().is_empty());
    }

    #[test]
    fn test_merge_keeps_ids_written_by_someone_else() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");
        let store = ProcessedTweetStore::new(&path);

        store.merge_save(["1", "2"]).unwrap();
        // Another writer replaces the file behind our back.
        std::fs::write(&path, r#"["2", "3"]"#).unwrap();
        let merged = store.merge_save(["4"]).unwrap();

        let expected: BTreeSet<String> = ["2", "3", "4"].iter().map(|s| s.to_string()).collect();
        assert_eq!(merged, expected);
        assert!(store.contains("3"));
    }

    #[test]
    fn test_merge_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProcessedTweetStore::new(dir.path().join("data/nested/processed.json"));
        store.merge_save(["9"]).unwrap();
        assert!(store.contains("9"));
    }

    #[test]
    fn test_reply_store_replaces_single_thread() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReplyStore::new(dir.path().join("replies.json"));

        store
            .replace_thread("100", vec![reply("alice", "go bob")])
            .unwrap();
        store
            .replace_thread("200", vec![reply("carol", "meh")])
            .unwrap();
        store
            .replace_thread("100", vec![reply("dave", "bob wins"), reply("erin", "no")])
            .unwrap();

        assert_eq!(store.thread("100").len(), 2);
        assert_eq!(store.thread("200")[0].username, "carol");
        assert!(store.thread("300").is_empty());
    }

    #[test]
    fn test_reply_record_uses_camel_case_keys() {
        let json = serde_json::to_value(reply("alice", "hi")).unwrap();
        assert_eq!(json["conversationId"], "100");
        assert_eq!(json["isReply"], true);
        assert!(json.get("permanentUrl").is_none());
    }
}
