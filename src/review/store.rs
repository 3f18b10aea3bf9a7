use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ── Review state ──

/// Which files of one document have been marked reviewed.
///
/// Absence of a path means "not reviewed"; un-reviewing deletes the key so
/// `false` never reaches storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewState {
    #[serde(default)]
    reviewed: BTreeMap<String, bool>,
}

impl ReviewState {
    pub fn is_reviewed(&self, path: &str) -> bool {
        self.reviewed.get(path).copied().unwrap_or(false)
    }

    /// Returns the updated state. Callers persist explicitly.
    #[must_use]
    pub fn set_reviewed(mut self, path: &str, value: bool) -> Self {
        if value {
            self.reviewed.insert(path.to_string(), true);
        } else {
            self.reviewed.remove(path);
        }
        self
    }

    pub fn contains_key(&self, path: &str) -> bool {
        self.reviewed.contains_key(path)
    }

    /// Paths currently marked reviewed
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.reviewed
            .iter()
            .filter(|(_, v)| **v)
            .map(|(k, _)| k.as_str())
    }
}

// ── Storage backends ──

/// Key/value persistence, shaped like browser local storage
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One JSON file per key inside a data directory
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Like [`FileStorage::new`], but makes sure the directory exists and is
    /// writable up front.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create '{}'", dir.display()))?;
        let meta = std::fs::metadata(&dir)
            .with_context(|| format!("Failed to read '{}'", dir.display()))?;
        if meta.permissions().readonly() {
            anyhow::bail!("Storage directory '{}' is read-only", dir.display());
        }
        Ok(Self { dir })
    }

    /// `<data dir>/review-tree`, or the current directory if the platform has none
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("review-tree"))
            .unwrap_or_else(|| PathBuf::from(".review-tree"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create '{}'", self.dir.display()))?;
        let path = self.path_for(key);
        std::fs::write(&path, value)
            .with_context(|| format!("Failed to write '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
pub use memory::MemoryStorage;


// ── Store ──

/// Best-effort persistence of [`ReviewState`] on top of a [`Storage`].
/// Review marks are a convenience: nothing here ever fails the caller.
pub struct ReviewStateStore {
    storage: Box<dyn Storage>,
}

impl ReviewStateStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn load(&self, key: &str) -> ReviewState {
        let Some(payload) = self.storage.get(key) else {
            log::debug!("No review state stored under {}", key);
            return ReviewState::default();
        };
        match serde_json::from_str::<ReviewState>(&payload) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("Discarding malformed review state under {}: {}", key, e);
                ReviewState::default()
            }
        }
    }

    pub fn save(&mut self, key: &str, state: &ReviewState) {
        let payload = match serde_json::to_string(state) {
            Ok(p) => p,
            Err(e) => {
                log::warn!("Failed to serialize review state: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(key, &payload) {
            log::warn!("Review state for {} not persisted: {:#}", key, e);
        }
    }
}

// ── Storage key ──

/// 32-bit multiplicative string hash (`h = 31 * h + unit`) over UTF-16 units
pub fn hash_code(s: &str) -> i32 {
    s.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(i32::from(unit))
    })
}

/// Namespaced key for a document: `<namespace>:<hash of its path>`
pub fn storage_key(namespace: &str, document: &str) -> String {
    format!("{}:{}", namespace, hash_code(document))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_reviewed_true_then_query() {
        let state = ReviewState::default().set_reviewed("a/b.txt", true);
        assert!(state.is_reviewed("a/b.txt"));
        assert!(!state.is_reviewed("a/c.txt"));
    }

    #[test]
    fn set_reviewed_false_removes_key() {
        let state = ReviewState::default()
            .set_reviewed("a/b.txt", true)
            .set_reviewed("a/b.txt", false);
        assert!(!state.is_reviewed("a/b.txt"));
        assert!(!state.contains_key("a/b.txt"));
    }

    #[test]
    fn explicit_false_in_payload_is_not_reviewed() {
        let storage = MemoryStorage::new().with_entry("k", r#"{"reviewed":{"x":false,"y":true}}"#);
        let store = ReviewStateStore::new(Box::new(storage));
        let state = store.load("k");
        assert!(!state.is_reviewed("x"));
        assert!(state.is_reviewed("y"));
        assert_eq!(state.paths().collect::<Vec<_>>(), vec!["y"]);
    }

    #[test]
    fn load_absent_key_returns_empty() {
        let store = ReviewStateStore::new(Box::new(MemoryStorage::new()));
        assert_eq!(store.load("missing"), ReviewState::default());
    }

    #[test]
    fn load_malformed_payload_returns_empty() {
        let storage = MemoryStorage::new().with_entry("k", "{not json");
        let store = ReviewStateStore::new(Box::new(storage));
        assert_eq!(store.load("k"), ReviewState::default());
    }

    #[test]
    fn load_payload_without_reviewed_field_returns_empty() {
        let storage = MemoryStorage::new().with_entry("k", "{}");
        let store = ReviewStateStore::new(Box::new(storage));
        assert_eq!(store.load("k"), ReviewState::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let storage = MemoryStorage::new();
        let mut store = ReviewStateStore::new(Box::new(storage.clone()));
        let state = ReviewState::default().set_reviewed("src/main.rs", true);
        store.save("k", &state);
        assert_eq!(store.load("k"), state);
        assert_eq!(
            storage.get("k").unwrap(),
            r#"{"reviewed":{"src/main.rs":true}}"#
        );
    }

    #[test]
    fn save_failure_is_swallowed() {
        let storage = MemoryStorage::new();
        storage.set_fail_writes(true);
        let mut store = ReviewStateStore::new(Box::new(storage.clone()));
        store.save("k", &ReviewState::default().set_reviewed("a", true));
        assert_eq!(store.load("k"), ReviewState::default());
        assert_eq!(storage.writes(), 0);
    }

    #[test]
    fn file_storage_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert!(storage.get("review-tree:42").is_none());
        storage.set("review-tree:42", "{}").unwrap();
        assert_eq!(storage.get("review-tree:42").as_deref(), Some("{}"));
        assert!(dir.path().join("nested/review-tree_42.json").exists());
    }

    #[test]
    fn file_storage_open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b");
        FileStorage::open(&target).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn file_storage_open_on_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("taken");
        std::fs::write(&file, "x").unwrap();
        assert!(FileStorage::open(&file).is_err());
    }

    #[test]
    fn hash_code_matches_reference_values() {
        assert_eq!(hash_code(""), 0);
        assert_eq!(hash_code("a"), 97);
        assert_eq!(hash_code("ab"), 3105);
        // wraps like a 32-bit integer
        assert_eq!(hash_code("hello world"), 1794106052);
    }

    #[test]
    fn storage_key_is_namespaced() {
        assert_eq!(storage_key("review-tree", "a"), "review-tree:97");
        assert_eq!(
            storage_key("ns", "/team/repo/pull-requests/7/diff"),
            storage_key("ns", "/team/repo/pull-requests/7/diff")
        );
    }
}
