use crate::write_atomic;
use harvester_core::{CoreError, StorageError};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Every identifier ever collected. Anything in here is never collected again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenIdSet {
    ids: HashSet<String>,
}

impl SeenIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the set, falling back to an empty one when the file is missing,
    /// unreadable or corrupt.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(set) => {
                debug!("Loaded {} seen ids from {}", set.len(), path.display());
                set
            }
            Err(e) => {
                warn!("{}; starting with an empty seen-id set", e);
                Self::new()
            }
        }
    }

    /// Strict load: a missing file is an empty set, anything unparseable is
    /// an error.
    pub fn try_load(path: &Path) -> Result<Self, StorageError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let raw = fs::read_to_string(path).map_err(|source| StorageError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let corrupt = |details: String| StorageError::Corrupt {
            path: path.to_path_buf(),
            details,
        };

        match serde_json::from_str::<Value>(&raw).map_err(|e| corrupt(e.to_string()))? {
            Value::Array(items) => Ok(Self {
                ids: items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => s,
                        other => other.to_string(),
                    })
                    .collect(),
            }),
            _ => Err(corrupt("expected a JSON array of ids".to_string())),
        }
    }

    /// Writes the set as a sorted JSON array.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let mut sorted: Vec<&str> = self.ids.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        let bytes = serde_json::to_vec_pretty(&sorted)?;
        write_atomic(path, &bytes)?;
        debug!("Saved {} seen ids to {}", sorted.len(), path.display());
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns `false` if the id was already present.
    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.ids.insert(id.into())
    }

    /// Returns `false` if the id was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SeenIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let set = SeenIdSet::load(&dir.path().join("seen_ids.json"));
        assert!(set.is_empty());
    }

    #[test]
    fn test_corrupt_file_recovers_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_ids.json");
        fs::write(&path, "[\"abc\", ").unwrap();

        assert!(matches!(
            SeenIdSet::try_load(&path),
            Err(StorageError::Corrupt { .. })
        ));
        assert!(SeenIdSet::load(&path).is_empty());
    }

    #[test]
    fn test_non_array_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_ids.json");
        fs::write(&path, r#"{"ids": ["a"]}"#).unwrap();

        assert!(SeenIdSet::try_load(&path).is_err());
        assert!(SeenIdSet::load(&path).is_empty());
    }

    #[test]
    fn test_save_writes_sorted_array_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/seen_ids.json");
        let set: SeenIdSet = ["zz9", "abc", "m42"].into_iter().collect();

        set.save(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, vec!["abc", "m42", "zz9"]);
        assert_eq!(SeenIdSet::load(&path), set);
    }

    #[test]
    fn test_non_string_entries_are_stringified() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seen_ids.json");
        fs::write(&path, r#"["abc", 123]"#).unwrap();

        let set = SeenIdSet::load(&path);
        assert!(set.contains("abc"));
        assert!(set.contains("123"));
    }

    #[test]
    fn test_insert_reports_novelty() {
        let mut set = SeenIdSet::new();
        assert!(set.insert("abc"));
        assert!(!set.insert("abc"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_forgets_id() {
        let mut set: SeenIdSet = ["abc", "def"].into_iter().collect();
        assert!(set.remove("abc"));
        assert!(!set.remove("abc"));
        assert!(!set.contains("abc"));
        assert!(set.contains("def"));
        assert!(set.insert("abc"));
    }
}
