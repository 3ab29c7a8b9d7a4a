use harvester_core::{Record, StorageError};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::warn;

/// The accumulated records for one keyword, in collection order.
/// Carried forward across runs and only ever appended to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bucket {
    records: Vec<Record>,
}

impl Bucket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the bucket written by an earlier run. A missing, unreadable or
    /// unparseable file yields an empty bucket; individual entries that are
    /// not valid records are dropped with a warning.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(bucket) => bucket,
            Err(e) => {
                warn!("{}; starting this keyword with an empty bucket", e);
                Self::new()
            }
        }
    }

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

        let items = match serde_json::from_str::<Value>(&raw).map_err(|e| corrupt(e.to_string()))? {
            Value::Array(items) => items,
            _ => return Err(corrupt("expected a JSON array of records".to_string())),
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match serde_json::from_value::<Record>(item) {
                Ok(record) => records.push(record),
                Err(e) => warn!(
                    "Dropping unreadable entry {} in {}: {}",
                    index,
                    path.display(),
                    e
                ),
            }
        }
        Ok(Self { records })
    }

    pub fn ids(&self) -> HashSet<String> {
        self.records.iter().map(|r| r.id().to_string()).collect()
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<Record>> for Bucket {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvester_core::PostRecord;

    fn post(id: &str) -> Record {
        Record::Post(PostRecord {
            id: id.to_string(),
            subreddit: "VeteransBenefits".to_string(),
            title: "title".to_string(),
            body: String::new(),
            url: format!("https://reddit.com/r/VeteransBenefits/comments/{}/", id),
            score: 1,
            created_utc: Some(1_700_000_000.0),
            matched_keyword: "nexus letter".to_string(),
        })
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Bucket::load(&dir.path().join("nexus_letter.json")).is_empty());
    }

    #[test]
    fn test_unparseable_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nexus_letter.json");
        fs::write(&path, "not json at all").unwrap();
        assert!(Bucket::load(&path).is_empty());
    }

    #[test]
    fn test_invalid_entries_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nexus_letter.json");
        let raw = serde_json::json!([
            serde_json::to_value(post("a1")).unwrap(),
            {"type": "video", "id": "v1"},
            42,
            serde_json::to_value(post("a2")).unwrap(),
        ]);
        fs::write(&path, raw.to_string()).unwrap();

        let bucket = Bucket::load(&path);
        assert_eq!(bucket.len(), 2);
        let ids = bucket.ids();
        assert!(ids.contains("a1") && ids.contains("a2"));
    }

    #[test]
    fn test_loads_records_written_by_earlier_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nexus_letter.json");
        let records = vec![post("a1"), post("a2")];
        fs::write(&path, serde_json::to_vec_pretty(&records).unwrap()).unwrap();

        let bucket = Bucket::load(&path);
        assert_eq!(bucket.records(), records.as_slice());
    }
}
