use crate::output::csv_writer;
use harvester_core::{CoreError, StorageError, SummaryRow};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const SUMMARY_HEADER: [&str; 7] = [
    "keyword",
    "posts_found",
    "comments_found",
    "oldest_date",
    "newest_date",
    "outfile_json",
    "duplicates_skipped",
];

/// Append-only CSV with one row per keyword per run.
#[derive(Debug, Clone)]
pub struct SummaryLog {
    path: PathBuf,
}

impl SummaryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with just the header if it is missing or empty.
    pub fn ensure_header(&self) -> Result<(), CoreError> {
        self.append_rows(&[])
    }

    pub fn append(&self, row: &SummaryRow) -> Result<(), CoreError> {
        self.append_rows(std::slice::from_ref(row))
    }

    fn append_rows(&self, rows: &[SummaryRow]) -> Result<(), CoreError> {
        let write_err = |source| StorageError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;
        let needs_header = file.metadata().map_err(write_err)?.len() == 0;

        // One write per call keeps a row from being split by a crash.
        let mut writer = csv_writer(Vec::new());
        if needs_header {
            writer
                .write_record(SUMMARY_HEADER)
                .map_err(StorageError::from)?;
        }
        for row in rows {
            writer.serialize(row).map_err(StorageError::from)?;
        }
        let bytes = writer.into_inner().map_err(|e| CoreError::Io(e.into_error()))?;

        file.write_all(&bytes).map_err(write_err)?;
        file.flush().map_err(write_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(keyword: &str, posts: usize) -> SummaryRow {
        SummaryRow {
            keyword: keyword.to_string(),
            posts_found: posts,
            comments_found: 1,
            oldest_date: "2022-01-01".to_string(),
            newest_date: "2022-01-03".to_string(),
            outfile_json: format!("results/{}.json", keyword),
            duplicates_skipped: 4,
        }
    }

    #[test]
    fn test_ensure_header_on_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = SummaryLog::new(dir.path().join("summary_log.csv"));

        log.ensure_header().unwrap();
        log.ensure_header().unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, format!("{}\r\n", SUMMARY_HEADER.join(",")));
    }

    #[test]
    fn test_append_rows_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let log = SummaryLog::new(dir.path().join("logs/summary_log.csv"));

        log.append(&row("denied", 3)).unwrap();
        log.append(&row("nexus", 0)).unwrap();

        let text = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], SUMMARY_HEADER.join(","));
        assert_eq!(
            lines[1],
            "denied,3,1,2022-01-01,2022-01-03,results/denied.json,4"
        );
        assert!(lines[2].starts_with("nexus,0,"));
    }

    #[test]
    fn test_existing_rows_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary_log.csv");
        fs::write(&path, "keyword,posts_found\r\nold,1\r\n").unwrap();

        SummaryLog::new(&path).append(&row("new", 2)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("keyword,posts_found\r\nold,1\r\nnew,2,"));
    }
}
