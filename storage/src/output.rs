//! Per-keyword renderings of a bucket: pretty JSON, JSON lines and flat CSV.
//! All three are derived from the bucket alone and fully rewritten each run.

use crate::{sanitize_filename, write_atomic};
use harvester_core::{CoreError, Record};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const CSV_HEADER: [&str; 10] = [
    "type",
    "id",
    "post_id",
    "subreddit",
    "title",
    "body",
    "url",
    "score",
    "created_utc",
    "matched_keyword",
];

/// Output files for one keyword inside the results directory.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub json: PathBuf,
    pub jsonl: PathBuf,
    pub csv: PathBuf,
}

impl OutputPaths {
    pub fn for_keyword(results_dir: &Path, keyword: &str) -> Self {
        let stem = sanitize_filename(keyword);
        Self {
            json: results_dir.join(format!("{}.json", stem)),
            jsonl: results_dir.join(format!("{}.txt", stem)),
            csv: results_dir.join(format!("{}.csv", stem)),
        }
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    kind: &'a str,
    id: &'a str,
    post_id: Option<&'a str>,
    subreddit: &'a str,
    title: &'a str,
    body: &'a str,
    url: &'a str,
    score: i64,
    created_utc: Option<f64>,
    matched_keyword: &'a str,
}

impl<'a> From<&'a Record> for CsvRow<'a> {
    fn from(record: &'a Record) -> Self {
        match record {
            Record::Post(p) => CsvRow {
                kind: record.kind(),
                id: &p.id,
                post_id: None,
                subreddit: &p.subreddit,
                title: &p.title,
                body: &p.body,
                url: &p.url,
                score: p.score,
                created_utc: p.created_utc,
                matched_keyword: &p.matched_keyword,
            },
            Record::Comment(c) => CsvRow {
                kind: record.kind(),
                id: &c.id,
                post_id: Some(&c.post_id),
                subreddit: &c.subreddit,
                title: &c.title,
                body: &c.body,
                url: &c.url,
                score: c.score,
                created_utc: c.created_utc,
                matched_keyword: &c.matched_keyword,
            },
        }
    }
}

pub fn render_json(records: &[Record]) -> Result<Vec<u8>, CoreError> {
    Ok(serde_json::to_vec_pretty(records)?)
}

pub fn render_jsonl(records: &[Record]) -> Result<Vec<u8>, CoreError> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

pub fn render_csv(records: &[Record]) -> Result<Vec<u8>, CoreError> {
    let mut writer = csv_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .map_err(harvester_core::StorageError::from)?;
    for record in records {
        writer
            .serialize(CsvRow::from(record))
            .map_err(harvester_core::StorageError::from)?;
    }
    writer.into_inner().map_err(|e| CoreError::Io(e.into_error()))
}

/// Header-less CSV writer with the CRLF terminator the log files use.
pub(crate) fn csv_writer<W: std::io::Write>(inner: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::CRLF)
        .from_writer(inner)
}

/// Renders every format in memory, then replaces each file atomically.
pub fn write_outputs(paths: &OutputPaths, records: &[Record]) -> Result<(), CoreError> {
    let json = render_json(records)?;
    let jsonl = render_jsonl(records)?;
    let csv = render_csv(records)?;

    write_atomic(&paths.json, &json)?;
    write_atomic(&paths.jsonl, &jsonl)?;
    write_atomic(&paths.csv, &csv)?;
    Ok(())
}
