use crate::source::{RemoteComment, RemotePost};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const PERMALINK_HOST: &str = "https://reddit.com";

/// Marker written when a date cannot be derived.
pub const NO_DATE: &str = "N/A";

/// One collected item. Serialized with an internal `"type"` tag so the
/// on-disk shape is a flat object: `{"type": "post", "id": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Record {
    Post(PostRecord),
    Comment(CommentRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub matched_keyword: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentRecord {
    pub id: String,
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub subreddit: String,
    /// Title of the post the comment belongs to.
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub matched_keyword: String,
}

impl Record {
    pub fn from_post(post: &RemotePost, keyword: &str) -> Self {
        Record::Post(PostRecord {
            id: post.id.clone(),
            subreddit: post.subreddit.clone(),
            title: post.title.clone(),
            body: post.selftext.clone(),
            url: permalink_url(&post.permalink),
            score: post.score,
            created_utc: post.created_utc,
            matched_keyword: keyword.to_string(),
        })
    }

    pub fn from_comment(comment: &RemoteComment, parent: &RemotePost, keyword: &str) -> Self {
        Record::Comment(CommentRecord {
            id: comment.id.clone(),
            post_id: parent.id.clone(),
            subreddit: parent.subreddit.clone(),
            title: parent.title.clone(),
            body: comment.body.clone(),
            url: permalink_url(&comment.permalink),
            score: comment.score,
            created_utc: comment.created_utc,
            matched_keyword: keyword.to_string(),
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Post(p) => &p.id,
            Record::Comment(c) => &c.id,
        }
    }

    pub fn created_utc(&self) -> Option<f64> {
        match self {
            Record::Post(p) => p.created_utc,
            Record::Comment(c) => c.created_utc,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Record::Post(_) => "post",
            Record::Comment(_) => "comment",
        }
    }
}

fn permalink_url(permalink: &str) -> String {
    format!("{}{}", PERMALINK_HOST, permalink)
}

/// Running oldest/newest creation timestamps for one keyword's new records.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimestampRange {
    pub oldest: Option<f64>,
    pub newest: Option<f64>,
}

impl TimestampRange {
    pub fn observe(&mut self, ts: Option<f64>) {
        let Some(ts) = ts else { return };
        self.oldest = Some(self.oldest.map_or(ts, |o| o.min(ts)));
        self.newest = Some(self.newest.map_or(ts, |n| n.max(ts)));
    }

    pub fn oldest_date(&self) -> String {
        format_utc_date(self.oldest)
    }

    pub fn newest_date(&self) -> String {
        format_utc_date(self.newest)
    }
}

/// Formats an epoch timestamp as a UTC calendar date (`YYYY-MM-DD`).
/// Missing, zero or out-of-range timestamps yield [`NO_DATE`].
pub fn format_utc_date(ts: Option<f64>) -> String {
    match ts {
        Some(secs) if secs.is_finite() && secs != 0.0 => {
            DateTime::<Utc>::from_timestamp(secs.floor() as i64, 0)
                .map(|dt| dt.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| NO_DATE.to_string())
        }
        _ => NO_DATE.to_string(),
    }
}

/// One row of the cross-keyword summary log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub keyword: String,
    pub posts_found: usize,
    pub comments_found: usize,
    pub oldest_date: String,
    pub newest_date: String,
    pub outfile_json: String,
    pub duplicates_skipped: usize,
}
