//! The seam between the collection loop and whatever serves posts and
//! comments. The Reddit client implements it for real runs; tests implement
//! it with scripted in-memory data.

use crate::CoreError;
use async_trait::async_trait;

/// Largest page Reddit's listing endpoints return.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A post as returned by the remote source.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePost {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub selftext: String,
    pub permalink: String,
    pub score: i64,
    pub created_utc: Option<f64>,
}

/// A comment from a fully expanded thread.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteComment {
    pub id: String,
    pub body: String,
    pub permalink: String,
    pub score: i64,
    pub created_utc: Option<f64>,
}

/// One page of a listing plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub after: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, after: None }
    }

    pub fn is_last(&self) -> bool {
        self.after.is_none() || self.items.is_empty()
    }
}

/// Result ordering for a search. Collection walks results newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchSort {
    New,
}

impl SearchSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSort::New => "new",
        }
    }
}

/// Time window for a search. Collection never narrows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    All,
}

impl TimeFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::All => "all",
        }
    }
}

/// Parameters for one page of a subreddit search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub subreddit: String,
    pub query: String,
    pub sort: SearchSort,
    pub time_filter: TimeFilter,
    pub limit: u32,
    pub after: Option<String>,
}

impl SearchRequest {
    /// Exact-phrase search: the phrase is wrapped in double quotes.
    pub fn exact_phrase(subreddit: &str, phrase: &str) -> Self {
        Self {
            subreddit: subreddit.to_string(),
            query: format!("\"{}\"", phrase),
            sort: SearchSort::New,
            time_filter: TimeFilter::All,
            limit: MAX_PAGE_SIZE,
            after: None,
        }
    }
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetches one page of search results.
    async fn search_posts(&self, request: &SearchRequest) -> Result<Page<RemotePost>, CoreError>;

    /// Fetches one page of the subreddit's hot listing.
    async fn hot_posts(
        &self,
        subreddit: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<RemotePost>, CoreError>;

    /// Returns every comment under `post`, with all collapsed threads expanded.
    async fn post_comments(&self, post: &RemotePost) -> Result<Vec<RemoteComment>, CoreError>;
}
