use harvester_core::{RetryConfig, Settings};
use std::path::PathBuf;
use std::time::Duration;

/// Everything one collection run needs, resolved from [`Settings`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub subreddit: String,
    pub results_dir: PathBuf,
    pub summary_csv: PathBuf,
    pub seen_ids: PathBuf,
    pub search_limit: u32,
    pub hot_window: u32,
    pub include_comments: bool,
    /// Pause between keywords.
    pub delay: Duration,
    pub retry: RetryConfig,
    pub checkpoint_every: usize,
}

impl CollectorConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let delay = settings.delay();
        Self {
            subreddit: settings.subreddit.clone(),
            results_dir: settings.results_dir.clone(),
            summary_csv: settings.summary_csv.clone(),
            seen_ids: settings.seen_ids.clone(),
            search_limit: settings.search_limit,
            hot_window: settings.hot_window,
            include_comments: settings.include_comments,
            delay,
            retry: RetryConfig::new(settings.max_retries, delay),
            checkpoint_every: settings.checkpoint_every.max(1),
        }
    }
}
