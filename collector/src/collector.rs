use crate::config::CollectorConfig;
use crate::report::{KeywordReport, RunReport};
use harvester_core::{
    ContentSource, CoreError, ErrorExt, Record, RetryExecutor, SearchRequest, SummaryRow,
    TimestampRange, MAX_PAGE_SIZE,
};
use std::collections::HashSet;
use storage::{write_outputs, Bucket, OutputPaths, SeenIdSet, SummaryLog};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Drives the per-keyword collection loop against a [`ContentSource`].
pub struct Collector<S> {
    source: S,
    config: CollectorConfig,
    retry: RetryExecutor,
    summary: SummaryLog,
}

/// Mutable state for one keyword: its bucket plus dedup bookkeeping.
struct KeywordRun<'a> {
    keyword: &'a str,
    bucket: Bucket,
    existing: HashSet<String>,
    seen: &'a mut SeenIdSet,
    added: Vec<String>,
    range: TimestampRange,
    posts_found: usize,
    comments_found: usize,
    duplicates_skipped: usize,
}

impl<'a> KeywordRun<'a> {
    fn new(keyword: &'a str, bucket: Bucket, seen: &'a mut SeenIdSet) -> Self {
        Self {
            keyword,
            existing: bucket.ids(),
            bucket,
            seen,
            added: Vec::new(),
            range: TimestampRange::default(),
            posts_found: 0,
            comments_found: 0,
            duplicates_skipped: 0,
        }
    }

    fn is_known(&self, id: &str) -> bool {
        self.seen.contains(id) || self.existing.contains(id)
    }

    /// Appends `record` unless its id was collected before.
    fn offer(&mut self, record: Record) -> bool {
        if self.is_known(record.id()) {
            self.duplicates_skipped += 1;
            return false;
        }

        self.existing.insert(record.id().to_string());
        self.seen.insert(record.id());
        self.added.push(record.id().to_string());
        self.range.observe(record.created_utc());
        match record {
            Record::Post(_) => self.posts_found += 1,
            Record::Comment(_) => self.comments_found += 1,
        }
        self.bucket.push(record);
        true
    }

    /// Drops this run's ids from the shared set so a later run can collect
    /// them again. Returns how many were dropped.
    fn forget_added(&mut self) -> usize {
        for id in &self.added {
            self.seen.remove(id);
        }
        std::mem::take(&mut self.added).len()
    }
}

impl<S: ContentSource> Collector<S> {
    pub fn new(source: S, config: CollectorConfig) -> Self {
        Self {
            source,
            retry: RetryExecutor::new(config.retry.clone()),
            summary: SummaryLog::new(config.summary_csv.clone()),
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Processes `keywords` in order. Only the final seen-id save can fail the
    /// run; every per-keyword failure is logged and skipped.
    pub async fn run(&self, keywords: &[String]) -> Result<RunReport, CoreError> {
        if let Err(e) = self.summary.ensure_header() {
            e.log_error();
        }

        let mut seen = SeenIdSet::load(&self.config.seen_ids);
        info!(
            "Loaded {} previously collected ids from {}",
            seen.len(),
            self.config.seen_ids.display()
        );

        let mut report = RunReport::default();
        for (index, keyword) in keywords.iter().enumerate() {
            info!("[{}/{}] Collecting '{}'", index + 1, keywords.len(), keyword);
            report
                .keywords
                .push(self.collect_keyword(keyword, &mut seen).await);

            if (index + 1) % self.config.checkpoint_every == 0 {
                self.checkpoint(&seen);
            }
            if index + 1 < keywords.len() && !self.config.delay.is_zero() {
                debug!("Sleeping {:?} before next keyword", self.config.delay);
                sleep(self.config.delay).await;
            }
        }

        seen.save(&self.config.seen_ids)?;
        report.seen_ids = seen.len();
        debug!("Retry stats: {:?}", self.retry.get_metrics());
        info!(
            "Run complete: {} posts, {} comments, {} duplicates skipped",
            report.total_posts(),
            report.total_comments(),
            report.total_duplicates()
        );
        Ok(report)
    }

    pub async fn collect_keyword(&self, keyword: &str, seen: &mut SeenIdSet) -> KeywordReport {
        let paths = OutputPaths::for_keyword(&self.config.results_dir, keyword);
        let bucket = Bucket::load(&paths.json);
        let mut run = KeywordRun::new(keyword, bucket, seen);

        let search_completed = match self.search_posts(&mut run).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Post search for '{}' aborted: {}",
                    keyword,
                    e.user_friendly_message()
                );
                false
            }
        };

        if self.config.include_comments {
            self.scan_comments(&mut run).await;
        }

        let outputs_written = match write_outputs(&paths, run.bucket.records()) {
            Ok(()) => true,
            Err(e) => {
                e.log_error();
                let forgotten = run.forget_added();
                if forgotten > 0 {
                    warn!(
                        "'{}': outputs not written, {} ids left collectable for the next run",
                        keyword, forgotten
                    );
                }
                false
            }
        };

        let row = SummaryRow {
            keyword: keyword.to_string(),
            posts_found: run.posts_found,
            comments_found: run.comments_found,
            oldest_date: run.range.oldest_date(),
            newest_date: run.range.newest_date(),
            outfile_json: paths.json.display().to_string(),
            duplicates_skipped: run.duplicates_skipped,
        };
        if let Err(e) = self.summary.append(&row) {
            e.log_error();
        }

        info!(
            "'{}': {} new posts, {} new comments, {} duplicates skipped ({} total in bucket)",
            keyword,
            run.posts_found,
            run.comments_found,
            run.duplicates_skipped,
            run.bucket.len()
        );

        KeywordReport {
            keyword: keyword.to_string(),
            posts_found: run.posts_found,
            comments_found: run.comments_found,
            duplicates_skipped: run.duplicates_skipped,
            outfile_json: paths.json,
            search_completed,
            outputs_written,
        }
    }

    /// Exact-phrase search, paged up to `search_limit` results. Each page is
    /// retried on transient failures; pages already collected are kept.
    async fn search_posts(&self, run: &mut KeywordRun<'_>) -> Result<(), CoreError> {
        let limit = self.config.search_limit;
        let operation = format!("search '{}'", run.keyword);
        let mut after: Option<String> = None;
        let mut fetched = 0u32;

        while fetched < limit {
            let mut request = SearchRequest::exact_phrase(&self.config.subreddit, run.keyword);
            request.limit = (limit - fetched).min(MAX_PAGE_SIZE);
            request.after = after.take();

            let page = self
                .retry
                .execute(&operation, || self.source.search_posts(&request))
                .await?;
            debug!(
                "Search page for '{}' returned {} posts",
                run.keyword,
                page.items.len()
            );

            fetched = fetched.saturating_add(page.items.len() as u32);
            for post in &page.items {
                run.offer(Record::from_post(post, run.keyword));
            }

            if page.is_last() {
                break;
            }
            after = page.after;
        }
        Ok(())
    }

    /// Scans the hot window for comments containing the keyword, ignoring case.
    async fn scan_comments(&self, run: &mut KeywordRun<'_>) {
        let needle = run.keyword.to_lowercase();
        let window = self.config.hot_window;
        let mut after: Option<String> = None;
        let mut scanned = 0u32;

        while scanned < window {
            let limit = (window - scanned).min(MAX_PAGE_SIZE);
            let page = match self
                .source
                .hot_posts(&self.config.subreddit, limit, after.as_deref())
                .await
            {
                Ok(page) => page,
                Err(e) => {
                    warn!(
                        "Hot listing failed for '{}', ending comment scan: {}",
                        run.keyword, e
                    );
                    return;
                }
            };
            scanned = scanned.saturating_add(page.items.len() as u32);

            for post in &page.items {
                let comments = match self.source.post_comments(post).await {
                    Ok(comments) => comments,
                    Err(e) => {
                        warn!("Skipping comments of post {}: {}", post.id, e);
                        continue;
                    }
                };
                for comment in comments
                    .iter()
                    .filter(|c| c.body.to_lowercase().contains(&needle))
                {
                    run.offer(Record::from_comment(comment, post, run.keyword));
                }
            }

            if page.is_last() {
                break;
            }
            after = page.after;
        }
    }

    fn checkpoint(&self, seen: &SeenIdSet) {
        match seen.save(&self.config.seen_ids) {
            Ok(()) => debug!("Checkpointed {} seen ids", seen.len()),
            Err(e) => {
                e.log_warn();
            }
        }
    }
}
