use std::path::PathBuf;

/// Outcome of one keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordReport {
    pub keyword: String,
    pub posts_found: usize,
    pub comments_found: usize,
    pub duplicates_skipped: usize,
    pub outfile_json: PathBuf,
    /// False when the search step was aborted.
    pub search_completed: bool,
    /// False when the outputs could not be written.
    pub outputs_written: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub keywords: Vec<KeywordReport>,
    /// Size of the seen-id set after the run.
    pub seen_ids: usize,
}

impl RunReport {
    pub fn total_posts(&self) -> usize {
        self.keywords.iter().map(|k| k.posts_found).sum()
    }

    pub fn total_comments(&self) -> usize {
        self.keywords.iter().map(|k| k.comments_found).sum()
    }

    pub fn total_duplicates(&self) -> usize {
        self.keywords.iter().map(|k| k.duplicates_skipped).sum()
    }

    pub fn failed_keywords(&self) -> impl Iterator<Item = &KeywordReport> {
        self.keywords
            .iter()
            .filter(|k| !k.search_completed || !k.outputs_written)
    }
}
