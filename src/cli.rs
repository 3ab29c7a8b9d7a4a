use clap::{ArgAction, Parser};
use harvester_core::Settings;
use std::path::PathBuf;

const WORKSPACE_CRATES: [&str; 5] = [
    "harvester",
    "harvester_core",
    "reddit_client",
    "storage",
    "collector",
];

/// Collects Reddit posts and comments matching a list of keywords.
#[derive(Debug, Parser)]
#[command(name = "harvester", version, about)]
pub struct Args {
    /// Keyword file, one phrase per line
    #[arg(long, value_name = "PATH")]
    pub keywords: Option<PathBuf>,

    /// Subreddit to search, without the r/ prefix
    #[arg(long)]
    pub subreddit: Option<String>,

    /// Directory for per-keyword JSON, JSONL and CSV files
    #[arg(long, value_name = "DIR")]
    pub results: Option<PathBuf>,

    /// Append-only summary CSV
    #[arg(long, value_name = "PATH")]
    pub summary_csv: Option<PathBuf>,

    /// JSON file of already collected ids
    #[arg(long, value_name = "PATH")]
    pub seen_ids: Option<PathBuf>,

    /// Number of hot posts scanned for matching comments
    #[arg(long, value_name = "N")]
    pub limit_posts: Option<u32>,

    /// Seconds between keywords, also the retry backoff unit
    #[arg(long, value_name = "SECS")]
    pub sleep: Option<u64>,

    /// Attempts per search page before giving up
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Only run the exact-phrase post search
    #[arg(long)]
    pub skip_comments: bool,

    /// Load credentials from a .env file in the working directory
    #[arg(long)]
    pub dotenv: bool,

    /// TOML settings file; flags override its values
    #[arg(long, value_name = "PATH", env = "HARVESTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// -v for debug output, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Overrides `settings` with every flag that was given.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(path) = &self.keywords {
            settings.keywords = path.clone();
        }
        if let Some(subreddit) = &self.subreddit {
            settings.subreddit = subreddit.trim_start_matches("r/").to_string();
        }
        if let Some(dir) = &self.results {
            settings.results_dir = dir.clone();
        }
        if let Some(path) = &self.summary_csv {
            settings.summary_csv = path.clone();
        }
        if let Some(path) = &self.seen_ids {
            settings.seen_ids = path.clone();
        }
        if let Some(n) = self.limit_posts {
            settings.hot_window = n;
        }
        if let Some(secs) = self.sleep {
            settings.sleep_secs = secs;
        }
        if let Some(n) = self.max_retries {
            settings.max_retries = n;
        }
        if self.skip_comments {
            settings.include_comments = false;
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn log_directives(&self) -> String {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let mut directives: Vec<String> = WORKSPACE_CRATES
            .iter()
            .map(|krate| format!("{}={}", krate, level))
            .collect();
        directives.insert(0, "warn".to_string());
        directives.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("harvester").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let mut settings = Settings::default();
        parse(&[]).apply(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_flags_override_settings() {
        let args = parse(&[
            "--keywords",
            "kw.txt",
            "--subreddit",
            "r/Veterans",
            "--results",
            "out",
            "--summary-csv",
            "out/summary.csv",
            "--seen-ids",
            "out/seen.json",
            "--limit-posts",
            "50",
            "--sleep",
            "1",
            "--max-retries",
            "5",
            "--skip-comments",
        ]);
        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.keywords, PathBuf::from("kw.txt"));
        assert_eq!(settings.subreddit, "Veterans");
        assert_eq!(settings.results_dir, PathBuf::from("out"));
        assert_eq!(settings.summary_csv, PathBuf::from("out/summary.csv"));
        assert_eq!(settings.seen_ids, PathBuf::from("out/seen.json"));
        assert_eq!(settings.hot_window, 50);
        assert_eq!(settings.sleep_secs, 1);
        assert_eq!(settings.max_retries, 5);
        assert!(!settings.include_comments);
    }

    #[test]
    fn test_verbosity_levels() {
        assert!(parse(&[]).log_directives().contains("collector=info"));
        assert!(parse(&["-v"]).log_directives().contains("reddit_client=debug"));
        let trace = parse(&["-vv"]).log_directives();
        assert!(trace.starts_with("warn,"));
        assert!(trace.contains("harvester_core=trace"));
    }

    #[test]
    fn test_rejects_non_numeric_sleep() {
        assert!(Args::try_parse_from(["harvester", "--sleep", "soon"]).is_err());
    }
}
