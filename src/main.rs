mod cli;

use clap::Parser;
use cli::Args;
use collector::{Collector, CollectorConfig};
use harvester_core::{load_keywords, CoreError, Credentials, ErrorExt, Settings};
use reddit_client::RedditClient;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_directives()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    run(args).await.map_err(|e| {
        e.log_error();
        eprintln!("[{}] {}", e.error_code(), e.user_friendly_message());
        e
    })
}

async fn run(args: Args) -> Result<(), CoreError> {
    if args.dotenv {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) => warn!("Could not load .env: {}", e),
        }
    }

    let mut settings = match &args.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    args.apply(&mut settings);
    settings.validate()?;

    // Everything that can be wrong locally fails before the first request.
    let keywords = load_keywords(&settings.keywords)?;
    let credentials = Credentials::from_env()?;
    info!(
        "Loaded {} keywords from {} for r/{}",
        keywords.len(),
        settings.keywords.display(),
        settings.subreddit
    );

    let client = RedditClient::new(&credentials)?;
    client.authenticate().await?;
    info!(
        "Authenticated with Reddit ({})",
        if client.is_read_only() {
            "read-only"
        } else {
            "user login"
        }
    );

    let collector = Collector::new(client, CollectorConfig::from_settings(&settings));
    let report = collector.run(&keywords).await?;

    for failed in report.failed_keywords() {
        warn!("Keyword '{}' finished incomplete", failed.keyword);
    }
    println!(
        "Collected {} posts and {} comments across {} keywords ({} duplicates skipped).",
        report.total_posts(),
        report.total_comments(),
        report.keywords.len(),
        report.total_duplicates()
    );
    println!("Results:  {}", settings.results_dir.display());
    println!("Summary:  {}", settings.summary_csv.display());
    println!("Seen ids: {}", settings.seen_ids.display());
    Ok(())
}
