//! Runs one exact-phrase search against live Reddit and prints the hits.
//!
//! ```text
//! CLIENT_ID=... CLIENT_SECRET=... cargo run -p reddit-client --example search_smoke -- "nexus letter"
//! ```

use harvester_core::{ContentSource, Credentials, SearchRequest, DEFAULT_SUBREDDIT};
use reddit_client::RedditClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let phrase = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "C&P exam".to_string());
    let subreddit =
        std::env::var("SUBREDDIT").unwrap_or_else(|_| DEFAULT_SUBREDDIT.to_string());

    let credentials = Credentials::from_env()?;
    let client = RedditClient::new(&credentials)?;
    client.authenticate().await?;
    println!(
        "Authenticated ({})",
        if client.is_read_only() { "read-only" } else { "user" }
    );

    let page = client
        .search_posts(&SearchRequest::exact_phrase(&subreddit, &phrase))
        .await?;
    println!("{} results for \"{}\" in r/{}", page.items.len(), phrase, subreddit);
    for post in page.items.iter().take(10) {
        println!("  [{}] {} ({})", post.id, post.title, post.score);
    }

    if let Some(first) = page.items.first() {
        let comments = client.post_comments(first).await?;
        println!("First post has {} comments after expansion", comments.len());
    }

    let status = client.get_rate_limit_status().await;
    println!("Rate limit remaining: {:?}", status.remaining);
    Ok(())
}
