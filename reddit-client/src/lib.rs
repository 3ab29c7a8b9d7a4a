pub mod api;
pub mod auth;
pub mod comments;
pub mod rate_limiter;


pub use api::{RedditApiClient, REDDIT_API_BASE};
pub use auth::{RedditAuthenticator, RedditToken, REDDIT_TOKEN_URL};
pub use comments::{CommentTree, Expansion, MORE_CHILDREN_CHUNK};
pub use rate_limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};

use async_trait::async_trait;
use harvester_core::{
    ContentSource, CoreError, Credentials, Page, RedditApiError, RemoteComment, RemotePost,
    SearchRequest,
};
use std::future::Future;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Authenticated, paced access to the Reddit listings the collector needs.
#[derive(Debug)]
pub struct RedditClient {
    auth: RedditAuthenticator,
    api: RedditApiClient,
    token: Mutex<Option<RedditToken>>,
}

impl RedditClient {
    pub fn new(credentials: &Credentials) -> Result<Self, CoreError> {
        Ok(Self {
            auth: RedditAuthenticator::new(credentials)?,
            api: RedditApiClient::new(credentials.user_agent.clone())?,
            token: Mutex::new(None),
        })
    }

    /// Points the client at other endpoints, e.g. a local mock server.
    pub fn with_endpoints(
        credentials: &Credentials,
        api_base: &str,
        token_url: &str,
        rate_config: RateLimitConfig,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            auth: RedditAuthenticator::with_token_url(credentials, token_url)?,
            api: RedditApiClient::with_base_url(
                credentials.user_agent.clone(),
                api_base,
                rate_config,
            )?,
            token: Mutex::new(None),
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.auth.is_read_only()
    }

    /// Fetches a fresh token, replacing any cached one.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let token = self.auth.fetch_token().await?;
        *self.token.lock().await = Some(token);
        Ok(())
    }

    async fn access_token(&self) -> Result<String, CoreError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.access_token.clone());
        }

        debug!("Access token missing or expired, requesting a new one");
        let token = self.auth.fetch_token().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);
        Ok(access_token)
    }

    /// Runs `call` with a valid token, re-authenticating once on a 401.
    async fn with_token<T, F, Fut>(&self, call: F) -> Result<T, CoreError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let token = self.access_token().await?;
        match call(token).await {
            Err(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
                warn!("Reddit rejected the access token, re-authenticating");
                *self.token.lock().await = None;
                let token = self.access_token().await?;
                call(token).await
            }
            other => other,
        }
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.api.get_rate_limit_status().await
    }
}

#[async_trait]
impl ContentSource for RedditClient {
    async fn search_posts(&self, request: &SearchRequest) -> Result<Page<RemotePost>, CoreError> {
        self.with_token(|token| async move { self.api.search(&token, request).await })
            .await
    }

    async fn hot_posts(
        &self,
        subreddit: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<RemotePost>, CoreError> {
        self.with_token(|token| async move { self.api.hot(&token, subreddit, limit, after).await })
            .await
    }

    async fn post_comments(&self, post: &RemotePost) -> Result<Vec<RemoteComment>, CoreError> {
        let post_id = post.id.as_str();
        let nodes = self
            .with_token(|token| async move { self.api.comments(&token, post_id, None).await })
            .await?;

        let mut tree = CommentTree::new();
        tree.absorb(nodes);

        let link_fullname = format!("t3_{}", post.id);
        while let Some(expansion) = tree.next_expansion() {
            let nodes = match &expansion {
                Expansion::Children(ids) => {
                    let link = link_fullname.as_str();
                    self.with_token(|token| async move {
                        self.api.more_children(&token, link, ids).await
                    })
                    .await?
                }
                Expansion::Thread { comment_id } => {
                    let focus = comment_id.as_str();
                    self.with_token(|token| async move {
                        self.api.comments(&token, post_id, Some(focus)).await
                    })
                    .await?
                }
            };
            tree.absorb(nodes);
        }

        debug!("Post {} expanded to {} comments", post.id, tree.len());
        Ok(tree.into_comments())
    }
}
