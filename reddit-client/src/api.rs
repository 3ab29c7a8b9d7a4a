use crate::rate_limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
use harvester_core::{
    ConfigError, CoreError, Page, RedditApiError, RemotePost, SearchRequest,
};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

pub const REDDIT_API_BASE: &str = "https://oauth.reddit.com";

/// Default wait when a 429 carries no usable `retry-after` header.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<T>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditPostData {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub num_comments: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditCommentData {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub parent_id: String,
    /// Either a nested listing or the empty string Reddit sends for leaves.
    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Vec<RedditCommentNode>,
}

/// Placeholder for comments Reddit did not inline.
#[derive(Debug, Clone, Deserialize)]
pub struct RedditMoreData {
    pub id: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub children: Vec<String>,
}

impl RedditMoreData {
    /// "continue this thread" stubs list no children and must be fetched by
    /// re-requesting the thread focused on their parent comment.
    pub fn is_thread_continuation(&self) -> bool {
        self.children.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum RedditCommentNode {
    #[serde(rename = "t1")]
    Comment(Box<RedditCommentData>),
    #[serde(rename = "more")]
    More(RedditMoreData),
}

#[derive(Debug, Deserialize)]
struct MoreChildrenResponse {
    json: MoreChildrenJson,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenJson {
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    #[serde(default)]
    data: Option<MoreChildrenData>,
}

#[derive(Debug, Deserialize)]
struct MoreChildrenData {
    #[serde(default)]
    things: Vec<RedditCommentNode>,
}

fn deserialize_replies<'de, D>(deserializer: D) -> Result<Vec<RedditCommentNode>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Replies {
        Listing(RedditListing<RedditCommentNode>),
        Empty(serde_json::Value),
    }

    Ok(match Replies::deserialize(deserializer)? {
        Replies::Listing(listing) => listing.data.children,
        Replies::Empty(_) => Vec::new(),
    })
}

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: RateLimiter,
    base_url: Url,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(user_agent: String) -> Result<Self, CoreError> {
        Self::with_base_url(user_agent, REDDIT_API_BASE, RateLimitConfig::reddit_oauth())
    }

    pub fn with_base_url(
        user_agent: String,
        base_url: &str,
        rate_config: RateLimitConfig,
    ) -> Result<Self, CoreError> {
        let base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            field: "api_base".to_string(),
            value: format!("{} ({})", base_url, e),
        })?;

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter: RateLimiter::new(rate_config),
            base_url,
            user_agent,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub async fn make_request(
        &self,
        method: Method,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, String)],
    ) -> Result<Response, CoreError> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| CoreError::InvalidInput {
                message: format!("bad endpoint {}: {}", endpoint, e),
            })?;

        self.rate_limiter.acquire_permit().await;

        debug!("Reddit API request: {} {}", method, endpoint);
        let response = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(access_token)
            .query(query_params)
            .send()
            .await
            .map_err(|e| {
                error!("Network error for {} {}: {}", method, endpoint, e);
                if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        self.rate_limiter
            .update_from_headers(response.headers())
            .await;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        error!("Request failed with status: {} for {}", status, endpoint);
        Err(CoreError::RedditApi(match status {
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .map(|secs| secs.ceil().max(0.0) as u64)
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
                warn!("Rate limited, retry after {} seconds", retry_after);
                RedditApiError::RateLimitExceeded { retry_after }
            }
            StatusCode::UNAUTHORIZED => RedditApiError::InvalidToken,
            StatusCode::FORBIDDEN => RedditApiError::Forbidden {
                resource: endpoint.to_string(),
            },
            StatusCode::NOT_FOUND => RedditApiError::NotFound {
                resource: endpoint.to_string(),
            },
            StatusCode::BAD_REQUEST => RedditApiError::BadRequest {
                endpoint: endpoint.to_string(),
                details: response.text().await.unwrap_or_default(),
            },
            s if s.is_server_error() => RedditApiError::ServerError {
                status_code: s.as_u16(),
            },
            s => RedditApiError::InvalidResponse {
                details: format!("unexpected status {} from {}", s, endpoint),
            },
        }))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        access_token: &str,
        query_params: &[(&str, String)],
    ) -> Result<T, CoreError> {
        let response = self
            .make_request(Method::GET, endpoint, access_token, query_params)
            .await?;

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("{}: {}", endpoint, e),
                })
            }
        })
    }

    pub async fn search(
        &self,
        access_token: &str,
        request: &SearchRequest,
    ) -> Result<Page<RemotePost>, CoreError> {
        let endpoint = format!("/r/{}/search", request.subreddit);
        let mut params = vec![
            ("q", request.query.clone()),
            ("restrict_sr", "1".to_string()),
            ("include_over_18", "on".to_string()),
            ("sort", request.sort.as_str().to_string()),
            ("t", request.time_filter.as_str().to_string()),
            ("limit", request.limit.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(after) = &request.after {
            params.push(("after", after.clone()));
        }

        let listing: RedditListing<RedditListingChild<RedditPostData>> =
            self.get_json(&endpoint, access_token, &params).await?;
        Ok(listing_to_page(listing))
    }

    pub async fn hot(
        &self,
        access_token: &str,
        subreddit: &str,
        limit: u32,
        after: Option<&str>,
    ) -> Result<Page<RemotePost>, CoreError> {
        let endpoint = format!("/r/{}/hot", subreddit);
        let mut params = vec![("limit", limit.to_string()), ("raw_json", "1".to_string())];
        if let Some(after) = after {
            params.push(("after", after.to_string()));
        }

        let listing: RedditListing<RedditListingChild<RedditPostData>> =
            self.get_json(&endpoint, access_token, &params).await?;
        Ok(listing_to_page(listing))
    }

    /// Top-level comment nodes of a thread. With `focus`, the thread is
    /// rooted at that comment instead.
    pub async fn comments(
        &self,
        access_token: &str,
        post_id: &str,
        focus: Option<&str>,
    ) -> Result<Vec<RedditCommentNode>, CoreError> {
        let endpoint = format!("/comments/{}", post_id);
        let mut params = vec![("raw_json", "1".to_string())];
        if let Some(comment) = focus {
            params.push(("comment", comment.to_string()));
        }

        // [post listing, comment listing]
        let (_post, comments): (serde_json::Value, RedditListing<RedditCommentNode>) =
            self.get_json(&endpoint, access_token, &params).await?;
        Ok(comments.data.children)
    }

    /// Expands up to 100 collapsed comment ids of one thread.
    pub async fn more_children(
        &self,
        access_token: &str,
        link_fullname: &str,
        children: &[String],
    ) -> Result<Vec<RedditCommentNode>, CoreError> {
        let params = [
            ("api_type", "json".to_string()),
            ("link_id", link_fullname.to_string()),
            ("children", children.join(",")),
            ("raw_json", "1".to_string()),
        ];

        let response: MoreChildrenResponse = self
            .get_json("/api/morechildren", access_token, &params)
            .await?;
        if !response.json.errors.is_empty() {
            return Err(CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("morechildren errors: {:?}", response.json.errors),
            }));
        }
        Ok(response.json.data.map(|d| d.things).unwrap_or_default())
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.get_rate_limit_status().await
    }
}

fn listing_to_page(listing: RedditListing<RedditListingChild<RedditPostData>>) -> Page<RemotePost> {
    let items = listing
        .data
        .children
        .into_iter()
        .filter(|child| child.kind == "t3")
        .map(|child| RemotePost::from(child.data))
        .collect();
    Page {
        items,
        after: listing.data.after,
    }
}

impl From<RedditPostData> for RemotePost {
    fn from(post_data: RedditPostData) -> Self {
        Self {
            id: post_data.id,
            subreddit: post_data.subreddit,
            title: post_data.title,
            selftext: post_data.selftext,
            permalink: post_data.permalink,
            score: post_data.score,
            created_utc: post_data.created_utc,
        }
    }
}
