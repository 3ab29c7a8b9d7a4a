use harvester_core::{ConfigError, CoreError, Credentials, RedditApiError};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, HttpRequest, HttpResponse, RequestTokenError,
    ResourceOwnerPassword, ResourceOwnerUsername, Scope, TokenResponse, TokenUrl,
};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com/api/v1/authorize";
pub const REDDIT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Refresh this long before the reported expiry.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);
/// Lifetime assumed when the token response omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct RedditToken {
    pub access_token: String,
    pub expires_at: Instant,
}

impl std::fmt::Debug for RedditToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditToken")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl RedditToken {
    pub fn new(access_token: String, lifetime: Option<Duration>) -> Self {
        Self {
            access_token,
            expires_at: Instant::now() + lifetime.unwrap_or(DEFAULT_TOKEN_LIFETIME),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Application-only OAuth for a Reddit "script" app. Uses the password grant
/// when a login is configured, client credentials otherwise.
#[derive(Debug)]
pub struct RedditAuthenticator {
    oauth_client: BasicClient,
    http_client: reqwest::Client,
    login: Option<(String, String)>,
}

impl RedditAuthenticator {
    pub fn new(credentials: &Credentials) -> Result<Self, CoreError> {
        Self::with_token_url(credentials, REDDIT_TOKEN_URL)
    }

    pub fn with_token_url(credentials: &Credentials, token_url: &str) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTH_URL.to_string()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "auth_url".to_string(),
                value: e.to_string(),
            }
        })?;
        let token_url =
            TokenUrl::new(token_url.to_string()).map_err(|e| ConfigError::InvalidValue {
                field: "token_url".to_string(),
                value: format!("{} ({})", token_url, e),
            })?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id.clone()),
            Some(ClientSecret::new(credentials.client_secret.clone())),
            auth_url,
            Some(token_url),
        );

        // Reddit rejects token requests without a descriptive User-Agent, and
        // the token endpoint must not be followed through redirects.
        let http_client = reqwest::Client::builder()
            .user_agent(&credentials.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            oauth_client,
            http_client,
            login: credentials.login.clone(),
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.login.is_none()
    }

    pub async fn fetch_token(&self) -> Result<RedditToken, CoreError> {
        let http = self.http_client.clone();
        let send = move |request| send_token_request(http, request);

        let result = match &self.login {
            Some((username, password)) => {
                debug!("Requesting Reddit token with password grant");
                let username = ResourceOwnerUsername::new(username.clone());
                let password = ResourceOwnerPassword::new(password.clone());
                self.oauth_client
                    .exchange_password(&username, &password)
                    .add_scope(Scope::new("read".to_string()))
                    .request_async(send)
                    .await
            }
            None => {
                debug!("Requesting Reddit token with client credentials grant");
                self.oauth_client
                    .exchange_client_credentials()
                    .add_scope(Scope::new("read".to_string()))
                    .request_async(send)
                    .await
            }
        };

        let token = result.map_err(map_token_error)?;
        info!("Authenticated with Reddit");
        Ok(RedditToken::new(
            token.access_token().secret().clone(),
            token.expires_in(),
        ))
    }
}

async fn send_token_request(
    client: reqwest::Client,
    request: HttpRequest,
) -> Result<HttpResponse, reqwest::Error> {
    let response = client
        .request(request.method, request.url.as_str())
        .headers(request.headers)
        .body(request.body)
        .send()
        .await?;
    let status_code = response.status();
    let headers = response.headers().clone();
    let body = response.bytes().await?.to_vec();

    Ok(HttpResponse {
        status_code,
        headers,
        body,
    })
}

fn map_token_error(error: RequestTokenError<reqwest::Error, BasicErrorResponse>) -> CoreError {
    match error {
        RequestTokenError::Request(e) => CoreError::Network(e),
        RequestTokenError::ServerResponse(response) => {
            RedditApiError::AuthenticationFailed {
                reason: response.to_string(),
            }
            .into()
        }
        // Reddit answers bad credentials with a body that is neither a token
        // nor a standard OAuth error.
        RequestTokenError::Parse(e, body) => RedditApiError::AuthenticationFailed {
            reason: format!("{} (body: {})", e, String::from_utf8_lossy(&body)),
        }
        .into(),
        RequestTokenError::Other(reason) => RedditApiError::AuthenticationFailed { reason }.into(),
    }
}
