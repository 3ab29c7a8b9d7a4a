use crate::error::*;
use std::time::Duration;
use tracing::{error, warn};

/// Coarse error classes the collection loop attaches policy to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rate limits, 5xx responses, timeouts. Retried with backoff.
    TransientRemote,
    /// Auth failures, forbidden, bad queries. Logged, step aborted.
    NonTransientRemote,
    /// Local file or parse problems. State is reset, the run continues.
    LocalIo,
    /// Bad settings, missing keyword file or credentials. Fatal at startup.
    Configuration,
}

pub trait ErrorExt {
    fn kind(&self) -> ErrorKind;
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn retry_after(&self) -> Option<Duration>;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;

    fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientRemote
    }
}

impl ErrorExt for CoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            CoreError::RedditApi(e) => e.kind(),
            CoreError::Storage(e) => e.kind(),
            CoreError::Config(e) => e.kind(),
            CoreError::Io(_) | CoreError::Serialization(_) => ErrorKind::LocalIo,
            CoreError::Network(e) => {
                if e.is_timeout() || e.is_connect() {
                    ErrorKind::TransientRemote
                } else {
                    ErrorKind::NonTransientRemote
                }
            }
            CoreError::InvalidInput { .. } => ErrorKind::Configuration,
            // Already retried to exhaustion; do not retry again.
            CoreError::RetriesExhausted { .. } => ErrorKind::NonTransientRemote,
            CoreError::Internal { .. } => ErrorKind::NonTransientRemote,
        }
    }

    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::RedditApi(e) => {
                error!("Reddit API error details: {:?}", e);
            }
            CoreError::Storage(e) => {
                error!("Storage error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            CoreError::RedditApi(e) => e.retry_after(),
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::RedditApi(e) => e.user_friendly_message(),
            CoreError::Storage(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { message } => format!("Invalid input: {}", message),
            CoreError::RetriesExhausted {
                operation,
                attempts,
                ..
            } => format!(
                "{} kept failing after {} attempts. Rerun later or raise --sleep / --max-retries.",
                operation, attempts
            ),
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::RedditApi(_) => "REDDIT_API".to_string(),
            CoreError::Storage(_) => "STORAGE".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::RetriesExhausted { .. } => "RETRIES_EXHAUSTED".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for RedditApiError {
    fn kind(&self) -> ErrorKind {
        match self {
            RedditApiError::RateLimitExceeded { .. }
            | RedditApiError::RequestTimeout
            | RedditApiError::ServerError { .. } => ErrorKind::TransientRemote,
            RedditApiError::AuthenticationFailed { .. }
            | RedditApiError::InvalidToken
            | RedditApiError::Forbidden { .. }
            | RedditApiError::NotFound { .. }
            | RedditApiError::BadRequest { .. }
            | RedditApiError::InvalidResponse { .. } => ErrorKind::NonTransientRemote,
        }
    }

    fn log_error(&self) -> &Self {
        error!("RedditApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("RedditApiError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            RedditApiError::RateLimitExceeded { retry_after } => {
                Some(Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => {
                "Reddit authentication failed. Check CLIENT_ID/CLIENT_SECRET and that the app type is 'script'.".to_string()
            }
            RedditApiError::RateLimitExceeded { retry_after } => format!(
                "Too many requests. Please wait {} seconds before trying again.",
                retry_after
            ),
            RedditApiError::Forbidden { resource } => format!(
                "Access denied to {}. The subreddit may be private or banned.",
                resource
            ),
            RedditApiError::NotFound { resource } => {
                format!("{} not found. Check the subreddit name.", resource)
            }
            RedditApiError::InvalidToken => {
                "Reddit authentication token is invalid. Please re-authenticate.".to_string()
            }
            RedditApiError::RequestTimeout => {
                "Request to Reddit timed out. Please try again.".to_string()
            }
            _ => "Reddit API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            RedditApiError::AuthenticationFailed { .. } => "REDDIT_AUTH_FAILED".to_string(),
            RedditApiError::RateLimitExceeded { .. } => "REDDIT_RATE_LIMIT".to_string(),
            RedditApiError::Forbidden { .. } => "REDDIT_FORBIDDEN".to_string(),
            RedditApiError::NotFound { .. } => "REDDIT_NOT_FOUND".to_string(),
            RedditApiError::InvalidToken => "REDDIT_INVALID_TOKEN".to_string(),
            RedditApiError::BadRequest { .. } => "REDDIT_BAD_REQUEST".to_string(),
            RedditApiError::RequestTimeout => "REDDIT_TIMEOUT".to_string(),
            RedditApiError::InvalidResponse { .. } => "REDDIT_INVALID_RESPONSE".to_string(),
            RedditApiError::ServerError { .. } => "REDDIT_SERVER_ERROR".to_string(),
        }
    }
}

impl ErrorExt for StorageError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::LocalIo
    }

    fn log_error(&self) -> &Self {
        error!("StorageError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StorageError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            StorageError::Write { path, .. } => format!(
                "Cannot write to {}. Choose a writable directory with --results.",
                path.display()
            ),
            StorageError::Read { path, .. } => format!("Cannot read {}.", path.display()),
            StorageError::Corrupt { path, .. } => {
                format!("{} is corrupt and was reset.", path.display())
            }
            StorageError::Csv(_) => "Failed to write CSV output.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            StorageError::Read { .. } => "STORAGE_READ".to_string(),
            StorageError::Write { .. } => "STORAGE_WRITE".to_string(),
            StorageError::Corrupt { .. } => "STORAGE_CORRUPT".to_string(),
            StorageError::Csv(_) => "STORAGE_CSV".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }

    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file not found at {}.", path)
            }
            ConfigError::KeywordsNotFound { path } => format!(
                "Keywords file not found at {}. Create it or pass --keywords <path>.",
                path
            ),
            ConfigError::Unreadable { path, reason } => {
                format!("Could not read {}: {}", path, reason)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for '{}'.", value, field)
            }
            ConfigError::MissingEnvironmentVariable { var_name } => format!(
                "Environment variable '{}' is required but not set. Set it or use --dotenv.",
                var_name
            ),
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::KeywordsNotFound { .. } => "CONFIG_KEYWORDS_NOT_FOUND".to_string(),
            ConfigError::Unreadable { .. } => "CONFIG_UNREADABLE".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::MissingEnvironmentVariable { .. } => "CONFIG_MISSING_ENV_VAR".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}
