//! Run settings and Reddit credentials.
//!
//! Settings come from built-in defaults, optionally overlaid by a TOML file;
//! the binary applies CLI flags on top. Credentials only ever come from the
//! environment.

use crate::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "harvester";
pub const DEFAULT_SUBREDDIT: &str = "VeteransBenefits";
pub const DEFAULT_KEYWORDS_FILE: &str = "keywords.txt";
pub const DEFAULT_RESULTS_DIR: &str = "results";
pub const DEFAULT_SUMMARY_CSV: &str = "summary_log.csv";
pub const DEFAULT_SEEN_IDS_FILE: &str = "seen_ids.json";
pub const DEFAULT_SEARCH_LIMIT: u32 = 500;
pub const DEFAULT_HOT_WINDOW: u32 = 200;
pub const DEFAULT_SLEEP_SECS: u64 = 3;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_CHECKPOINT_EVERY: usize = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub subreddit: String,
    pub keywords: PathBuf,
    pub results_dir: PathBuf,
    pub summary_csv: PathBuf,
    pub seen_ids: PathBuf,
    /// Cap on exact-phrase search results per keyword.
    pub search_limit: u32,
    /// Number of hot posts scanned for matching comments.
    pub hot_window: u32,
    /// Seconds between keywords, also the retry backoff unit.
    pub sleep_secs: u64,
    pub max_retries: u32,
    pub include_comments: bool,
    /// Persist the seen-id set every N keywords.
    pub checkpoint_every: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            subreddit: DEFAULT_SUBREDDIT.to_string(),
            keywords: PathBuf::from(DEFAULT_KEYWORDS_FILE),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            summary_csv: PathBuf::from(DEFAULT_SUMMARY_CSV),
            seen_ids: PathBuf::from(DEFAULT_SEEN_IDS_FILE),
            search_limit: DEFAULT_SEARCH_LIMIT,
            hot_window: DEFAULT_HOT_WINDOW,
            sleep_secs: DEFAULT_SLEEP_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            include_comments: true,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
        }
    }
}

impl Settings {
    /// Reads settings from a TOML file. Keys that are absent keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subreddit.trim().is_empty() {
            return Err(invalid("subreddit", &self.subreddit));
        }
        if self.max_retries == 0 {
            return Err(invalid("max_retries", "0"));
        }
        if self.checkpoint_every == 0 {
            return Err(invalid("checkpoint_every", "0"));
        }
        if self.search_limit == 0 {
            return Err(invalid("search_limit", "0"));
        }
        Ok(())
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.sleep_secs)
    }
}

fn invalid(field: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

/// Reads one keyword per line, trimming whitespace and skipping blank lines.
pub fn load_keywords(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::KeywordsNotFound {
            path: path.display().to_string(),
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(parse_keywords(&raw))
}

pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reddit "script" app credentials.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
    /// Username and password, for the password grant. Read-only otherwise.
    pub login: Option<(String, String)>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("username", &self.login.as_ref().map(|(user, _)| user))
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds credentials from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            get(key).ok_or_else(|| ConfigError::MissingEnvironmentVariable {
                var_name: key.to_string(),
            })
        };

        let client_id = required("CLIENT_ID")?;
        let client_secret = required("CLIENT_SECRET")?;
        let user_agent = get("USER_AGENT").unwrap_or_else(|| {
            format!("{} by u/your_username (contact: email)", APP_NAME)
        });
        let login = match (get("REDDIT_USERNAME"), get("REDDIT_PASSWORD")) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        };

        Ok(Self {
            client_id,
            client_secret,
            user_agent,
            login,
        })
    }

    pub fn is_read_only(&self) -> bool {
        self.login.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.search_limit, 500);
        assert_eq!(settings.hot_window, 200);
        assert_eq!(settings.checkpoint_every, 3);
        assert!(settings.include_comments);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            subreddit = "Veterans"
            hot_window = 50
            include_comments = false
            "#,
        )
        .unwrap();
        assert_eq!(settings.subreddit, "Veterans");
        assert_eq!(settings.hot_window, 50);
        assert!(!settings.include_comments);
        assert_eq!(settings.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(settings.results_dir, PathBuf::from("results"));
    }

    #[test]
    fn test_unknown_toml_key_is_rejected() {
        let result = Settings::from_toml_str("subredit = \"typo\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let settings = Settings {
            max_retries: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "max_retries"
        ));
    }

    #[test]
    fn test_parse_keywords_skips_blank_lines() {
        let keywords = parse_keywords("service connected\n\n  denied claim  \r\nC&P exam\n   \n");
        assert_eq!(keywords, vec!["service connected", "denied claim", "C&P exam"]);
    }

    #[test]
    fn test_load_keywords_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_keywords(&dir.path().join("nope.txt"));
        assert!(matches!(result, Err(ConfigError::KeywordsNotFound { .. })));
    }

    #[test]
    fn test_credentials_read_only_without_login() {
        let creds = Credentials::from_lookup(lookup(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("REDDIT_USERNAME", "someone"),
        ]))
        .unwrap();
        assert!(creds.is_read_only());
        assert!(creds.user_agent.starts_with("harvester"));
    }

    #[test]
    fn test_credentials_with_login() {
        let creds = Credentials::from_lookup(lookup(&[
            ("CLIENT_ID", "id"),
            ("CLIENT_SECRET", "secret"),
            ("USER_AGENT", "harvester/0.1 by u/tester"),
            ("REDDIT_USERNAME", "tester"),
            ("REDDIT_PASSWORD", "hunter2"),
        ]))
        .unwrap();
        assert_eq!(
            creds.login,
            Some(("tester".to_string(), "hunter2".to_string()))
        );
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_credentials_missing_secret() {
        let result = Credentials::from_lookup(lookup(&[("CLIENT_ID", "id"), ("CLIENT_SECRET", "")]));
        assert!(matches!(
            result,
            Err(ConfigError::MissingEnvironmentVariable { var_name }) if var_name == "CLIENT_SECRET"
        ));
    }
}
