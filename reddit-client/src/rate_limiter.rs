use reqwest::header::HeaderMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RESET_HEADER: &str = "x-ratelimit-reset";

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    /// Minimum spacing between consecutive requests.
    pub min_interval: Duration,
    /// Wait for the window reset once the remaining budget drops below this.
    pub low_watermark: f64,
}

impl RateLimitConfig {
    pub fn reddit_oauth() -> Self {
        Self {
            min_interval: Duration::from_millis(600), // Reddit allows 100 requests per minute for OAuth2
            low_watermark: 1.0,
        }
    }

    pub fn disabled() -> Self {
        Self {
            min_interval: Duration::ZERO,
            low_watermark: 0.0,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct LimiterState {
    last_request: Option<Instant>,
    remaining: Option<f64>,
    reset_at: Option<Instant>,
}

/// Paces a single sequential caller using a minimum request interval and the
/// budget Reddit reports in its `x-ratelimit-*` response headers.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateLimitConfig,
    state: Mutex<LimiterState>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitStatus {
    pub remaining: Option<f64>,
    pub resets_in: Option<Duration>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Sleeps until the next request may go out, then claims the slot.
    pub async fn acquire_permit(&self) {
        let mut state = self.state.lock().await;
        let wait = wait_time(&self.config, &state, Instant::now());
        if !wait.is_zero() {
            tracing::debug!("Rate limit pacing, waiting {:?}", wait);
            sleep(wait).await;
        }
        state.last_request = Some(Instant::now());
        if state.reset_at.is_some_and(|reset| reset <= Instant::now()) {
            state.remaining = None;
            state.reset_at = None;
        }
    }

    /// Records the budget reported by a response.
    pub async fn update_from_headers(&self, headers: &HeaderMap) {
        let remaining = header_f64(headers, REMAINING_HEADER);
        let reset = header_f64(headers, RESET_HEADER);
        if remaining.is_none() && reset.is_none() {
            return;
        }

        let mut state = self.state.lock().await;
        state.remaining = remaining;
        state.reset_at = reset
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(|secs| Instant::now() + Duration::from_secs_f64(secs));
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        let state = self.state.lock().await;
        let now = Instant::now();
        RateLimitStatus {
            remaining: state.remaining,
            resets_in: state.reset_at.map(|reset| reset.saturating_duration_since(now)),
        }
    }
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
}

fn wait_time(config: &RateLimitConfig, state: &LimiterState, now: Instant) -> Duration {
    let spacing = state
        .last_request
        .map(|last| config.min_interval.saturating_sub(now.saturating_duration_since(last)))
        .unwrap_or_default();

    let budget = match (state.remaining, state.reset_at) {
        (Some(remaining), Some(reset_at)) if remaining < config.low_watermark => {
            reset_at.saturating_duration_since(now)
        }
        _ => Duration::ZERO,
    };

    spacing.max(budget)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_first_request_does_not_wait() {
        let config = RateLimitConfig::reddit_oauth();
        let wait = wait_time(&config, &LimiterState::default(), Instant::now());
        assert_eq!(wait, Duration::ZERO);
    }

    #[test]
    fn test_min_interval_spacing() {
        let config = RateLimitConfig::reddit_oauth();
        let now = Instant::now();
        let state = LimiterState {
            last_request: Some(now),
            ..Default::default()
        };
        assert_eq!(wait_time(&config, &state, now), config.min_interval);

        let later = now + config.min_interval + Duration::from_millis(1);
        assert_eq!(wait_time(&config, &state, later), Duration::ZERO);
    }

    #[test]
    fn test_exhausted_budget_waits_for_reset() {
        let config = RateLimitConfig::reddit_oauth();
        let now = Instant::now();
        let state = LimiterState {
            last_request: None,
            remaining: Some(0.0),
            reset_at: Some(now + Duration::from_secs(42)),
        };
        assert_eq!(wait_time(&config, &state, now), Duration::from_secs(42));

        let healthy = LimiterState {
            remaining: Some(300.0),
            ..state
        };
        assert_eq!(wait_time(&config, &healthy, now), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_update_from_headers() {
        let limiter = RateLimiter::new(RateLimitConfig::reddit_oauth());
        let mut headers = HeaderMap::new();
        headers.insert(REMAINING_HEADER, HeaderValue::from_static("598.0"));
        headers.insert(RESET_HEADER, HeaderValue::from_static("120"));

        limiter.update_from_headers(&headers).await;

        let status = limiter.get_rate_limit_status().await;
        assert_eq!(status.remaining, Some(598.0));
        let resets_in = status.resets_in.unwrap();
        assert!(resets_in <= Duration::from_secs(120));
        assert!(resets_in > Duration::from_secs(110));
    }

    #[tokio::test]
    async fn test_disabled_limiter_never_waits() {
        let limiter = RateLimiter::new(RateLimitConfig::disabled());
        limiter.acquire_permit().await;
        let start = Instant::now();
        limiter.acquire_permit().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
