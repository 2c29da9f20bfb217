use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::constants::{ORACLE_REQUEST_TIMEOUT_SECS, RATE_LIMIT_WINDOW_SECONDS};
use crate::models::{RateLimitAction, RateLimitDecision};

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The oracle could not be reached at all; the caller should fall back
    /// to the local counter.
    #[error("rate limit oracle unreachable: {0}")]
    Unavailable(String),

    /// The oracle answered but the answer made no sense. Denial must come
    /// from a well-formed response, so callers treat this as non-blocking.
    #[error("rate limit oracle returned a malformed response: {0}")]
    Malformed(String),
}

/// External authority on whether a user may perform an action right now.
#[async_trait]
pub trait RateLimitOracle: Send + Sync {
    async fn check_rate_limit(
        &self,
        user_id: &str,
        action: RateLimitAction,
    ) -> Result<RateLimitDecision, OracleError>;
}

#[derive(Debug, Deserialize)]
struct OracleResponse {
    allowed: bool,
    #[serde(default)]
    remaining: i64,
    #[serde(default)]
    retry_after_secs: Option<u64>,
}

/// HTTP client for the rate limit service.
#[derive(Debug, Clone)]
pub struct HttpRateLimitOracle {
    client: Client,
    base_url: String,
}

impl HttpRateLimitOracle {
    pub fn new(base_url: String) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(ORACLE_REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl RateLimitOracle for HttpRateLimitOracle {
    async fn check_rate_limit(
        &self,
        user_id: &str,
        action: RateLimitAction,
    ) -> Result<RateLimitDecision, OracleError> {
        let url = format!("{}/check", self.base_url);
        let body = json!({
            "user_id": user_id,
            "action": action.as_str(),
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(OracleError::Unavailable(format!("oracle returned {}", status)));
        }
        if !status.is_success() {
            return Err(OracleError::Malformed(format!("oracle returned {}", status)));
        }

        let parsed: OracleResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        Ok(RateLimitDecision {
            allowed: parsed.allowed,
            remaining: parsed.remaining,
            retry_after: parsed.retry_after_secs.map(Duration::from_secs),
        })
    }
}

// Sliding-window request log per user
#[derive(Debug)]
struct SlidingWindow {
    requests: HashMap<String, Vec<Instant>>,
    max_per_window: u32,
}

impl SlidingWindow {
    fn new(max_per_window: u32) -> Self {
        Self {
            requests: HashMap::new(),
            max_per_window,
        }
    }

    fn can_make_request(&mut self, key: &str) -> bool {
        let now = Instant::now();
        let requests = self.requests.entry(key.to_string()).or_default();

        // Remove old requests
        if let Some(window_start) = now.checked_sub(Duration::from_secs(RATE_LIMIT_WINDOW_SECONDS))
        {
            requests.retain(|&time| time > window_start);
        }

        if requests.len() < self.max_per_window as usize {
            requests.push(now);
            true
        } else {
            false
        }
    }
}

/// Client-side substitute check, consulted only when the oracle is
/// unreachable. Deliberately coarser than the oracle: one counter per user,
/// no per-action buckets.
#[derive(Debug, Clone)]
pub struct LocalRateLimiter {
    window: Arc<Mutex<SlidingWindow>>,
}

impl LocalRateLimiter {
    pub fn new(max_per_window: u32) -> Self {
        Self {
            window: Arc::new(Mutex::new(SlidingWindow::new(max_per_window))),
        }
    }

    pub async fn can_perform_action(&self, user_id: &str) -> bool {
        let mut window = self.window.lock().await;
        window.can_make_request(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_limiter_denies_after_limit() {
        let limiter = LocalRateLimiter::new(3);

        for _ in 0..3 {
            assert!(limiter.can_perform_action("alice").await);
        }
        assert!(!limiter.can_perform_action("alice").await);

        // Other users have their own window
        assert!(limiter.can_perform_action("bob").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_limiter_window_slides() {
        let limiter = LocalRateLimiter::new(2);

        assert!(limiter.can_perform_action("alice").await);
        assert!(limiter.can_perform_action("alice").await);
        assert!(!limiter.can_perform_action("alice").await);

        tokio::time::advance(Duration::from_secs(RATE_LIMIT_WINDOW_SECONDS + 1)).await;

        assert!(limiter.can_perform_action("alice").await);
    }
}
