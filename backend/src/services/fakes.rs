//! In-memory collaborators for exercising the coordination core without a
//! database or a live rate limit service.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{canonical_pair, InterestKind, Match, RateLimitAction, RateLimitDecision};
use crate::services::gateway::{InterestStore, StoreError};
use crate::services::notify::NotificationSink;
use crate::services::rate_limit::{OracleError, RateLimitOracle};

/// Decrements a failure budget. `u32::MAX` means "fail forever".
fn should_fail(counter: &AtomicU32) -> bool {
    let current = counter.load(Ordering::SeqCst);
    if current == 0 {
        return false;
    }
    if current != u32::MAX {
        counter.fetch_sub(1, Ordering::SeqCst);
    }
    true
}

pub struct FakeStore {
    interests: Mutex<HashSet<(String, String, String)>>,
    matches: Mutex<Vec<Match>>,
    exists_failures: AtomicU32,
    create_failures: AtomicU32,
    write_delay: Mutex<Option<Duration>>,
    /// Total gateway calls of any kind, for zero-network assertions.
    pub calls: AtomicU32,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            interests: Mutex::new(HashSet::new()),
            matches: Mutex::new(Vec::new()),
            exists_failures: AtomicU32::new(0),
            create_failures: AtomicU32::new(0),
            write_delay: Mutex::new(None),
            calls: AtomicU32::new(0),
        }
    }

    pub fn fail_exists(&self, times: u32) {
        self.exists_failures.store(times, Ordering::SeqCst);
    }

    pub fn fail_create(&self, times: u32) {
        self.create_failures.store(times, Ordering::SeqCst);
    }

    pub async fn set_write_delay(&self, delay: Duration) {
        *self.write_delay.lock().await = Some(delay);
    }

    pub async fn seed_interest(&self, from: &str, to: &str, kind: InterestKind) {
        self.interests
            .lock()
            .await
            .insert((from.to_string(), to.to_string(), kind.as_str().to_string()));
    }

    pub async fn interest_count(&self) -> usize {
        self.interests.lock().await.len()
    }

    pub async fn has_interest(&self, from: &str, to: &str, kind: InterestKind) -> bool {
        self.interests.lock().await.contains(&(
            from.to_string(),
            to.to_string(),
            kind.as_str().to_string(),
        ))
    }

    pub async fn match_count(&self) -> usize {
        self.matches.lock().await.len()
    }

    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InterestStore for FakeStore {
    async fn create_interest(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        kind: InterestKind,
    ) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.write_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if should_fail(&self.create_failures) {
            return Err(StoreError::Unavailable("injected write failure".into()));
        }

        self.interests.lock().await.insert((
            from_user_id.to_string(),
            to_user_id.to_string(),
            kind.as_str().to_string(),
        ));
        Ok(())
    }

    async fn interest_exists(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<bool, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if should_fail(&self.exists_failures) {
            return Err(StoreError::Unavailable("injected read failure".into()));
        }

        let interests = self.interests.lock().await;
        let exists = [InterestKind::Like, InterestKind::SuperLike]
            .iter()
            .any(|kind| {
                interests.contains(&(
                    from_user_id.to_string(),
                    to_user_id.to_string(),
                    kind.as_str().to_string(),
                ))
            });
        Ok(exists)
    }

    async fn delete_interest(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<(), StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut interests = self.interests.lock().await;
        for kind in [InterestKind::Like, InterestKind::SuperLike] {
            interests.remove(&(
                from_user_id.to_string(),
                to_user_id.to_string(),
                kind.as_str().to_string(),
            ));
        }
        Ok(())
    }

    async fn find_match(&self, user_1: &str, user_2: &str) -> Result<Option<Match>, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (user_a, user_b) = canonical_pair(user_1, user_2);
        let matches = self.matches.lock().await;
        Ok(matches
            .iter()
            .find(|m| m.user_a == user_a && m.user_b == user_b)
            .cloned())
    }

    async fn create_match(&self, user_1: &str, user_2: &str) -> Result<Match, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let (user_a, user_b) = canonical_pair(user_1, user_2);
        let mut matches = self.matches.lock().await;
        if let Some(existing) = matches
            .iter()
            .find(|m| m.user_a == user_a && m.user_b == user_b)
        {
            return Ok(existing.clone());
        }

        let created = Match {
            id: Uuid::new_v4(),
            user_a: user_a.to_string(),
            user_b: user_b.to_string(),
            created_at: Utc::now(),
        };
        matches.push(created.clone());
        Ok(created)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum OracleMode {
    Allow,
    Deny { retry_after: Option<Duration> },
    Unavailable,
    Malformed,
}

pub struct FakeOracle {
    mode: std::sync::Mutex<OracleMode>,
}

impl FakeOracle {
    pub fn new(mode: OracleMode) -> Self {
        Self {
            mode: std::sync::Mutex::new(mode),
        }
    }
}

#[async_trait]
impl RateLimitOracle for FakeOracle {
    async fn check_rate_limit(
        &self,
        _user_id: &str,
        _action: RateLimitAction,
    ) -> Result<RateLimitDecision, OracleError> {
        let mode = *self.mode.lock().unwrap_or_else(|e| e.into_inner());
        match mode {
            OracleMode::Allow => Ok(RateLimitDecision {
                allowed: true,
                remaining: 10,
                retry_after: None,
            }),
            OracleMode::Deny { retry_after } => Ok(RateLimitDecision {
                allowed: false,
                remaining: 0,
                retry_after,
            }),
            OracleMode::Unavailable => Err(OracleError::Unavailable("injected outage".into())),
            OracleMode::Malformed => {
                Err(OracleError::Malformed("injected malformed response".into()))
            }
        }
    }
}

pub struct CollectingNotifier {
    events: std::sync::Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self {
            events: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .any(|e| e == event)
    }
}

impl NotificationSink for CollectingNotifier {
    fn interest_recorded(&self, from_user_id: &str, to_user_id: &str) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("interest_recorded:{}:{}", from_user_id, to_user_id));
    }

    fn match_created(&self, user_a: &str, user_b: &str) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("match_created:{}:{}", user_a, user_b));
    }

    fn operation_failed(&self, operation: &str, reason: &str) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(format!("operation_failed:{}:{}", operation, reason));
    }
}
