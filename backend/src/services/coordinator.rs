use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::{is_valid_user_id, STORE_CALL_TIMEOUT_SECS};
use crate::models::{InterestKind, RateLimitAction};
use crate::services::gateway::{InterestStore, StoreError};
use crate::services::notify::NotificationSink;
use crate::services::rate_limit::{LocalRateLimiter, OracleError, RateLimitOracle};
use crate::services::reconciler::MatchReconciler;
use crate::services::retry::RetryPolicy;

/// Caller-facing failure taxonomy for connect/pass/remove operations.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded { retry_after: Option<Duration> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectOutcome {
    pub is_match: bool,
}

/// Drives a single connect/pass/remove operation end to end.
///
/// All collaborators are injected so tests can substitute in-memory fakes.
/// The only shared mutable state is the in-flight set of ordered pair keys,
/// which exists to absorb rapid repeated taps on the same button; the real
/// idempotency lives in the gateway.
#[derive(Clone)]
pub struct ConnectionCoordinator {
    store: Arc<dyn InterestStore>,
    oracle: Arc<dyn RateLimitOracle>,
    local_limiter: Arc<LocalRateLimiter>,
    notifier: Arc<dyn NotificationSink>,
    reconciler: MatchReconciler,
    retry: RetryPolicy,
    store_timeout: Duration,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Removes the operation key when the operation ends, whichever way it ends.
struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl InFlightGuard {
    fn acquire(set: &Arc<Mutex<HashSet<String>>>, key: String) -> Option<Self> {
        let mut in_flight = set.lock().unwrap_or_else(|e| e.into_inner());
        if in_flight.insert(key.clone()) {
            Some(Self {
                set: Arc::clone(set),
                key,
            })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.set.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.key);
    }
}

impl ConnectionCoordinator {
    pub fn new(
        store: Arc<dyn InterestStore>,
        oracle: Arc<dyn RateLimitOracle>,
        local_limiter: Arc<LocalRateLimiter>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        let reconciler = MatchReconciler::new(Arc::clone(&store), Arc::clone(&notifier));
        Self {
            store,
            oracle,
            local_limiter,
            notifier,
            reconciler,
            retry: RetryPolicy::default(),
            store_timeout: Duration::from_secs(STORE_CALL_TIMEOUT_SECS),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Records `from`'s interest in `to` and reports whether the pair is now
    /// a match.
    ///
    /// The interest write is the user-visible action: its failure fails the
    /// whole call. The mutuality check is not; if it cannot complete, the
    /// call still succeeds with `is_match: false` and a deferred re-check is
    /// scheduled.
    pub async fn connect(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        is_super_connect: bool,
    ) -> Result<ConnectOutcome, ConnectError> {
        validate_pair(from_user_id, to_user_id)?;

        let key = format!("{}_{}", from_user_id, to_user_id);
        let _guard = InFlightGuard::acquire(&self.in_flight, key).ok_or_else(|| {
            ConnectError::InvalidOperation("connection request already in progress".into())
        })?;

        let action = if is_super_connect {
            RateLimitAction::SendSuperLike
        } else {
            RateLimitAction::Swipe
        };
        self.enforce_rate_limit(from_user_id, action).await?;

        let kind = if is_super_connect {
            InterestKind::SuperLike
        } else {
            InterestKind::Like
        };
        self.write_interest_with_retry(from_user_id, to_user_id, kind)
            .await
            .map_err(|e| {
                self.notifier.operation_failed("connect", &e.to_string());
                e
            })?;
        self.notifier.interest_recorded(from_user_id, to_user_id);

        // Mutuality: has the target already expressed interest back?
        match self.mutuality_with_retry(to_user_id, from_user_id).await {
            Ok(false) => Ok(ConnectOutcome { is_match: false }),
            Ok(true) => match self.bounded(self.store.create_match(from_user_id, to_user_id)).await
            {
                Ok(created) => {
                    info!(
                        "👫 Mutual interest confirmed: match {} for {} <-> {}",
                        created.id, created.user_a, created.user_b
                    );
                    self.notifier.match_created(&created.user_a, &created.user_b);
                    Ok(ConnectOutcome { is_match: true })
                }
                Err(e) => {
                    // The interest itself is durable, so stay conservative:
                    // report no match yet and let the re-check finish the job.
                    warn!(
                        "Match creation for {} <-> {} failed ({}), scheduling reconciliation",
                        from_user_id, to_user_id, e
                    );
                    let _handle = self.reconciler.schedule(from_user_id, to_user_id);
                    Ok(ConnectOutcome { is_match: false })
                }
            },
            Err(e) => {
                warn!(
                    "Mutuality check for {} -> {} failed after retries ({}), scheduling reconciliation",
                    from_user_id, to_user_id, e
                );
                let _handle = self.reconciler.schedule(from_user_id, to_user_id);
                Ok(ConnectOutcome { is_match: false })
            }
        }
    }

    /// Records a pass. Same rate-limit step as a swipe, single non-retried
    /// write, failures surface directly.
    pub async fn pass(&self, from_user_id: &str, to_user_id: &str) -> Result<(), ConnectError> {
        validate_pair(from_user_id, to_user_id)?;

        self.enforce_rate_limit(from_user_id, RateLimitAction::Swipe)
            .await?;

        self.bounded(
            self.store
                .create_interest(from_user_id, to_user_id, InterestKind::Pass),
        )
        .await
        .map_err(|e| {
            self.notifier.operation_failed("pass", &e.to_string());
            ConnectError::from(e)
        })?;

        self.notifier.interest_recorded(from_user_id, to_user_id);
        Ok(())
    }

    /// Withdraws a previously sent connection request. No rate limiting.
    pub async fn remove_connection_request(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<(), ConnectError> {
        validate_pair(from_user_id, to_user_id)?;

        self.bounded(self.store.delete_interest(from_user_id, to_user_id))
            .await
            .map_err(|e| {
                warn!(
                    "Failed to remove connection request {} -> {}: {}",
                    from_user_id, to_user_id, e
                );
                self.notifier
                    .operation_failed("remove_connection_request", &e.to_string());
                ConnectError::from(e)
            })?;

        Ok(())
    }

    /// Whether `from` has a live connection request toward `to`. Plain
    /// read-through; the gateway's own resilience is all it gets.
    pub async fn has_interest_from(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<bool, ConnectError> {
        validate_pair(from_user_id, to_user_id)?;

        let exists = self.store.interest_exists(from_user_id, to_user_id).await?;
        Ok(exists)
    }

    /// Oracle denial is authoritative and blocking; oracle unavailability is
    /// not. When the oracle cannot be reached the local counter substitutes,
    /// and anything else unexpected is logged and waved through.
    async fn enforce_rate_limit(
        &self,
        user_id: &str,
        action: RateLimitAction,
    ) -> Result<(), ConnectError> {
        match self.oracle.check_rate_limit(user_id, action).await {
            Ok(decision) if decision.allowed => Ok(()),
            Ok(decision) => Err(ConnectError::RateLimitExceeded {
                retry_after: decision.retry_after,
            }),
            Err(OracleError::Unavailable(reason)) => {
                warn!(
                    "Rate limit oracle unreachable ({}), using local fallback counter",
                    reason
                );
                if self.local_limiter.can_perform_action(user_id).await {
                    Ok(())
                } else {
                    Err(ConnectError::RateLimitExceeded { retry_after: None })
                }
            }
            Err(OracleError::Malformed(reason)) => {
                warn!("Ignoring unusable rate limit response: {}", reason);
                Ok(())
            }
        }
    }

    async fn write_interest_with_retry(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        kind: InterestKind,
    ) -> Result<(), StoreError> {
        let mut attempt = 0;
        loop {
            match self
                .bounded(self.store.create_interest(from_user_id, to_user_id, kind))
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    warn!(
                        "Interest write {} -> {} attempt {} failed ({}), retrying",
                        from_user_id,
                        to_user_id,
                        attempt + 1,
                        e
                    );
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn mutuality_with_retry(
        &self,
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<bool, StoreError> {
        let mut attempt = 0;
        loop {
            match self
                .bounded(self.store.interest_exists(from_user_id, to_user_id))
                .await
            {
                Ok(exists) => return Ok(exists),
                Err(e) if e.is_retryable() && attempt < self.retry.max_retries => {
                    warn!(
                        "Mutuality check {} -> {} attempt {} failed ({}), retrying",
                        from_user_id,
                        to_user_id,
                        attempt + 1,
                        e
                    );
                    tokio::time::sleep(self.retry.delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout),
        }
    }
}

fn validate_pair(from_user_id: &str, to_user_id: &str) -> Result<(), ConnectError> {
    if !is_valid_user_id(from_user_id) || !is_valid_user_id(to_user_id) {
        return Err(ConnectError::InvalidInput(
            "user ids must be non-empty".into(),
        ));
    }
    if from_user_id == to_user_id {
        return Err(ConnectError::InvalidOperation(
            "cannot connect with self".into(),
        ));
    }
    Ok(())
}
