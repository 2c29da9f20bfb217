use async_trait::async_trait;
use thiserror::Error;

use crate::models::{InterestKind, Match};

/// Failure taxonomy for the persistence gateway. Only transient
/// availability problems are retryable; everything else surfaces as-is.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call timed out")]
    Timeout,

    #[error("permanent store failure: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::PoolClosed => StoreError::Unavailable("connection pool closed".into()),
            other => StoreError::Permanent(other.to_string()),
        }
    }
}

/// Persistence gateway for interest and match records.
///
/// Implementations must make `create_interest` idempotent on
/// (from, to, kind) and `create_match` idempotent on the unordered pair;
/// the coordinator relies on both to stay correct when the same operation
/// is replayed or raced from the other side.
#[async_trait]
pub trait InterestStore: Send + Sync {
    async fn create_interest(
        &self,
        from_user_id: &str,
        to_user_id: &str,
        kind: InterestKind,
    ) -> Result<(), StoreError>;

    /// Whether `from` currently has a connection request (like/super-like)
    /// recorded toward `to`. Pass records do not count.
    async fn interest_exists(&self, from_user_id: &str, to_user_id: &str)
        -> Result<bool, StoreError>;

    /// Removes any connection request from `from` toward `to`. Pass
    /// records are left alone.
    async fn delete_interest(&self, from_user_id: &str, to_user_id: &str)
        -> Result<(), StoreError>;

    async fn find_match(&self, user_1: &str, user_2: &str) -> Result<Option<Match>, StoreError>;

    /// Creates the match for the unordered pair, returning the existing
    /// record if one is already there.
    async fn create_match(&self, user_1: &str, user_2: &str) -> Result<Match, StoreError>;
}
