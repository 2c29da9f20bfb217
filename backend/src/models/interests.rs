use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::time::Duration;
use uuid::Uuid;

/// The kind of a directional interest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestKind {
    Like,
    SuperLike,
    Pass,
}

impl InterestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterestKind::Like => "like",
            InterestKind::SuperLike => "super_like",
            InterestKind::Pass => "pass",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "like" => Some(InterestKind::Like),
            "super_like" => Some(InterestKind::SuperLike),
            "pass" => Some(InterestKind::Pass),
            _ => None,
        }
    }

    /// A pass is recorded but never counts toward mutuality.
    pub fn is_connection_request(&self) -> bool {
        !matches!(self, InterestKind::Pass)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Interest {
    pub id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub user_a: String,
    pub user_b: String,
    pub created_at: DateTime<Utc>,
}

/// Canonical representation of an unordered user pair: user_a < user_b.
pub fn canonical_pair<'a>(user_1: &'a str, user_2: &'a str) -> (&'a str, &'a str) {
    if user_1 < user_2 {
        (user_1, user_2)
    } else {
        (user_2, user_1)
    }
}

/// The action being charged against a user's rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitAction {
    Swipe,
    SendSuperLike,
}

impl RateLimitAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RateLimitAction::Swipe => "swipe",
            RateLimitAction::SendSuperLike => "send_super_like",
        }
    }
}

/// The oracle's answer to "may this user perform this action now".
#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: i64,
    pub retry_after: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [InterestKind::Like, InterestKind::SuperLike, InterestKind::Pass] {
            assert_eq!(InterestKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(InterestKind::from_str("dislike"), None);
    }

    #[test]
    fn test_canonical_pair_is_order_independent() {
        assert_eq!(canonical_pair("alice", "bob"), ("alice", "bob"));
        assert_eq!(canonical_pair("bob", "alice"), ("alice", "bob"));
    }
}
