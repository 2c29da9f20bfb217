// =============================================================================
// Mutual Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

// =============================================================================
// RETRY / BACKOFF
// =============================================================================

/// Base backoff delay in seconds (first retry waits roughly this long)
pub const BACKOFF_BASE_SECS: f64 = 0.5;

/// Ceiling on any single backoff delay in seconds
pub const BACKOFF_CAP_SECS: f64 = 4.0;

/// Jitter drawn uniformly from [0, BACKOFF_JITTER_FRACTION * base] per delay
pub const BACKOFF_JITTER_FRACTION: f64 = 0.3;

/// Maximum retries for a network-facing store call
pub const MAX_RETRIES: u32 = 3;

/// Timeout for a single store call in seconds (a timeout is retryable)
pub const STORE_CALL_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// RECONCILIATION
// =============================================================================

/// How long to wait before the deferred mutuality re-check
pub const RECONCILE_DELAY_SECS: u64 = 5;

// =============================================================================
// RATE LIMITING
// =============================================================================

/// Rate limit oracle request timeout in seconds
pub const ORACLE_REQUEST_TIMEOUT_SECS: u64 = 2;

/// Local fallback limit: actions per user per window when the oracle is down
pub const LOCAL_FALLBACK_ACTIONS_PER_WINDOW: u32 = 30;

/// Rate limit window duration in seconds
pub const RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

// =============================================================================
// IDENTIFIER VALIDATION
// =============================================================================

/// Maximum accepted length for a user id
pub const MAX_USER_ID_LENGTH: usize = 128;

// =============================================================================
// HELPER FUNCTIONS FOR VALIDATION
// =============================================================================

/// Validates that a user id is non-empty and within length bounds
pub fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty() && user_id.len() <= MAX_USER_ID_LENGTH
}
