pub mod gateway;
pub mod retry;
pub mod rate_limit;
pub mod notify;
pub mod reconciler;
pub mod coordinator;

#[cfg(test)]
pub(crate) mod fakes;

pub use coordinator::{ConnectError, ConnectOutcome, ConnectionCoordinator};
pub use gateway::{InterestStore, StoreError};
pub use rate_limit::{HttpRateLimitOracle, LocalRateLimiter, OracleError, RateLimitOracle};
pub use retry::RetryPolicy;
