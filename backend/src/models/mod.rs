pub mod interests;

pub use interests::{canonical_pair, Interest, InterestKind, Match, RateLimitAction, RateLimitDecision};
