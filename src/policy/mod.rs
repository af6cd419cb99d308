//! Visibility & permission policy
//!
//! The authorization core: decision functions over an injected
//! relationship store, plus the per-action rate limiter.

mod engine;
mod rate_limit;
mod store;

pub use engine::{Decision, PolicyEngine};
pub use rate_limit::{RateLimitDecision, RateLimitRule, RateLimitStats, RateLimiter};
pub use store::{PolicyStore, TestimonyRecord, UserPrivacy};

#[cfg(test)]
pub use store::MockPolicyStore;
