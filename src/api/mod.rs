//! API layer
//!
//! HTTP handlers for:
//! - Profiles and churches
//! - Testimonies
//! - Direct messages
//! - Social graph and moderation
//! - Admin dashboard
//! - Metrics (Prometheus)

mod admin;
mod dto;
mod messages;
pub mod metrics;
mod profiles;
mod social;
mod testimonies;

pub use dto::*;

pub use admin::admin_router;
pub use messages::messages_router;
pub use metrics::metrics_router;
pub use profiles::profiles_router;
pub use social::{moderation_router, social_router};
pub use testimonies::testimonies_router;

const DEFAULT_PAGE_LIMIT: usize = 20;
const MAX_PAGE_LIMIT: usize = 100;

/// Clamp a client-supplied page limit to sane bounds.
pub(crate) fn clamp_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}
