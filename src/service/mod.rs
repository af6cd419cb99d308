//! Service layer
//!
//! Business logic between the API handlers and the data layer. Reads
//! and actions that the policy governs go through the policy engine
//! here, never directly against the database.

mod message;
mod moderation;
mod profile;
mod social;
mod testimony;

pub use message::{ConversationSummary, MessageService};
pub use moderation::ModerationService;
pub use profile::ProfileService;
pub use social::{Relationship, SocialService};
pub use testimony::TestimonyService;
