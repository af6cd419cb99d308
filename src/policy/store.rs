//! Relationship lookup interface for the policy engine
//!
//! The engine never talks to the database directly; it sees only this
//! trait. Production wires in [`crate::data::Database`], tests wire in
//! a mock.

use crate::error::AppError;

/// Privacy-relevant fields of a user row.
///
/// Flags are carried as stored TEXT; the engine parses them and denies
/// on anything unrecognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPrivacy {
    pub profile_visibility: String,
    pub message_privacy: String,
    pub church_id: Option<String>,
}

/// Policy-relevant fields of a testimony row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestimonyRecord {
    pub owner_id: String,
    pub visibility: String,
}

/// Injected data access for policy decisions
///
/// All methods are read-only. Pair lookups (friendship, block) must
/// hold for both orderings of the pair.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PolicyStore: Send + Sync {
    /// Load a user's privacy flags and church, or None if the user
    /// does not exist.
    async fn load_privacy(&self, user_id: &str) -> Result<Option<UserPrivacy>, AppError>;

    /// Load a testimony's owner and visibility, or None if missing.
    async fn load_testimony(&self, testimony_id: &str)
    -> Result<Option<TestimonyRecord>, AppError>;

    /// Whether an accepted friendship exists between two users,
    /// in either orientation.
    async fn accepted_friendship_exists(&self, a: &str, b: &str) -> Result<bool, AppError>;

    /// Whether `follower_id` follows `followee_id`.
    async fn follow_exists(&self, follower_id: &str, followee_id: &str)
    -> Result<bool, AppError>;

    /// Whether a block exists between two users, in either direction.
    async fn block_exists_between(&self, a: &str, b: &str) -> Result<bool, AppError>;
}
