//! Data models
//!
//! Rust structs representing database entities.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// User
// =============================================================================

/// A registered member
///
/// Privacy flags are stored as TEXT and parsed into the typed enums
/// below at the policy boundary. Unknown stored values deny.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    /// Bio text (sanitized HTML)
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    /// Profile visibility: public, private
    pub profile_visibility: String,
    /// Message privacy: everyone, friends, none
    pub message_privacy: String,
    /// Church membership (optional)
    pub church_id: Option<String>,
    /// Salted password hash
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Profile visibility levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileVisibility {
    Public,
    Private,
}

impl ProfileVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Parse a stored value. Unknown values return None (callers deny).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Who may send direct messages to a user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePrivacy {
    Everyone,
    Friends,
    None,
}

impl MessagePrivacy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::Friends => "friends",
            Self::None => "none",
        }
    }

    /// Parse a stored value. Unknown values return None (callers deny).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "everyone" => Some(Self::Everyone),
            "friends" => Some(Self::Friends),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

// =============================================================================
// Church
// =============================================================================

/// A named community that scopes visibility tiers
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Church {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Testimony
// =============================================================================

/// A user's authored personal faith narrative
///
/// Belongs to exactly one user. The visibility tier controls the
/// audience; tiers widen monotonically:
/// my_church < all_churches < shareable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Testimony {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Sanitized HTML content
    pub content: String,
    /// Visibility: my_church, all_churches, shareable
    pub visibility: String,
    /// true if drafted by the generation API
    pub generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Testimony visibility tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestimonyVisibility {
    /// Same church only
    MyChurch,
    /// Same church, friends, or followers
    AllChurches,
    /// Public
    Shareable,
}

impl TestimonyVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MyChurch => "my_church",
            Self::AllChurches => "all_churches",
            Self::Shareable => "shareable",
        }
    }

    /// Parse a stored value. Unknown values return None (callers deny).
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "my_church" => Some(Self::MyChurch),
            "all_churches" => Some(Self::AllChurches),
            "shareable" => Some(Self::Shareable),
            _ => None,
        }
    }
}

// =============================================================================
// Relationships
// =============================================================================

/// A mutual, approval-gated relationship between two users
///
/// One row per unordered pair; symmetric once accepted. Lookups must
/// check both orderings of (requester, addressee).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Friendship {
    pub id: String,
    /// User who sent the request
    pub requester_id: String,
    /// User who received the request
    pub addressee_id: String,
    /// Status: pending, accepted
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Friendship states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }
}

/// A one-directional, unapproved relationship (follower -> followee)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub followee_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Messages
// =============================================================================

/// A direct message between two users
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    /// Whether the recipient has seen this
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Moderation
// =============================================================================

/// A directed block (blocker -> blocked)
///
/// A block in either direction denies messaging between the pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Block {
    pub id: String,
    pub blocker_id: String,
    pub blocked_id: String,
    pub created_at: DateTime<Utc>,
}

/// A moderation report filed against a user or a testimony
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub subject_user_id: String,
    /// Reported testimony, if the report targets one
    pub testimony_id: Option<String>,
    pub reason: String,
    /// Status: open, resolved, dismissed
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Report lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Open,
    Resolved,
    Dismissed,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::Dismissed => "dismissed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "dismissed" => Some(Self::Dismissed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_tiers_widen_monotonically() {
        assert!(TestimonyVisibility::MyChurch < TestimonyVisibility::AllChurches);
        assert!(TestimonyVisibility::AllChurches < TestimonyVisibility::Shareable);
    }

    #[test]
    fn enum_round_trips() {
        for tier in [
            TestimonyVisibility::MyChurch,
            TestimonyVisibility::AllChurches,
            TestimonyVisibility::Shareable,
        ] {
            assert_eq!(TestimonyVisibility::parse(tier.as_str()), Some(tier));
        }
        assert_eq!(TestimonyVisibility::parse("secret"), None);

        for privacy in [
            MessagePrivacy::Everyone,
            MessagePrivacy::Friends,
            MessagePrivacy::None,
        ] {
            assert_eq!(MessagePrivacy::parse(privacy.as_str()), Some(privacy));
        }
        assert_eq!(MessagePrivacy::parse("mutuals"), None);
    }
}
