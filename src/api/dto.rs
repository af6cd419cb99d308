//! API request and response types
//!
//! Response types never expose credential material; converters from the
//! data models strip it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Church, Friendship, Message, Report, Testimony, User};
use crate::service::{ConversationSummary, Relationship};

// =============================================================================
// Responses
// =============================================================================

/// Public view of a user
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub profile_visibility: String,
    pub message_privacy: String,
    pub church_id: Option<String>,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            profile_visibility: user.profile_visibility,
            message_privacy: user.message_privacy,
            church_id: user.church_id,
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChurchResponse {
    pub id: String,
    pub name: String,
}

impl From<Church> for ChurchResponse {
    fn from(church: Church) -> Self {
        Self {
            id: church.id,
            name: church.name,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestimonyResponse {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub content: String,
    pub visibility: String,
    pub generated: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Testimony> for TestimonyResponse {
    fn from(testimony: Testimony) -> Self {
        Self {
            id: testimony.id,
            user_id: testimony.user_id,
            title: testimony.title,
            content: testimony.content,
            visibility: testimony.visibility,
            generated: testimony.generated,
            created_at: testimony.created_at,
            updated_at: testimony.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            recipient_id: message.recipient_id,
            body: message.body,
            read: message.read,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub partner_id: String,
    pub last_message: MessageResponse,
    pub unread: usize,
}

impl From<ConversationSummary> for ConversationResponse {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            partner_id: summary.partner_id,
            last_message: summary.last_message.into(),
            unread: summary.unread,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendshipResponse {
    pub id: String,
    pub requester_id: String,
    pub addressee_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<Friendship> for FriendshipResponse {
    fn from(friendship: Friendship) -> Self {
        Self {
            id: friendship.id,
            requester_id: friendship.requester_id,
            addressee_id: friendship.addressee_id,
            status: friendship.status,
            created_at: friendship.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipResponse {
    pub friends: bool,
    pub pending_incoming: bool,
    pub pending_outgoing: bool,
    pub following: bool,
    pub followed_by: bool,
    pub blocking: bool,
}

impl From<Relationship> for RelationshipResponse {
    fn from(relationship: Relationship) -> Self {
        Self {
            friends: relationship.friends,
            pending_incoming: relationship.pending_incoming,
            pending_outgoing: relationship.pending_outgoing,
            following: relationship.following,
            followed_by: relationship.followed_by,
            blocking: relationship.blocking,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportResponse {
    pub id: String,
    pub reporter_id: String,
    pub subject_user_id: String,
    pub testimony_id: Option<String>,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Report> for ReportResponse {
    fn from(report: Report) -> Self {
        Self {
            id: report.id,
            reporter_id: report.reporter_id,
            subject_user_id: report.subject_user_id,
            testimony_id: report.testimony_id,
            reason: report.reason,
            status: report.status,
            created_at: report.created_at,
            updated_at: report.updated_at,
        }
    }
}

/// Session token issued by login/register
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateTestimonyResponse {
    pub draft: String,
}

/// Instance stats for the admin dashboard
#[derive(Debug, Clone, Serialize)]
pub struct AdminStatsResponse {
    pub users: i64,
    pub testimonies: i64,
    pub messages: i64,
    pub open_reports: i64,
    pub rate_limit_tracked_keys: usize,
}

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePrivacyRequest {
    pub profile_visibility: String,
    pub message_privacy: String,
}

#[derive(Debug, Deserialize)]
pub struct JoinChurchRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTestimonyRequest {
    pub title: String,
    pub content: String,
    pub visibility: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTestimonyRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub visibility: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateTestimonyRequest {
    pub story: String,
    pub tone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub recipient_id: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    pub addressee_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateReportRequest {
    pub subject_user_id: String,
    pub testimony_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct CloseReportRequest {
    pub status: String,
}

/// Feed pagination parameters
#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub limit: Option<usize>,
    pub max_id: Option<String>,
}

/// Offset pagination parameters
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Report queue query parameters
#[derive(Debug, Deserialize)]
pub struct ReportQueueParams {
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}
