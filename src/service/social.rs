//! Social graph service
//!
//! Friendships (mutual, approval-gated) and follows (directed,
//! unapproved). Friendship rows are stored once per unordered pair;
//! every lookup checks both orderings.

use std::sync::Arc;

use crate::data::{Database, EntityId, Follow, Friendship, FriendshipStatus, User};
use crate::error::AppError;
use crate::policy::RateLimiter;

/// How one user stands relative to another
#[derive(Debug, Clone, Default)]
pub struct Relationship {
    pub friends: bool,
    /// They sent us a pending request
    pub pending_incoming: bool,
    /// We sent them a pending request
    pub pending_outgoing: bool,
    pub following: bool,
    pub followed_by: bool,
    /// We block them
    pub blocking: bool,
}

/// Social graph service
pub struct SocialService {
    db: Arc<Database>,
    rate_limiter: Arc<RateLimiter>,
}

impl SocialService {
    /// Create new social service
    pub fn new(db: Arc<Database>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self { db, rate_limiter }
    }

    async fn require_user(&self, user_id: &str) -> Result<User, AppError> {
        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)
    }

    /// Send a friend request
    ///
    /// Rejected for self-requests, blocked pairs, and pairs that
    /// already have a friendship row in either orientation.
    pub async fn send_friend_request(
        &self,
        requester_id: &str,
        addressee_id: &str,
    ) -> Result<Friendship, AppError> {
        if requester_id == addressee_id {
            return Err(AppError::Validation(
                "you cannot send a friend request to yourself".to_string(),
            ));
        }

        self.rate_limiter
            .check("friend_request", requester_id)
            .await
            .require()?;

        self.require_user(addressee_id).await?;

        if self.db.block_exists_either(requester_id, addressee_id).await? {
            return Err(AppError::PolicyDenied(
                "Unable to send a friend request to this user".to_string(),
            ));
        }

        if let Some(existing) = self
            .db
            .get_friendship_between(requester_id, addressee_id)
            .await?
        {
            let reason = if existing.status == FriendshipStatus::Accepted.as_str() {
                "you are already friends"
            } else {
                "a friend request is already pending"
            };
            return Err(AppError::Validation(reason.to_string()));
        }

        let now = chrono::Utc::now();
        let friendship = Friendship {
            id: EntityId::new().0,
            requester_id: requester_id.to_string(),
            addressee_id: addressee_id.to_string(),
            status: FriendshipStatus::Pending.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_friendship(&friendship).await?;
        self.rate_limiter
            .record_attempt("friend_request", requester_id)
            .await;

        Ok(friendship)
    }

    /// Accept a pending friend request sent by `requester_id`.
    ///
    /// Only the addressee may accept.
    pub async fn accept_friend_request(
        &self,
        user_id: &str,
        requester_id: &str,
    ) -> Result<Friendship, AppError> {
        let mut friendship = self
            .db
            .get_friendship_between(user_id, requester_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if friendship.status != FriendshipStatus::Pending.as_str() {
            return Err(AppError::Validation(
                "friend request is not pending".to_string(),
            ));
        }
        if friendship.addressee_id != user_id {
            return Err(AppError::Forbidden);
        }

        let updated_at = chrono::Utc::now();
        let updated = self
            .db
            .update_friendship_status(&friendship.id, FriendshipStatus::Accepted, updated_at)
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        friendship.status = FriendshipStatus::Accepted.as_str().to_string();
        friendship.updated_at = updated_at;
        Ok(friendship)
    }

    /// Decline a pending friend request sent by `requester_id`.
    pub async fn decline_friend_request(
        &self,
        user_id: &str,
        requester_id: &str,
    ) -> Result<(), AppError> {
        let friendship = self
            .db
            .get_friendship_between(user_id, requester_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if friendship.status != FriendshipStatus::Pending.as_str() {
            return Err(AppError::Validation(
                "friend request is not pending".to_string(),
            ));
        }
        if friendship.addressee_id != user_id {
            return Err(AppError::Forbidden);
        }

        self.db.delete_friendship(&friendship.id).await?;
        Ok(())
    }

    /// Remove an accepted friendship with `other_id`.
    pub async fn unfriend(&self, user_id: &str, other_id: &str) -> Result<(), AppError> {
        let friendship = self
            .db
            .get_friendship_between(user_id, other_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if friendship.status != FriendshipStatus::Accepted.as_str() {
            return Err(AppError::NotFound);
        }

        self.db.delete_friendship(&friendship.id).await?;
        Ok(())
    }

    /// The user's accepted friends
    pub async fn friends(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        let ids = self.db.list_friend_ids(user_id).await?;

        let mut friends = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.db.get_user(&id).await? {
                friends.push(user);
            }
        }
        Ok(friends)
    }

    /// Pending friend requests addressed to the user
    pub async fn pending_requests(&self, user_id: &str) -> Result<Vec<Friendship>, AppError> {
        self.db.list_pending_requests(user_id).await
    }

    /// Follow another user. Idempotent.
    ///
    /// # Returns
    /// `true` if a new follow edge was created.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        if follower_id == followee_id {
            return Err(AppError::Validation(
                "you cannot follow yourself".to_string(),
            ));
        }

        self.require_user(followee_id).await?;

        if self.db.block_exists_either(follower_id, followee_id).await? {
            return Err(AppError::PolicyDenied(
                "Unable to follow this user".to_string(),
            ));
        }

        let follow = Follow {
            id: EntityId::new().0,
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.db.insert_follow(&follow).await
    }

    /// Unfollow another user.
    ///
    /// # Returns
    /// `true` if an edge was removed.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> Result<bool, AppError> {
        self.db.delete_follow(follower_id, followee_id).await
    }

    /// Users following `user_id`
    pub async fn followers(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        self.load_users(self.db.list_follower_ids(user_id).await?)
            .await
    }

    /// Users `user_id` follows
    pub async fn following(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        self.load_users(self.db.list_following_ids(user_id).await?)
            .await
    }

    /// Load users by ID, preserving order (max 8 concurrent reads).
    async fn load_users(&self, ids: Vec<String>) -> Result<Vec<User>, AppError> {
        use futures::stream::{self, StreamExt};

        let results: Vec<Result<Option<User>, AppError>> = stream::iter(ids)
            .map(|id| {
                let db = self.db.clone();
                async move { db.get_user(&id).await }
            })
            .buffered(8)
            .collect()
            .await;

        let mut users = Vec::with_capacity(results.len());
        for result in results {
            if let Some(user) = result? {
                users.push(user);
            }
        }
        Ok(users)
    }

    /// Summarize how `user_id` stands relative to `other_id`.
    pub async fn relationship(
        &self,
        user_id: &str,
        other_id: &str,
    ) -> Result<Relationship, AppError> {
        let mut relationship = Relationship::default();

        if let Some(friendship) = self.db.get_friendship_between(user_id, other_id).await? {
            match FriendshipStatus::parse(&friendship.status) {
                Some(FriendshipStatus::Accepted) => relationship.friends = true,
                Some(FriendshipStatus::Pending) => {
                    if friendship.addressee_id == user_id {
                        relationship.pending_incoming = true;
                    } else {
                        relationship.pending_outgoing = true;
                    }
                }
                None => {}
            }
        }

        relationship.following = self.db.follow_edge_exists(user_id, other_id).await?;
        relationship.followed_by = self.db.follow_edge_exists(other_id, user_id).await?;
        relationship.blocking = self
            .db
            .list_blocked_ids(user_id)
            .await?
            .iter()
            .any(|id| id == other_id);

        Ok(relationship)
    }
}
