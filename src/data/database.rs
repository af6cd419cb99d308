//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with a file-backed SQLite pool.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;
use crate::metrics::DB_QUERIES_TOTAL;
use crate::policy::{PolicyStore, TestimonyRecord, UserPrivacy};

fn track(operation: &str, table: &str) {
    DB_QUERIES_TOTAL.with_label_values(&[operation, table]).inc();
}

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to the SQLite database at `path`, creating it if needed.
    ///
    /// Runs embedded migrations before returning.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user.
    ///
    /// # Errors
    /// Returns a database error if the username is already taken.
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        track("insert", "users");
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, display_name, bio, avatar_url,
                profile_visibility, message_privacy, church_id,
                password_hash, is_admin, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.display_name)
        .bind(&user.bio)
        .bind(&user.avatar_url)
        .bind(&user.profile_visibility)
        .bind(&user.message_privacy)
        .bind(&user.church_id)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get a user by username (case-sensitive exact match)
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Update profile fields by user ID.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching user row exists.
    pub async fn update_user_profile(
        &self,
        user_id: &str,
        display_name: Option<&str>,
        bio: Option<&str>,
        avatar_url: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        track("update", "users");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET display_name = ?, bio = ?, avatar_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(display_name)
        .bind(bio)
        .bind(avatar_url)
        .bind(updated_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Update privacy flags by user ID.
    pub async fn update_user_privacy(
        &self,
        user_id: &str,
        profile_visibility: ProfileVisibility,
        message_privacy: MessagePrivacy,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        track("update", "users");
        let result = sqlx::query(
            r#"
            UPDATE users
            SET profile_visibility = ?, message_privacy = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(profile_visibility.as_str())
        .bind(message_privacy.as_str())
        .bind(updated_at)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Set or clear a user's church membership.
    pub async fn set_user_church(
        &self,
        user_id: &str,
        church_id: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        track("update", "users");
        let result = sqlx::query("UPDATE users SET church_id = ?, updated_at = ? WHERE id = ?")
            .bind(church_id)
            .bind(updated_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Grant admin rights to a user.
    pub async fn promote_to_admin(&self, user_id: &str) -> Result<bool, AppError> {
        track("update", "users");
        let result = sqlx::query("UPDATE users SET is_admin = 1, updated_at = ? WHERE id = ?")
            .bind(chrono::Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List users, newest first (admin view)
    pub async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>, AppError> {
        let users =
            sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id DESC LIMIT ? OFFSET ?")
                .bind(limit as i64)
                .bind(offset as i64)
                .fetch_all(&self.pool)
                .await?;

        Ok(users)
    }

    /// Count registered users
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Churches
    // =========================================================================

    /// Insert a new church
    pub async fn insert_church(&self, church: &Church) -> Result<(), AppError> {
        track("insert", "churches");
        sqlx::query("INSERT INTO churches (id, name, created_at) VALUES (?, ?, ?)")
            .bind(&church.id)
            .bind(&church.name)
            .bind(church.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Get a church by ID
    pub async fn get_church(&self, id: &str) -> Result<Option<Church>, AppError> {
        let church = sqlx::query_as::<_, Church>("SELECT * FROM churches WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(church)
    }

    /// Get a church by exact name
    pub async fn get_church_by_name(&self, name: &str) -> Result<Option<Church>, AppError> {
        let church = sqlx::query_as::<_, Church>("SELECT * FROM churches WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(church)
    }

    /// List all churches by name
    pub async fn list_churches(&self) -> Result<Vec<Church>, AppError> {
        let churches = sqlx::query_as::<_, Church>("SELECT * FROM churches ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        Ok(churches)
    }

    // =========================================================================
    // Testimonies
    // =========================================================================

    /// Insert a new testimony
    pub async fn insert_testimony(&self, testimony: &Testimony) -> Result<(), AppError> {
        track("insert", "testimonies");
        sqlx::query(
            r#"
            INSERT INTO testimonies (
                id, user_id, title, content, visibility, generated,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&testimony.id)
        .bind(&testimony.user_id)
        .bind(&testimony.title)
        .bind(&testimony.content)
        .bind(&testimony.visibility)
        .bind(testimony.generated)
        .bind(testimony.created_at)
        .bind(testimony.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a testimony by ID
    pub async fn get_testimony(&self, id: &str) -> Result<Option<Testimony>, AppError> {
        let testimony = sqlx::query_as::<_, Testimony>("SELECT * FROM testimonies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(testimony)
    }

    /// Update a testimony's content fields.
    pub async fn update_testimony(
        &self,
        id: &str,
        title: &str,
        content: &str,
        visibility: TestimonyVisibility,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        track("update", "testimonies");
        let result = sqlx::query(
            r#"
            UPDATE testimonies
            SET title = ?, content = ?, visibility = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(title)
        .bind(content)
        .bind(visibility.as_str())
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a testimony
    pub async fn delete_testimony(&self, id: &str) -> Result<bool, AppError> {
        track("delete", "testimonies");
        let result = sqlx::query("DELETE FROM testimonies WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List a user's testimonies, newest first
    pub async fn list_testimonies_by_user(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Testimony>, AppError> {
        let testimonies = sqlx::query_as::<_, Testimony>(
            "SELECT * FROM testimonies WHERE user_id = ? ORDER BY id DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(testimonies)
    }

    /// List recent testimonies across all users, newest first.
    ///
    /// # Arguments
    /// * `limit` - Maximum results
    /// * `max_id` - Return testimonies with an ID older than this (ULIDs sort by time)
    pub async fn list_recent_testimonies(
        &self,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<Testimony>, AppError> {
        let testimonies = match max_id {
            Some(max_id) => {
                sqlx::query_as::<_, Testimony>(
                    "SELECT * FROM testimonies WHERE id < ? ORDER BY id DESC LIMIT ?",
                )
                .bind(max_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Testimony>(
                    "SELECT * FROM testimonies ORDER BY id DESC LIMIT ?",
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(testimonies)
    }

    /// Count testimonies
    pub async fn count_testimonies(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM testimonies")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Friendships
    // =========================================================================

    /// Insert a new (pending) friendship request
    pub async fn insert_friendship(&self, friendship: &Friendship) -> Result<(), AppError> {
        track("insert", "friendships");
        sqlx::query(
            r#"
            INSERT INTO friendships (
                id, requester_id, addressee_id, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&friendship.id)
        .bind(&friendship.requester_id)
        .bind(&friendship.addressee_id)
        .bind(&friendship.status)
        .bind(friendship.created_at)
        .bind(friendship.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get the friendship row between two users, checking both orderings.
    pub async fn get_friendship_between(
        &self,
        a: &str,
        b: &str,
    ) -> Result<Option<Friendship>, AppError> {
        let friendship = sqlx::query_as::<_, Friendship>(
            r#"
            SELECT * FROM friendships
            WHERE (requester_id = ? AND addressee_id = ?)
               OR (requester_id = ? AND addressee_id = ?)
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_optional(&self.pool)
        .await?;

        Ok(friendship)
    }

    /// Update a friendship's status by row ID.
    pub async fn update_friendship_status(
        &self,
        id: &str,
        status: FriendshipStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        track("update", "friendships");
        let result = sqlx::query("UPDATE friendships SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a friendship row
    pub async fn delete_friendship(&self, id: &str) -> Result<bool, AppError> {
        track("delete", "friendships");
        let result = sqlx::query("DELETE FROM friendships WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// List IDs of a user's accepted friends (both orderings).
    pub async fn list_friend_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let pairs = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT requester_id, addressee_id FROM friendships
            WHERE status = 'accepted' AND (requester_id = ? OR addressee_id = ?)
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(pairs
            .into_iter()
            .map(|(requester, addressee)| {
                if requester == user_id {
                    addressee
                } else {
                    requester
                }
            })
            .collect())
    }

    /// List pending friend requests addressed to a user
    pub async fn list_pending_requests(&self, user_id: &str) -> Result<Vec<Friendship>, AppError> {
        let requests = sqlx::query_as::<_, Friendship>(
            r#"
            SELECT * FROM friendships
            WHERE addressee_id = ? AND status = 'pending'
            ORDER BY id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    // =========================================================================
    // Follows
    // =========================================================================

    /// Insert a follow edge. Duplicate follows are ignored.
    pub async fn insert_follow(&self, follow: &Follow) -> Result<bool, AppError> {
        track("insert", "follows");
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO follows (id, follower_id, followee_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&follow.id)
        .bind(&follow.follower_id)
        .bind(&follow.followee_id)
        .bind(follow.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a follow edge
    pub async fn delete_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<bool, AppError> {
        track("delete", "follows");
        let result =
            sqlx::query("DELETE FROM follows WHERE follower_id = ? AND followee_id = ?")
                .bind(follower_id)
                .bind(followee_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Whether `follower_id` follows `followee_id`
    pub async fn follow_edge_exists(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?",
        )
        .bind(follower_id)
        .bind(followee_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// List IDs of users following `user_id`
    pub async fn list_follower_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT follower_id FROM follows WHERE followee_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// List IDs of users `user_id` follows
    pub async fn list_following_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT followee_id FROM follows WHERE follower_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Insert a direct message
    pub async fn insert_message(&self, message: &Message) -> Result<(), AppError> {
        track("insert", "messages");
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, recipient_id, body, read, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.recipient_id)
        .bind(&message.body)
        .bind(message.read)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List messages between two users, newest first
    pub async fn list_conversation(
        &self,
        a: &str,
        b: &str,
        limit: usize,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = ? AND recipient_id = ?)
               OR (sender_id = ? AND recipient_id = ?)
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// List a user's recent messages in either direction, newest first
    pub async fn list_user_messages(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE sender_id = ? OR recipient_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Mark all messages from `sender_id` to `recipient_id` as read.
    ///
    /// # Returns
    /// Number of messages marked.
    pub async fn mark_conversation_read(
        &self,
        recipient_id: &str,
        sender_id: &str,
    ) -> Result<u64, AppError> {
        track("update", "messages");
        let result = sqlx::query(
            "UPDATE messages SET read = 1 WHERE recipient_id = ? AND sender_id = ? AND read = 0",
        )
        .bind(recipient_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count a user's unread messages
    pub async fn count_unread_messages(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE recipient_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Count messages
    pub async fn count_messages(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    /// Insert a block edge. Duplicate blocks are ignored.
    pub async fn insert_block(&self, block: &Block) -> Result<bool, AppError> {
        track("insert", "blocks");
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO blocks (id, blocker_id, blocked_id, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&block.id)
        .bind(&block.blocker_id)
        .bind(&block.blocked_id)
        .bind(block.created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a block edge
    pub async fn delete_block(
        &self,
        blocker_id: &str,
        blocked_id: &str,
    ) -> Result<bool, AppError> {
        track("delete", "blocks");
        let result = sqlx::query("DELETE FROM blocks WHERE blocker_id = ? AND blocked_id = ?")
            .bind(blocker_id)
            .bind(blocked_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Whether a block exists in either direction between two users
    pub async fn block_exists_either(&self, a: &str, b: &str) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM blocks
            WHERE (blocker_id = ? AND blocked_id = ?)
               OR (blocker_id = ? AND blocked_id = ?)
            "#,
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// List IDs of users blocked by `user_id`
    pub async fn list_blocked_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT blocked_id FROM blocks WHERE blocker_id = ? ORDER BY id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    // =========================================================================
    // Reports
    // =========================================================================

    /// Insert a moderation report
    pub async fn insert_report(&self, report: &Report) -> Result<(), AppError> {
        track("insert", "reports");
        sqlx::query(
            r#"
            INSERT INTO reports (
                id, reporter_id, subject_user_id, testimony_id, reason,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&report.id)
        .bind(&report.reporter_id)
        .bind(&report.subject_user_id)
        .bind(&report.testimony_id)
        .bind(&report.reason)
        .bind(&report.status)
        .bind(report.created_at)
        .bind(report.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get a report by ID
    pub async fn get_report(&self, id: &str) -> Result<Option<Report>, AppError> {
        let report = sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(report)
    }

    /// List reports with a given status, newest first
    pub async fn list_reports_by_status(
        &self,
        status: ReportStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Report>, AppError> {
        let reports = sqlx::query_as::<_, Report>(
            "SELECT * FROM reports WHERE status = ? ORDER BY id DESC LIMIT ? OFFSET ?",
        )
        .bind(status.as_str())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports)
    }

    /// Update a report's status
    pub async fn update_report_status(
        &self,
        id: &str,
        status: ReportStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        track("update", "reports");
        let result = sqlx::query("UPDATE reports SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(updated_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count open reports
    pub async fn count_open_reports(&self) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reports WHERE status = 'open'")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Relationship lookups for the policy engine.
///
/// Every method maps directly onto a single query; the engine treats
/// any error here as a deny.
#[async_trait::async_trait]
impl PolicyStore for Database {
    async fn load_privacy(&self, user_id: &str) -> Result<Option<UserPrivacy>, AppError> {
        let row = sqlx::query_as::<_, (String, String, Option<String>)>(
            "SELECT profile_visibility, message_privacy, church_id FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(profile_visibility, message_privacy, church_id)| UserPrivacy {
                profile_visibility,
                message_privacy,
                church_id,
            },
        ))
    }

    async fn load_testimony(
        &self,
        testimony_id: &str,
    ) -> Result<Option<TestimonyRecord>, AppError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT user_id, visibility FROM testimonies WHERE id = ?",
        )
        .bind(testimony_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(owner_id, visibility)| TestimonyRecord {
            owner_id,
            visibility,
        }))
    }

    async fn accepted_friendship_exists(&self, a: &str, b: &str) -> Result<bool, AppError> {
        Ok(self
            .get_friendship_between(a, b)
            .await?
            .map(|friendship| friendship.status == FriendshipStatus::Accepted.as_str())
            .unwrap_or(false))
    }

    async fn follow_exists(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<bool, AppError> {
        self.follow_edge_exists(follower_id, followee_id).await
    }

    async fn block_exists_between(&self, a: &str, b: &str) -> Result<bool, AppError> {
        self.block_exists_either(a, b).await
    }
}
