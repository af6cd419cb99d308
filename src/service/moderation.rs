//! Moderation service
//!
//! Blocks, user reports, and the admin report queue.

use std::sync::Arc;

use crate::data::{Block, Database, EntityId, Report, ReportStatus, User};
use crate::error::AppError;
use crate::policy::RateLimiter;

const MAX_REASON_LEN: usize = 1000;

/// Moderation service
pub struct ModerationService {
    db: Arc<Database>,
    rate_limiter: Arc<RateLimiter>,
}

impl ModerationService {
    /// Create new moderation service
    pub fn new(db: Arc<Database>, rate_limiter: Arc<RateLimiter>) -> Self {
        Self { db, rate_limiter }
    }

    /// Block another user
    ///
    /// Blocking tears down the social relationship: any friendship row
    /// and both follow edges between the pair are removed.
    pub async fn block(&self, blocker_id: &str, blocked_id: &str) -> Result<(), AppError> {
        if blocker_id == blocked_id {
            return Err(AppError::Validation(
                "you cannot block yourself".to_string(),
            ));
        }
        self.db
            .get_user(blocked_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let block = Block {
            id: EntityId::new().0,
            blocker_id: blocker_id.to_string(),
            blocked_id: blocked_id.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.db.insert_block(&block).await?;

        if let Some(friendship) = self
            .db
            .get_friendship_between(blocker_id, blocked_id)
            .await?
        {
            self.db.delete_friendship(&friendship.id).await?;
        }
        self.db.delete_follow(blocker_id, blocked_id).await?;
        self.db.delete_follow(blocked_id, blocker_id).await?;

        Ok(())
    }

    /// Remove a block
    ///
    /// # Returns
    /// `true` if a block was removed.
    pub async fn unblock(&self, blocker_id: &str, blocked_id: &str) -> Result<bool, AppError> {
        self.db.delete_block(blocker_id, blocked_id).await
    }

    /// Users blocked by `user_id`
    pub async fn blocked_users(&self, user_id: &str) -> Result<Vec<User>, AppError> {
        let ids = self.db.list_blocked_ids(user_id).await?;

        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.db.get_user(&id).await? {
                users.push(user);
            }
        }
        Ok(users)
    }

    /// File a report against a user, optionally pinned to a testimony.
    pub async fn report(
        &self,
        reporter_id: &str,
        subject_user_id: &str,
        testimony_id: Option<&str>,
        reason: &str,
    ) -> Result<Report, AppError> {
        if reporter_id == subject_user_id {
            return Err(AppError::Validation(
                "you cannot report yourself".to_string(),
            ));
        }

        self.rate_limiter
            .check("report", reporter_id)
            .await
            .require()?;

        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::Validation("reason cannot be empty".to_string()));
        }
        if reason.len() > MAX_REASON_LEN {
            return Err(AppError::Validation(format!(
                "reason must be at most {} characters",
                MAX_REASON_LEN
            )));
        }

        self.db
            .get_user(subject_user_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if let Some(testimony_id) = testimony_id {
            let testimony = self
                .db
                .get_testimony(testimony_id)
                .await?
                .ok_or(AppError::NotFound)?;
            if testimony.user_id != subject_user_id {
                return Err(AppError::Validation(
                    "testimony does not belong to the reported user".to_string(),
                ));
            }
        }

        let now = chrono::Utc::now();
        let report = Report {
            id: EntityId::new().0,
            reporter_id: reporter_id.to_string(),
            subject_user_id: subject_user_id.to_string(),
            testimony_id: testimony_id.map(ToOwned::to_owned),
            reason: reason.to_string(),
            status: ReportStatus::Open.as_str().to_string(),
            created_at: now,
            updated_at: now,
        };
        self.db.insert_report(&report).await?;
        self.rate_limiter.record_attempt("report", reporter_id).await;
        crate::metrics::OPEN_REPORTS_TOTAL.set(self.db.count_open_reports().await?);

        tracing::info!(
            report_id = %report.id,
            subject = subject_user_id,
            "Report filed"
        );
        Ok(report)
    }

    /// Report queue for the admin dashboard
    pub async fn list_reports(
        &self,
        status: ReportStatus,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Report>, AppError> {
        self.db.list_reports_by_status(status, limit, offset).await
    }

    /// Close a report as resolved or dismissed.
    pub async fn close_report(
        &self,
        report_id: &str,
        status: ReportStatus,
    ) -> Result<Report, AppError> {
        if status == ReportStatus::Open {
            return Err(AppError::Validation(
                "a report can only be closed as resolved or dismissed".to_string(),
            ));
        }

        let report = self
            .db
            .get_report(report_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if report.status != ReportStatus::Open.as_str() {
            return Err(AppError::Validation("report is already closed".to_string()));
        }

        let updated_at = chrono::Utc::now();
        if !self
            .db
            .update_report_status(report_id, status, updated_at)
            .await?
        {
            return Err(AppError::NotFound);
        }
        crate::metrics::OPEN_REPORTS_TOTAL.set(self.db.count_open_reports().await?);

        self.db
            .get_report(report_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// User listing for the admin dashboard
    pub async fn list_users(&self, limit: usize, offset: usize) -> Result<Vec<User>, AppError> {
        self.db.list_users(limit, offset).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MessagePrivacy, ProfileVisibility, Testimony};
    use tempfile::TempDir;

    fn relaxed_limiter() -> Arc<RateLimiter> {
        let mut rules = std::collections::HashMap::new();
        for action in [
            "send_message",
            "create_testimony",
            "friend_request",
            "report",
            "generate_testimony",
        ] {
            rules.insert(
                action,
                crate::policy::RateLimitRule::new(
                    1000,
                    std::time::Duration::from_secs(60),
                    std::time::Duration::ZERO,
                ),
            );
        }
        Arc::new(RateLimiter::with_rules(rules, 1000))
    }

    async fn create_service() -> (ModerationService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-moderation.db");
        let db = Arc::new(Database::connect(&db_path).await.unwrap());
        let rate_limiter = relaxed_limiter();
        (
            ModerationService::new(db.clone(), rate_limiter),
            db,
            temp_dir,
        )
    }

    async fn create_user(db: &Database, username: &str) -> User {
        let now = chrono::Utc::now();
        let user = User {
            id: EntityId::new().0,
            username: username.to_string(),
            display_name: None,
            bio: None,
            avatar_url: None,
            profile_visibility: ProfileVisibility::Public.as_str().to_string(),
            message_privacy: MessagePrivacy::Everyone.as_str().to_string(),
            church_id: None,
            password_hash: "v1$salt$hash".to_string(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        db.insert_user(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn block_tears_down_relationships() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        let now = chrono::Utc::now();
        db.insert_friendship(&crate::data::Friendship {
            id: EntityId::new().0,
            requester_id: alice.id.clone(),
            addressee_id: bob.id.clone(),
            status: "accepted".to_string(),
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
        db.insert_follow(&crate::data::Follow {
            id: EntityId::new().0,
            follower_id: bob.id.clone(),
            followee_id: alice.id.clone(),
            created_at: now,
        })
        .await
        .unwrap();

        service.block(&alice.id, &bob.id).await.unwrap();

        assert!(db.block_exists_either(&alice.id, &bob.id).await.unwrap());
        assert!(
            db.get_friendship_between(&alice.id, &bob.id)
                .await
                .unwrap()
                .is_none()
        );
        assert!(!db.follow_edge_exists(&bob.id, &alice.id).await.unwrap());

        assert!(service.unblock(&alice.id, &bob.id).await.unwrap());
        assert!(!db.block_exists_either(&alice.id, &bob.id).await.unwrap());
    }

    #[tokio::test]
    async fn report_lifecycle() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;

        let now = chrono::Utc::now();
        let testimony = Testimony {
            id: EntityId::new().0,
            user_id: bob.id.clone(),
            title: "story".to_string(),
            content: "text".to_string(),
            visibility: "shareable".to_string(),
            generated: false,
            created_at: now,
            updated_at: now,
        };
        db.insert_testimony(&testimony).await.unwrap();

        let report = service
            .report(&alice.id, &bob.id, Some(&testimony.id), "inappropriate")
            .await
            .unwrap();
        assert_eq!(report.status, "open");

        let open = service
            .list_reports(ReportStatus::Open, 10, 0)
            .await
            .unwrap();
        assert_eq!(open.len(), 1);

        let closed = service
            .close_report(&report.id, ReportStatus::Resolved)
            .await
            .unwrap();
        assert_eq!(closed.status, "resolved");

        // Closing twice is rejected.
        let error = service
            .close_report(&report.id, ReportStatus::Dismissed)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));

        assert!(
            service
                .list_reports(ReportStatus::Open, 10, 0)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn report_validates_subject_and_testimony() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice").await;
        let bob = create_user(&db, "bob").await;
        let carol = create_user(&db, "carol").await;

        let error = service
            .report(&alice.id, &alice.id, None, "self report")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));

        let error = service
            .report(&alice.id, "missing-user", None, "ghost")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::NotFound));

        // Testimony must belong to the reported user.
        let now = chrono::Utc::now();
        let testimony = Testimony {
            id: EntityId::new().0,
            user_id: carol.id.clone(),
            title: "story".to_string(),
            content: "text".to_string(),
            visibility: "shareable".to_string(),
            generated: false,
            created_at: now,
            updated_at: now,
        };
        db.insert_testimony(&testimony).await.unwrap();

        let error = service
            .report(&alice.id, &bob.id, Some(&testimony.id), "mismatched")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }
}
