//! Testimony service
//!
//! Testimony CRUD and feed reads, every non-owner read gated by the
//! visibility policy. Content HTML is sanitized before storage.

use std::sync::Arc;

use crate::data::{Database, EntityId, Testimony, TestimonyVisibility};
use crate::error::AppError;
use crate::generation::TestimonyGenerator;
use crate::policy::{PolicyEngine, RateLimiter};

const MAX_TITLE_LEN: usize = 200;
const MAX_CONTENT_LEN: usize = 20_000;

/// Feed assembly scans at most this many candidate rows per page.
const FEED_SCAN_FACTOR: usize = 4;

fn validate_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if title.len() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be at most {} characters",
            MAX_TITLE_LEN
        )));
    }
    Ok(title.to_string())
}

fn validate_content(content: &str) -> Result<String, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }
    if content.len() > MAX_CONTENT_LEN {
        return Err(AppError::Validation(format!(
            "content must be at most {} characters",
            MAX_CONTENT_LEN
        )));
    }
    Ok(ammonia::clean(content))
}

fn parse_visibility(visibility: &str) -> Result<TestimonyVisibility, AppError> {
    TestimonyVisibility::parse(visibility.trim()).ok_or_else(|| {
        AppError::Validation(
            "visibility must be one of: my_church, all_churches, shareable".to_string(),
        )
    })
}

/// Testimony service
pub struct TestimonyService {
    db: Arc<Database>,
    policy: PolicyEngine<Database>,
    rate_limiter: Arc<RateLimiter>,
    generator: Option<Arc<TestimonyGenerator>>,
}

impl TestimonyService {
    /// Create new testimony service
    pub fn new(
        db: Arc<Database>,
        policy: PolicyEngine<Database>,
        rate_limiter: Arc<RateLimiter>,
        generator: Option<Arc<TestimonyGenerator>>,
    ) -> Self {
        Self {
            db,
            policy,
            rate_limiter,
            generator,
        }
    }

    /// Create a new testimony
    ///
    /// # Arguments
    /// * `user_id` - Owner
    /// * `title` - Title (trimmed, max 200 chars)
    /// * `content` - HTML content, sanitized before storage
    /// * `visibility` - my_church, all_churches, or shareable
    /// * `generated` - Whether the draft came from the generation API
    pub async fn create(
        &self,
        user_id: &str,
        title: &str,
        content: &str,
        visibility: &str,
        generated: bool,
    ) -> Result<Testimony, AppError> {
        self.rate_limiter
            .check("create_testimony", user_id)
            .await
            .require()?;

        let title = validate_title(title)?;
        let content = validate_content(content)?;
        let visibility = parse_visibility(visibility)?;

        let now = chrono::Utc::now();
        let testimony = Testimony {
            id: EntityId::new().0,
            user_id: user_id.to_string(),
            title,
            content,
            visibility: visibility.as_str().to_string(),
            generated,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_testimony(&testimony).await?;
        self.rate_limiter
            .record_attempt("create_testimony", user_id)
            .await;
        crate::metrics::TESTIMONIES_TOTAL.set(self.db.count_testimonies().await?);

        Ok(testimony)
    }

    /// Get a testimony, enforcing visibility.
    pub async fn get(&self, viewer_id: &str, testimony_id: &str) -> Result<Testimony, AppError> {
        self.policy
            .can_view_testimony(viewer_id, testimony_id)
            .await
            .require()?;

        self.db
            .get_testimony(testimony_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Update an owned testimony
    ///
    /// Only the owner may edit. Omitted fields are left unchanged.
    pub async fn update(
        &self,
        user_id: &str,
        testimony_id: &str,
        title: Option<&str>,
        content: Option<&str>,
        visibility: Option<&str>,
    ) -> Result<Testimony, AppError> {
        let mut testimony = self
            .db
            .get_testimony(testimony_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if testimony.user_id != user_id {
            return Err(AppError::Forbidden);
        }

        if let Some(title) = title {
            testimony.title = validate_title(title)?;
        }
        if let Some(content) = content {
            testimony.content = validate_content(content)?;
        }
        let visibility = match visibility {
            Some(visibility) => parse_visibility(visibility)?,
            None => parse_visibility(&testimony.visibility)?,
        };
        testimony.visibility = visibility.as_str().to_string();

        let updated_at = chrono::Utc::now();
        let updated = self
            .db
            .update_testimony(
                testimony_id,
                &testimony.title,
                &testimony.content,
                visibility,
                updated_at,
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        testimony.updated_at = updated_at;
        Ok(testimony)
    }

    /// Delete a testimony
    ///
    /// Allowed for the owner, and for admins (moderation takedown).
    pub async fn delete(&self, actor_id: &str, testimony_id: &str) -> Result<(), AppError> {
        let testimony = self
            .db
            .get_testimony(testimony_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if testimony.user_id != actor_id {
            let actor = self.db.get_user(actor_id).await?.ok_or(AppError::Forbidden)?;
            if !actor.is_admin {
                return Err(AppError::Forbidden);
            }
            tracing::info!(
                testimony_id,
                admin = %actor.username,
                "Testimony removed by admin"
            );
        }

        if !self.db.delete_testimony(testimony_id).await? {
            return Err(AppError::NotFound);
        }
        crate::metrics::TESTIMONIES_TOTAL.set(self.db.count_testimonies().await?);

        Ok(())
    }

    /// Recent testimonies visible to the viewer, newest first.
    ///
    /// # Arguments
    /// * `viewer_id` - Requesting user
    /// * `limit` - Maximum results
    /// * `max_id` - Return testimonies older than this ID
    pub async fn feed(
        &self,
        viewer_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<Testimony>, AppError> {
        let candidates = self
            .db
            .list_recent_testimonies(limit.saturating_mul(FEED_SCAN_FACTOR), max_id)
            .await?;

        let mut visible = Vec::with_capacity(limit);
        for testimony in candidates {
            if visible.len() >= limit {
                break;
            }
            let decision = self.policy.can_view_testimony(viewer_id, &testimony.id).await;
            if decision.allowed {
                visible.push(testimony);
            }
        }

        Ok(visible)
    }

    /// A user's testimonies visible to the viewer, newest first.
    pub async fn list_for_user(
        &self,
        viewer_id: &str,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<Testimony>, AppError> {
        let candidates = self.db.list_testimonies_by_user(owner_id, limit).await?;

        let mut visible = Vec::new();
        for testimony in candidates {
            let decision = self.policy.can_view_testimony(viewer_id, &testimony.id).await;
            if decision.allowed {
                visible.push(testimony);
            }
        }

        Ok(visible)
    }

    /// Draft a testimony from the user's story points via the
    /// generation API.
    ///
    /// Returns the drafted text; the user reviews and saves it through
    /// [`Self::create`].
    pub async fn generate_draft(
        &self,
        user_id: &str,
        story: &str,
        tone: Option<&str>,
    ) -> Result<String, AppError> {
        let Some(generator) = &self.generator else {
            return Err(AppError::Generation(
                "testimony generation is not configured".to_string(),
            ));
        };

        self.rate_limiter
            .check("generate_testimony", user_id)
            .await
            .require()?;

        let story = story.trim();
        if story.is_empty() {
            return Err(AppError::Validation("story cannot be empty".to_string()));
        }

        let draft = generator.generate(story, tone).await?;
        self.rate_limiter
            .record_attempt("generate_testimony", user_id)
            .await;

        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MessagePrivacy, ProfileVisibility, User};
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

    async fn create_service() -> (TestimonyService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-testimony.db");
        let db = Arc::new(Database::connect(&db_path).await.unwrap());
        let policy = PolicyEngine::new(db.clone());
        let rate_limiter = relaxed_limiter();
        (
            TestimonyService::new(db.clone(), policy, rate_limiter, None),
            db,
            temp_dir,
        )
    }

    async fn create_user(db: &Database, username: &str, church_id: Option<&str>) -> User {
        let now = chrono::Utc::now();
        if let Some(cid) = church_id {
            if db.get_church(cid).await.unwrap().is_none() {
                db.insert_church(&crate::data::Church {
                    id: cid.to_string(),
                    name: cid.to_string(),
                    created_at: now,
                })
                .await
                .unwrap();
            }
        }
        let user = User {
            id: EntityId::new().0,
            username: username.to_string(),
            display_name: None,
            bio: None,
            avatar_url: None,
            profile_visibility: ProfileVisibility::Public.as_str().to_string(),
            message_privacy: MessagePrivacy::Everyone.as_str().to_string(),
            church_id: church_id.map(ToOwned::to_owned),
            password_hash: "v1$salt$hash".to_string(),
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        db.insert_user(&user).await.unwrap();
        user
    }

    #[tokio::test]
    async fn create_sanitizes_content() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice", None).await;

        let testimony = service
            .create(
                &alice.id,
                "My story",
                "<p>Saved</p><script>alert(1)</script>",
                "shareable",
                false,
            )
            .await
            .unwrap();
        assert!(!testimony.content.contains("<script>"));
        assert!(testimony.content.contains("<p>Saved</p>"));
    }

    #[tokio::test]
    async fn create_rejects_unknown_visibility() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice", None).await;

        let error = service
            .create(&alice.id, "My story", "text", "secret", false)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn church_testimony_hidden_outside_church() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice", Some("grace-chapel")).await;
        let bob = create_user(&db, "bob", None).await;
        let carol = create_user(&db, "carol", Some("grace-chapel")).await;

        let testimony = service
            .create(&alice.id, "My story", "text", "my_church", false)
            .await
            .unwrap();

        assert!(service.get(&carol.id, &testimony.id).await.is_ok());
        let error = service.get(&bob.id, &testimony.id).await.unwrap_err();
        assert!(matches!(error, AppError::PolicyDenied(_)));
    }

    #[tokio::test]
    async fn feed_filters_by_visibility() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice", Some("grace-chapel")).await;
        let bob = create_user(&db, "bob", None).await;

        service
            .create(&alice.id, "Public", "text", "shareable", false)
            .await
            .unwrap();
        service
            .create(&alice.id, "Church only", "text", "my_church", false)
            .await
            .unwrap();

        let feed = service.feed(&bob.id, 10, None).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].title, "Public");

        let own_feed = service.feed(&alice.id, 10, None).await.unwrap();
        assert_eq!(own_feed.len(), 2);
    }

    #[tokio::test]
    async fn only_owner_edits_and_admin_deletes() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice", None).await;
        let bob = create_user(&db, "bob", None).await;

        let testimony = service
            .create(&alice.id, "My story", "text", "shareable", false)
            .await
            .unwrap();

        let error = service
            .update(&bob.id, &testimony.id, Some("hijacked"), None, None)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Forbidden));

        let error = service.delete(&bob.id, &testimony.id).await.unwrap_err();
        assert!(matches!(error, AppError::Forbidden));

        // Admins can take testimonies down.
        let admin = create_user(&db, "root", None).await;
        db.promote_to_admin(&admin.id).await.unwrap();

        service.delete(&admin.id, &testimony.id).await.unwrap();
        assert!(db.get_testimony(&testimony.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn generation_disabled_without_generator() {
        let (service, db, _temp_dir) = create_service().await;
        let alice = create_user(&db, "alice", None).await;

        let error = service
            .generate_draft(&alice.id, "how I found hope", None)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Generation(_)));
    }
}
