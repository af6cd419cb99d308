//! Profile service
//!
//! Registration, profile reads gated by the visibility policy, privacy
//! updates, and church membership.

use std::sync::Arc;

use crate::auth::session::{hash_password, verify_password};
use crate::data::{Church, Database, EntityId, MessagePrivacy, ProfileVisibility, User};
use crate::error::AppError;
use crate::policy::PolicyEngine;

const MAX_USERNAME_LEN: usize = 30;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_BIO_LEN: usize = 2000;

fn normalize_optional_text(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn validate_username(username: &str) -> Result<(), AppError> {
    if username.is_empty() {
        return Err(AppError::Validation("username cannot be empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(AppError::Validation(format!(
            "username must be at most {} characters",
            MAX_USERNAME_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(AppError::Validation(
            "username may only contain lowercase letters, digits, and underscores".to_string(),
        ));
    }
    Ok(())
}

/// Profile service
pub struct ProfileService {
    db: Arc<Database>,
    policy: PolicyEngine<Database>,
}

impl ProfileService {
    /// Create new profile service
    pub fn new(db: Arc<Database>, policy: PolicyEngine<Database>) -> Self {
        Self { db, policy }
    }

    /// Register a new user
    ///
    /// # Arguments
    /// * `username` - Unique handle (lowercase, digits, underscores)
    /// * `password` - Plaintext password, hashed before storage
    /// * `display_name` - Optional display name
    ///
    /// # Errors
    /// Returns a validation error if the username is malformed or taken,
    /// or if the password is too short.
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: Option<String>,
    ) -> Result<User, AppError> {
        let username = username.trim().to_ascii_lowercase();
        validate_username(&username)?;

        if password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        if self.db.get_user_by_username(&username).await?.is_some() {
            return Err(AppError::Validation(
                "username is already taken".to_string(),
            ));
        }

        let now = chrono::Utc::now();
        let user = User {
            id: EntityId::new().0,
            username,
            display_name: display_name.and_then(normalize_optional_text),
            bio: None,
            avatar_url: None,
            profile_visibility: ProfileVisibility::Public.as_str().to_string(),
            message_privacy: MessagePrivacy::Everyone.as_str().to_string(),
            church_id: None,
            password_hash: hash_password(password),
            is_admin: false,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_user(&user).await?;
        crate::metrics::USERS_TOTAL.set(self.db.count_users().await?);

        tracing::info!(username = %user.username, "User registered");
        Ok(user)
    }

    /// Verify credentials and return the user
    ///
    /// # Errors
    /// Returns `Unauthorized` for an unknown username or wrong password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User, AppError> {
        let username = username.trim().to_ascii_lowercase();
        let user = self
            .db
            .get_user_by_username(&username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(password, &user.password_hash) {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Get a user's profile, enforcing profile visibility.
    pub async fn get_profile(
        &self,
        viewer: Option<&str>,
        user_id: &str,
    ) -> Result<User, AppError> {
        self.policy
            .is_profile_visible(viewer, user_id)
            .await
            .require()?;

        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)
    }

    /// Get a user's profile by username, enforcing profile visibility.
    pub async fn get_profile_by_username(
        &self,
        viewer: Option<&str>,
        username: &str,
    ) -> Result<User, AppError> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or(AppError::NotFound)?;

        self.policy
            .is_profile_visible(viewer, &user.id)
            .await
            .require()?;

        Ok(user)
    }

    /// Update profile fields
    ///
    /// Omitted fields are left unchanged; whitespace-only values clear
    /// the field. Bio HTML is sanitized before storage.
    pub async fn update_profile(
        &self,
        user_id: &str,
        display_name: Option<String>,
        bio: Option<String>,
        avatar_url: Option<String>,
    ) -> Result<User, AppError> {
        let mut user = self.db.get_user(user_id).await?.ok_or(AppError::NotFound)?;

        if let Some(display_name) = display_name {
            user.display_name = normalize_optional_text(display_name);
        }
        if let Some(bio) = bio {
            if bio.len() > MAX_BIO_LEN {
                return Err(AppError::Validation(format!(
                    "bio must be at most {} characters",
                    MAX_BIO_LEN
                )));
            }
            user.bio = normalize_optional_text(bio).map(|bio| ammonia::clean(&bio));
        }
        if let Some(avatar_url) = avatar_url {
            user.avatar_url = normalize_optional_text(avatar_url);
        }

        let updated_at = chrono::Utc::now();
        let updated = self
            .db
            .update_user_profile(
                user_id,
                user.display_name.as_deref(),
                user.bio.as_deref(),
                user.avatar_url.as_deref(),
                updated_at,
            )
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        user.updated_at = updated_at;
        Ok(user)
    }

    /// Update privacy flags
    ///
    /// # Errors
    /// Returns a validation error for unrecognized flag values.
    pub async fn update_privacy(
        &self,
        user_id: &str,
        profile_visibility: &str,
        message_privacy: &str,
    ) -> Result<User, AppError> {
        let profile_visibility = ProfileVisibility::parse(profile_visibility).ok_or_else(|| {
            AppError::Validation(
                "profile_visibility must be one of: public, private".to_string(),
            )
        })?;
        let message_privacy = MessagePrivacy::parse(message_privacy).ok_or_else(|| {
            AppError::Validation(
                "message_privacy must be one of: everyone, friends, none".to_string(),
            )
        })?;

        let updated_at = chrono::Utc::now();
        let updated = self
            .db
            .update_user_privacy(user_id, profile_visibility, message_privacy, updated_at)
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        self.db.get_user(user_id).await?.ok_or(AppError::NotFound)
    }

    /// Join a church by name, creating it if it does not exist yet.
    pub async fn join_church(&self, user_id: &str, church_name: &str) -> Result<Church, AppError> {
        let church_name = church_name.trim();
        if church_name.is_empty() {
            return Err(AppError::Validation(
                "church name cannot be empty".to_string(),
            ));
        }

        let church = match self.db.get_church_by_name(church_name).await? {
            Some(church) => church,
            None => {
                let church = Church {
                    id: EntityId::new().0,
                    name: church_name.to_string(),
                    created_at: chrono::Utc::now(),
                };
                self.db.insert_church(&church).await?;
                tracing::info!(name = %church.name, "Church created");
                church
            }
        };

        let updated = self
            .db
            .set_user_church(user_id, Some(&church.id), chrono::Utc::now())
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        Ok(church)
    }

    /// Leave the current church
    pub async fn leave_church(&self, user_id: &str) -> Result<(), AppError> {
        let updated = self
            .db
            .set_user_church(user_id, None, chrono::Utc::now())
            .await?;
        if !updated {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    /// List all churches
    pub async fn list_churches(&self) -> Result<Vec<Church>, AppError> {
        self.db.list_churches().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_service() -> (ProfileService, Arc<Database>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("service-profile.db");
        let db = Arc::new(Database::connect(&db_path).await.unwrap());
        let policy = PolicyEngine::new(db.clone());
        (ProfileService::new(db.clone(), policy), db, temp_dir)
    }

    #[tokio::test]
    async fn register_creates_and_rejects_duplicate() {
        let (service, _db, _temp_dir) = create_service().await;

        let user = service
            .register(" Alice ", "hunter2hunter2", Some("Alice".to_string()))
            .await
            .unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.display_name, Some("Alice".to_string()));
        assert!(!user.is_admin);

        let error = service
            .register("alice", "hunter2hunter2", None)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn register_rejects_bad_usernames_and_passwords() {
        let (service, _db, _temp_dir) = create_service().await;

        let too_long = "x".repeat(40);
        for bad in ["", "  ", "Name With Spaces", "emoji😀", too_long.as_str()] {
            let error = service.register(bad, "longenoughpw", None).await.unwrap_err();
            assert!(matches!(error, AppError::Validation(_)), "{bad:?}");
        }

        let error = service.register("bob", "short", None).await.unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn authenticate_round_trips() {
        let (service, _db, _temp_dir) = create_service().await;
        service
            .register("alice", "hunter2hunter2", None)
            .await
            .unwrap();

        let user = service.authenticate("alice", "hunter2hunter2").await.unwrap();
        assert_eq!(user.username, "alice");

        let error = service.authenticate("alice", "wrong").await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));

        let error = service.authenticate("nobody", "hunter2hunter2").await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn private_profile_hidden_from_strangers() {
        let (service, _db, _temp_dir) = create_service().await;
        let alice = service.register("alice", "hunter2hunter2", None).await.unwrap();
        let bob = service.register("bob", "hunter2hunter2", None).await.unwrap();

        service
            .update_privacy(&alice.id, "private", "everyone")
            .await
            .unwrap();

        let error = service
            .get_profile(Some(&bob.id), &alice.id)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::PolicyDenied(_)));

        // Self always sees own profile.
        let own = service.get_profile(Some(&alice.id), &alice.id).await.unwrap();
        assert_eq!(own.id, alice.id);
    }

    #[tokio::test]
    async fn church_membership_grants_profile_access() {
        let (service, _db, _temp_dir) = create_service().await;
        let alice = service.register("alice", "hunter2hunter2", None).await.unwrap();
        let bob = service.register("bob", "hunter2hunter2", None).await.unwrap();

        service
            .update_privacy(&alice.id, "private", "everyone")
            .await
            .unwrap();
        service.join_church(&alice.id, "Grace Chapel").await.unwrap();
        service.join_church(&bob.id, "Grace Chapel").await.unwrap();

        let profile = service
            .get_profile(Some(&bob.id), &alice.id)
            .await
            .unwrap();
        assert_eq!(profile.id, alice.id);

        // Leaving the church revokes access.
        service.leave_church(&bob.id).await.unwrap();
        let error = service
            .get_profile(Some(&bob.id), &alice.id)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::PolicyDenied(_)));
    }

    #[tokio::test]
    async fn update_profile_normalizes_and_sanitizes() {
        let (service, _db, _temp_dir) = create_service().await;
        let alice = service.register("alice", "hunter2hunter2", None).await.unwrap();

        let updated = service
            .update_profile(
                &alice.id,
                Some("  Alice A.  ".to_string()),
                Some("hello <script>alert(1)</script>world".to_string()),
                None,
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name, Some("Alice A.".to_string()));
        let bio = updated.bio.unwrap();
        assert!(!bio.contains("<script>"));
        assert!(bio.contains("world"));

        let cleared = service
            .update_profile(&alice.id, Some("   ".to_string()), None, None)
            .await
            .unwrap();
        assert_eq!(cleared.display_name, None);
    }
}
