//! Visibility and permission decisions
//!
//! Pure decision logic over an injected [`PolicyStore`]. Every check is
//! fail-closed: a missing row, an unrecognized stored flag, or a lookup
//! error all resolve to deny. Denials carry a user-facing reason that
//! surfaces as a 403 body.

use std::sync::Arc;

use super::store::{PolicyStore, UserPrivacy};
use crate::data::{MessagePrivacy, ProfileVisibility, TestimonyVisibility};
use crate::error::AppError;
use crate::metrics::POLICY_DECISIONS_TOTAL;

/// Outcome of a policy check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Denial reason, suitable for display
    pub reason: Option<String>,
}

impl Decision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }

    /// Convert to a `Result`, mapping a denial to `AppError::PolicyDenied`.
    pub fn require(self) -> Result<(), AppError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AppError::PolicyDenied(
                self.reason
                    .unwrap_or_else(|| "Access denied".to_string()),
            ))
        }
    }
}

fn record_decision(check: &str, decision: &Decision) {
    let outcome = if decision.allowed { "allow" } else { "deny" };
    POLICY_DECISIONS_TOTAL
        .with_label_values(&[check, outcome])
        .inc();
}

/// Two users share a church only when both church IDs are present and
/// equal. Two null churches never match.
fn same_church(a: &UserPrivacy, b: &UserPrivacy) -> bool {
    match (&a.church_id, &b.church_id) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Policy evaluator
///
/// Cheap to clone; holds only the store handle.
pub struct PolicyEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for PolicyEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: PolicyStore> PolicyEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Decide whether `viewer_id` may view testimony `testimony_id`.
    ///
    /// Owners always see their own testimonies. Otherwise the tier
    /// decides: `shareable` admits anyone; `my_church` requires a shared
    /// non-null church; `all_churches` additionally admits accepted
    /// friends (either orientation) and followers of the owner.
    pub async fn can_view_testimony(&self, viewer_id: &str, testimony_id: &str) -> Decision {
        let decision = self.view_testimony_inner(viewer_id, testimony_id).await;
        record_decision("view_testimony", &decision);
        decision
    }

    async fn view_testimony_inner(&self, viewer_id: &str, testimony_id: &str) -> Decision {
        const DENIED: &str = "This testimony is not visible to you";

        let testimony = match self.store.load_testimony(testimony_id).await {
            Ok(Some(testimony)) => testimony,
            Ok(None) => return Decision::deny(DENIED),
            Err(error) => {
                tracing::warn!(%error, testimony_id, "testimony lookup failed; denying");
                return Decision::deny(DENIED);
            }
        };

        if testimony.owner_id == viewer_id {
            return Decision::allow();
        }

        let Some(visibility) = TestimonyVisibility::parse(&testimony.visibility) else {
            tracing::warn!(
                testimony_id,
                visibility = %testimony.visibility,
                "unrecognized testimony visibility; denying"
            );
            return Decision::deny(DENIED);
        };

        if visibility == TestimonyVisibility::Shareable {
            return Decision::allow();
        }

        let owner = match self.store.load_privacy(&testimony.owner_id).await {
            Ok(Some(owner)) => owner,
            Ok(None) => return Decision::deny(DENIED),
            Err(error) => {
                tracing::warn!(%error, owner_id = %testimony.owner_id, "owner lookup failed; denying");
                return Decision::deny(DENIED);
            }
        };
        let viewer = match self.store.load_privacy(viewer_id).await {
            Ok(Some(viewer)) => viewer,
            Ok(None) => return Decision::deny(DENIED),
            Err(error) => {
                tracing::warn!(%error, viewer_id, "viewer lookup failed; denying");
                return Decision::deny(DENIED);
            }
        };

        match visibility {
            TestimonyVisibility::MyChurch => {
                if same_church(&owner, &viewer) {
                    Decision::allow()
                } else {
                    Decision::deny(DENIED)
                }
            }
            TestimonyVisibility::AllChurches => {
                if same_church(&owner, &viewer) {
                    return Decision::allow();
                }
                match self
                    .store
                    .accepted_friendship_exists(viewer_id, &testimony.owner_id)
                    .await
                {
                    Ok(true) => return Decision::allow(),
                    Ok(false) => {}
                    Err(error) => {
                        tracing::warn!(%error, "friendship lookup failed; denying");
                        return Decision::deny(DENIED);
                    }
                }
                match self
                    .store
                    .follow_exists(viewer_id, &testimony.owner_id)
                    .await
                {
                    Ok(true) => Decision::allow(),
                    Ok(false) => Decision::deny(DENIED),
                    Err(error) => {
                        tracing::warn!(%error, "follow lookup failed; denying");
                        Decision::deny(DENIED)
                    }
                }
            }
            TestimonyVisibility::Shareable => Decision::allow(),
        }
    }

    /// Decide whether `sender_id` may send a direct message to
    /// `recipient_id`.
    ///
    /// Self-sends and blocked pairs are always denied. The recipient's
    /// message privacy then decides: `everyone` admits anyone; `friends`
    /// admits accepted friends and church members; `none` admits nobody.
    pub async fn can_send_message(&self, sender_id: &str, recipient_id: &str) -> Decision {
        let decision = self.send_message_inner(sender_id, recipient_id).await;
        record_decision("send_message", &decision);
        decision
    }

    async fn send_message_inner(&self, sender_id: &str, recipient_id: &str) -> Decision {
        const UNAVAILABLE: &str = "This user cannot receive messages right now";

        if sender_id == recipient_id {
            return Decision::deny("You cannot message yourself");
        }

        match self
            .store
            .block_exists_between(sender_id, recipient_id)
            .await
        {
            Ok(true) => return Decision::deny(UNAVAILABLE),
            Ok(false) => {}
            Err(error) => {
                tracing::warn!(%error, "block lookup failed; denying");
                return Decision::deny(UNAVAILABLE);
            }
        }

        let recipient = match self.store.load_privacy(recipient_id).await {
            Ok(Some(recipient)) => recipient,
            Ok(None) => return Decision::deny(UNAVAILABLE),
            Err(error) => {
                tracing::warn!(%error, recipient_id, "recipient lookup failed; denying");
                return Decision::deny(UNAVAILABLE);
            }
        };

        let Some(privacy) = MessagePrivacy::parse(&recipient.message_privacy) else {
            tracing::warn!(
                recipient_id,
                message_privacy = %recipient.message_privacy,
                "unrecognized message privacy; denying"
            );
            return Decision::deny(UNAVAILABLE);
        };

        match privacy {
            MessagePrivacy::Everyone => Decision::allow(),
            MessagePrivacy::None => Decision::deny("This user has disabled messages"),
            MessagePrivacy::Friends => {
                match self
                    .store
                    .accepted_friendship_exists(sender_id, recipient_id)
                    .await
                {
                    Ok(true) => return Decision::allow(),
                    Ok(false) => {}
                    Err(error) => {
                        tracing::warn!(%error, "friendship lookup failed; denying");
                        return Decision::deny(UNAVAILABLE);
                    }
                }

                let sender = match self.store.load_privacy(sender_id).await {
                    Ok(Some(sender)) => sender,
                    Ok(None) => return Decision::deny(UNAVAILABLE),
                    Err(error) => {
                        tracing::warn!(%error, sender_id, "sender lookup failed; denying");
                        return Decision::deny(UNAVAILABLE);
                    }
                };

                if same_church(&sender, &recipient) {
                    Decision::allow()
                } else {
                    Decision::deny(
                        "This user only accepts messages from friends and church members",
                    )
                }
            }
        }
    }

    /// Decide whether `viewer` may view the profile of `target_id`.
    ///
    /// An anonymous viewer is denied anything non-public. Private
    /// profiles admit church members and accepted friends.
    pub async fn is_profile_visible(&self, viewer: Option<&str>, target_id: &str) -> Decision {
        let decision = self.profile_visible_inner(viewer, target_id).await;
        record_decision("view_profile", &decision);
        decision
    }

    async fn profile_visible_inner(&self, viewer: Option<&str>, target_id: &str) -> Decision {
        const DENIED: &str = "This profile is private";

        let target = match self.store.load_privacy(target_id).await {
            Ok(Some(target)) => target,
            Ok(None) => return Decision::deny(DENIED),
            Err(error) => {
                tracing::warn!(%error, target_id, "target lookup failed; denying");
                return Decision::deny(DENIED);
            }
        };

        let Some(visibility) = ProfileVisibility::parse(&target.profile_visibility) else {
            tracing::warn!(
                target_id,
                profile_visibility = %target.profile_visibility,
                "unrecognized profile visibility; denying"
            );
            return Decision::deny(DENIED);
        };

        if visibility == ProfileVisibility::Public {
            return Decision::allow();
        }

        let Some(viewer_id) = viewer.filter(|id| !id.is_empty()) else {
            return Decision::deny(DENIED);
        };

        if viewer_id == target_id {
            return Decision::allow();
        }

        let viewer_privacy = match self.store.load_privacy(viewer_id).await {
            Ok(Some(viewer_privacy)) => viewer_privacy,
            Ok(None) => return Decision::deny(DENIED),
            Err(error) => {
                tracing::warn!(%error, viewer_id, "viewer lookup failed; denying");
                return Decision::deny(DENIED);
            }
        };

        if same_church(&target, &viewer_privacy) {
            return Decision::allow();
        }

        match self
            .store
            .accepted_friendship_exists(viewer_id, target_id)
            .await
        {
            Ok(true) => Decision::allow(),
            Ok(false) => Decision::deny(DENIED),
            Err(error) => {
                tracing::warn!(%error, "friendship lookup failed; denying");
                Decision::deny(DENIED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::store::{MockPolicyStore, TestimonyRecord};

    fn privacy(
        profile_visibility: &str,
        message_privacy: &str,
        church_id: Option<&str>,
    ) -> UserPrivacy {
        UserPrivacy {
            profile_visibility: profile_visibility.to_string(),
            message_privacy: message_privacy.to_string(),
            church_id: church_id.map(ToOwned::to_owned),
        }
    }

    fn testimony(owner_id: &str, visibility: &str) -> TestimonyRecord {
        TestimonyRecord {
            owner_id: owner_id.to_string(),
            visibility: visibility.to_string(),
        }
    }

    fn engine(store: MockPolicyStore) -> PolicyEngine<MockPolicyStore> {
        PolicyEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn shareable_testimony_visible_to_anyone() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "shareable"))));

        let decision = engine(store).can_view_testimony("stranger", "t1").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn owner_always_sees_own_testimony() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "my_church"))));

        let decision = engine(store).can_view_testimony("alice", "t1").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn my_church_requires_shared_non_null_church() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "my_church"))));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "everyone", Some("grace-chapel")))));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn my_church_denies_two_null_churches() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "my_church"))));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "everyone", None))));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn friendship_does_not_satisfy_my_church() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "my_church"))));
        store.expect_load_privacy().returning(|id| {
            Ok(Some(match id {
                "alice" => privacy("public", "everyone", Some("grace-chapel")),
                _ => privacy("public", "everyone", Some("hope-fellowship")),
            }))
        });
        // Friendship lookup must never be consulted for my_church.
        store.expect_accepted_friendship_exists().never();

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn all_churches_admits_shared_church_without_friendship() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "all_churches"))));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "everyone", Some("grace-chapel")))));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn all_churches_admits_accepted_friend() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "all_churches"))));
        store.expect_load_privacy().returning(|id| {
            Ok(Some(match id {
                "alice" => privacy("public", "everyone", Some("grace-chapel")),
                _ => privacy("public", "everyone", None),
            }))
        });
        store
            .expect_accepted_friendship_exists()
            .returning(|_, _| Ok(true));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn all_churches_admits_follower() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "all_churches"))));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "everyone", None))));
        store
            .expect_accepted_friendship_exists()
            .returning(|_, _| Ok(false));
        store.expect_follow_exists().returning(|_, _| Ok(true));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn all_churches_denies_unrelated_viewer() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "all_churches"))));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "everyone", None))));
        store
            .expect_accepted_friendship_exists()
            .returning(|_, _| Ok(false));
        store.expect_follow_exists().returning(|_, _| Ok(false));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn missing_testimony_denies() {
        let mut store = MockPolicyStore::new();
        store.expect_load_testimony().returning(|_| Ok(None));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn lookup_failure_fails_closed() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Err(AppError::Validation("boom".to_string())));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn unrecognized_visibility_fails_closed() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_testimony()
            .returning(|_| Ok(Some(testimony("alice", "secret"))));

        let decision = engine(store).can_view_testimony("bob", "t1").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn self_message_always_denied() {
        let store = MockPolicyStore::new();

        let decision = engine(store).can_send_message("alice", "alice").await;
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason.as_deref(),
            Some("You cannot message yourself")
        );
    }

    #[tokio::test]
    async fn message_everyone_allows_stranger() {
        let mut store = MockPolicyStore::new();
        store
            .expect_block_exists_between()
            .returning(|_, _| Ok(false));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "everyone", None))));

        let decision = engine(store).can_send_message("bob", "alice").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn message_none_denies_everyone() {
        let mut store = MockPolicyStore::new();
        store
            .expect_block_exists_between()
            .returning(|_, _| Ok(false));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "none", None))));

        let decision = engine(store).can_send_message("bob", "alice").await;
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason.as_deref(),
            Some("This user has disabled messages")
        );
    }

    #[tokio::test]
    async fn message_friends_admits_church_member() {
        let mut store = MockPolicyStore::new();
        store
            .expect_block_exists_between()
            .returning(|_, _| Ok(false));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "friends", Some("grace-chapel")))));
        store
            .expect_accepted_friendship_exists()
            .returning(|_, _| Ok(false));

        let decision = engine(store).can_send_message("bob", "alice").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn message_friends_denies_stranger_with_reason() {
        let mut store = MockPolicyStore::new();
        store
            .expect_block_exists_between()
            .returning(|_, _| Ok(false));
        store.expect_load_privacy().returning(|id| {
            Ok(Some(match id {
                "alice" => privacy("public", "friends", Some("grace-chapel")),
                _ => privacy("public", "everyone", None),
            }))
        });
        store
            .expect_accepted_friendship_exists()
            .returning(|_, _| Ok(false));

        let decision = engine(store).can_send_message("bob", "alice").await;
        assert!(!decision.allowed);
        assert_eq!(
            decision.reason.as_deref(),
            Some("This user only accepts messages from friends and church members")
        );
    }

    #[tokio::test]
    async fn message_blocked_pair_denied() {
        let mut store = MockPolicyStore::new();
        store
            .expect_block_exists_between()
            .returning(|_, _| Ok(true));

        let decision = engine(store).can_send_message("bob", "alice").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn unrecognized_message_privacy_fails_closed() {
        let mut store = MockPolicyStore::new();
        store
            .expect_block_exists_between()
            .returning(|_, _| Ok(false));
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "mutuals", None))));

        let decision = engine(store).can_send_message("bob", "alice").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn public_profile_visible_to_anonymous() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("public", "everyone", None))));

        let decision = engine(store).is_profile_visible(None, "alice").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn private_profile_denies_anonymous() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("private", "everyone", None))));

        let decision = engine(store).is_profile_visible(None, "alice").await;
        assert!(!decision.allowed);

        let mut store = MockPolicyStore::new();
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("private", "everyone", None))));
        let decision = engine(store).is_profile_visible(Some(""), "alice").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn private_profile_visible_to_self() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("private", "everyone", None))));

        let decision = engine(store)
            .is_profile_visible(Some("alice"), "alice")
            .await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn private_profile_visible_to_friend() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("private", "everyone", None))));
        store
            .expect_accepted_friendship_exists()
            .returning(|_, _| Ok(true));

        let decision = engine(store).is_profile_visible(Some("bob"), "alice").await;
        assert!(decision.allowed);
    }

    #[tokio::test]
    async fn private_profile_denies_stranger() {
        let mut store = MockPolicyStore::new();
        store
            .expect_load_privacy()
            .returning(|_| Ok(Some(privacy("private", "everyone", None))));
        store
            .expect_accepted_friendship_exists()
            .returning(|_, _| Ok(false));

        let decision = engine(store).is_profile_visible(Some("bob"), "alice").await;
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn audience_widens_monotonically() {
        // A viewer admitted at my_church is admitted at every wider tier.
        for visibility in ["my_church", "all_churches", "shareable"] {
            let mut store = MockPolicyStore::new();
            let visibility_owned = visibility.to_string();
            store.expect_load_testimony().returning(move |_| {
                Ok(Some(testimony("alice", &visibility_owned)))
            });
            store
                .expect_load_privacy()
                .returning(|_| Ok(Some(privacy("public", "everyone", Some("grace-chapel")))));
            store
                .expect_accepted_friendship_exists()
                .returning(|_, _| Ok(false));
            store.expect_follow_exists().returning(|_, _| Ok(false));

            let decision = engine(store).can_view_testimony("bob", "t1").await;
            assert!(decision.allowed, "church member denied at {visibility}");
        }
    }
}
