//! Message service
//!
//! Direct messages between users. Sending runs the message permission
//! check and the send rate limit before any row is written.

use std::sync::Arc;

use crate::data::{Database, EntityId, Message};
use crate::error::AppError;
use crate::policy::{PolicyEngine, RateLimiter};

const MAX_BODY_LEN: usize = 5000;

/// How many recent messages are scanned to assemble the conversation list.
const CONVERSATION_SCAN_LIMIT: usize = 500;

/// One entry in a user's conversation list
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    /// The other participant
    pub partner_id: String,
    /// Most recent message in the conversation
    pub last_message: Message,
    /// Unread messages from this partner
    pub unread: usize,
}

/// Message service
pub struct MessageService {
    db: Arc<Database>,
    policy: PolicyEngine<Database>,
    rate_limiter: Arc<RateLimiter>,
}

impl MessageService {
    /// Create new message service
    pub fn new(
        db: Arc<Database>,
        policy: PolicyEngine<Database>,
        rate_limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            db,
            policy,
            rate_limiter,
        }
    }

    /// Send a direct message
    ///
    /// Order matters: the rate limit is checked first (cheap, local),
    /// then the permission policy, and the attempt is recorded only
    /// after the message is stored.
    pub async fn send(
        &self,
        sender_id: &str,
        recipient_id: &str,
        body: &str,
    ) -> Result<Message, AppError> {
        let body = body.trim();
        if body.is_empty() {
            return Err(AppError::Validation("message cannot be empty".to_string()));
        }
        if body.len() > MAX_BODY_LEN {
            return Err(AppError::Validation(format!(
                "message must be at most {} characters",
                MAX_BODY_LEN
            )));
        }

        self.rate_limiter
            .check("send_message", sender_id)
            .await
            .require()?;

        self.policy
            .can_send_message(sender_id, recipient_id)
            .await
            .require()?;

        let message = Message {
            id: EntityId::new().0,
            sender_id: sender_id.to_string(),
            recipient_id: recipient_id.to_string(),
            body: body.to_string(),
            read: false,
            created_at: chrono::Utc::now(),
        };
        self.db.insert_message(&message).await?;
        self.rate_limiter
            .record_attempt("send_message", sender_id)
            .await;
        crate::metrics::MESSAGES_TOTAL.set(self.db.count_messages().await?);

        Ok(message)
    }

    /// Messages between the user and another participant, newest first
    pub async fn conversation(
        &self,
        user_id: &str,
        other_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, AppError> {
        self.db.list_conversation(user_id, other_id, limit).await
    }

    /// The user's conversations, most recently active first.
    pub async fn conversations(
        &self,
        user_id: &str,
    ) -> Result<Vec<ConversationSummary>, AppError> {
        let recent = self
            .db
            .list_user_messages(user_id, CONVERSATION_SCAN_LIMIT)
            .await?;

        // Messages arrive newest first; the first message per partner
        // is the conversation head.
        let mut summaries: Vec<ConversationSummary> = Vec::new();
        for message in recent {
            let partner_id = if message.sender_id == user_id {
                message.recipient_id.clone()
            } else {
                message.sender_id.clone()
            };

            let unread_here = (message.recipient_id == user_id && !message.read) as usize;
            match summaries
                .iter_mut()
                .find(|summary| summary.partner_id == partner_id)
            {
                Some(summary) => summary.unread += unread_here,
                None => summaries.push(ConversationSummary {
                    partner_id,
                    last_message: message,
                    unread: unread_here,
                }),
            }
        }

        Ok(summaries)
    }

    /// Mark all messages from `other_id` as read.
    ///
    /// # Returns
    /// Number of messages marked.
    pub async fn mark_read(&self, user_id: &str, other_id: &str) -> Result<u64, AppError> {
        self.db.mark_conversation_read(user_id, other_id).await
    }

    /// Count of the user's unread messages
    pub async fn unread_count(&self, user_id: &str) -> Result<i64, AppError> {
        self.db.count_unread_messages(user_id).await
    }
}
