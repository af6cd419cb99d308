//! Action rate limiting
//!
//! Named-action fixed-window limiter with a per-action cooldown between
//! attempts. State lives in an injected in-process store with explicit
//! construction and clearing; it is per-process, not distributed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::metrics::RATE_LIMIT_CHECKS_TOTAL;

/// Limits for one named action
#[derive(Debug, Clone, Copy)]
pub struct RateLimitRule {
    /// Maximum attempts per window
    pub max_attempts: u32,
    /// Window duration
    pub window: Duration,
    /// Minimum spacing between consecutive attempts
    pub cooldown: Duration,
}

impl RateLimitRule {
    pub const fn new(max_attempts: u32, window: Duration, cooldown: Duration) -> Self {
        Self {
            max_attempts,
            window,
            cooldown,
        }
    }
}

/// Outcome of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    /// How long until the action may be retried
    pub retry_after: Option<Duration>,
    /// Denial reason, suitable for display
    pub reason: Option<String>,
}

impl RateLimitDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            retry_after: None,
            reason: None,
        }
    }

    fn deny(retry_after: Duration, reason: String) -> Self {
        Self {
            allowed: false,
            retry_after: Some(retry_after),
            reason: Some(reason),
        }
    }

    /// Convert to a `Result`, mapping a denial to `AppError::RateLimited`.
    pub fn require(self) -> Result<(), AppError> {
        if self.allowed {
            Ok(())
        } else {
            let retry_after = self.retry_after.unwrap_or_default();
            Err(AppError::RateLimited {
                reason: self
                    .reason
                    .unwrap_or_else(|| "Too many attempts".to_string()),
                retry_after_seconds: retry_after.as_secs_f64().ceil() as u64,
            })
        }
    }
}

fn format_wait(duration: Duration) -> String {
    let seconds = duration.as_secs_f64().ceil() as u64;
    if seconds >= 120 {
        format!("try again in {} minutes", seconds.div_ceil(60))
    } else if seconds > 1 {
        format!("try again in {} seconds", seconds)
    } else {
        "try again in a moment".to_string()
    }
}

/// Recorded attempts for one action/actor key
#[derive(Debug, Clone, Default)]
struct AttemptLog {
    /// Timestamps of attempts inside the current window
    attempts: Vec<Instant>,
    /// Most recent attempt, for cooldown spacing
    last_attempt: Option<Instant>,
}

impl AttemptLog {
    /// Drop attempts older than the window
    fn prune(&mut self, window: Duration) {
        self.attempts.retain(|at| at.elapsed() < window);
    }

    /// Whether this entry holds no attempts worth remembering
    fn is_expired(&self, window: Duration, cooldown: Duration) -> bool {
        self.attempts.iter().all(|at| at.elapsed() >= window)
            && self
                .last_attempt
                .map(|at| at.elapsed() >= window.max(cooldown))
                .unwrap_or(true)
    }
}

/// Rate limiter over a named-action rule table
///
/// Keys are `action:actor` pairs. Checking prunes expired attempts and
/// denies on cooldown spacing or a full window; recording appends an
/// attempt after the caller performs the allowed action.
pub struct RateLimiter {
    /// Attempt logs: "action:actor" -> log
    entries: Arc<RwLock<HashMap<String, AttemptLog>>>,
    /// Rules by action name
    rules: HashMap<&'static str, RateLimitRule>,
    /// Maximum number of tracked keys in memory
    max_tracked_keys: usize,
}

impl RateLimiter {
    /// Create a limiter with the built-in action table.
    pub fn new(max_tracked_keys: usize) -> Self {
        let mut rules = HashMap::new();
        rules.insert(
            "send_message",
            RateLimitRule::new(10, Duration::from_secs(60), Duration::from_secs(5)),
        );
        rules.insert(
            "create_testimony",
            RateLimitRule::new(5, Duration::from_secs(3600), Duration::from_secs(30)),
        );
        rules.insert(
            "friend_request",
            RateLimitRule::new(20, Duration::from_secs(3600), Duration::from_secs(2)),
        );
        rules.insert(
            "report",
            RateLimitRule::new(5, Duration::from_secs(3600), Duration::from_secs(10)),
        );
        rules.insert(
            "generate_testimony",
            RateLimitRule::new(3, Duration::from_secs(3600), Duration::from_secs(60)),
        );

        Self::with_rules(rules, max_tracked_keys)
    }

    /// Create a limiter with an explicit rule table.
    pub fn with_rules(
        rules: HashMap<&'static str, RateLimitRule>,
        max_tracked_keys: usize,
    ) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            rules,
            max_tracked_keys: max_tracked_keys.max(1),
        }
    }

    fn key(action: &str, actor: &str) -> String {
        format!("{}:{}", action, actor)
    }

    fn prune_expired_locked(
        entries: &mut HashMap<String, AttemptLog>,
        window: Duration,
        cooldown: Duration,
    ) -> usize {
        let before = entries.len();
        entries.retain(|_, log| !log.is_expired(window, cooldown));
        before - entries.len()
    }

    fn evict_oldest_locked(entries: &mut HashMap<String, AttemptLog>) -> bool {
        let Some(oldest_key) = entries
            .iter()
            .min_by_key(|(_, log)| log.last_attempt)
            .map(|(key, _)| key.clone())
        else {
            return false;
        };
        entries.remove(&oldest_key);
        true
    }

    /// Check whether `actor` may perform `action` now.
    ///
    /// Does not count as an attempt; call [`Self::record_attempt`] after
    /// the action succeeds. Actions without a configured rule are
    /// always allowed.
    pub async fn check(&self, action: &str, actor: &str) -> RateLimitDecision {
        let Some(rule) = self.rules.get(action) else {
            return RateLimitDecision::allow();
        };

        let decision = self.check_against_rule(rule, action, actor).await;
        let outcome = if decision.allowed { "allow" } else { "deny" };
        RATE_LIMIT_CHECKS_TOTAL
            .with_label_values(&[action, outcome])
            .inc();
        decision
    }

    async fn check_against_rule(
        &self,
        rule: &RateLimitRule,
        action: &str,
        actor: &str,
    ) -> RateLimitDecision {
        let key = Self::key(action, actor);
        let mut entries = self.entries.write().await;

        let Some(log) = entries.get_mut(&key) else {
            return RateLimitDecision::allow();
        };
        log.prune(rule.window);

        if !rule.cooldown.is_zero() {
            if let Some(last) = log.last_attempt {
                let since_last = last.elapsed();
                if since_last < rule.cooldown {
                    let retry_after = rule.cooldown - since_last;
                    return RateLimitDecision::deny(
                        retry_after,
                        format!("You're doing that too fast, {}", format_wait(retry_after)),
                    );
                }
            }
        }

        if log.attempts.len() >= rule.max_attempts as usize {
            // Oldest in-window attempt decides when a slot frees up.
            let retry_after = log
                .attempts
                .iter()
                .min()
                .map(|oldest| rule.window.saturating_sub(oldest.elapsed()))
                .unwrap_or(rule.window);
            return RateLimitDecision::deny(
                retry_after,
                format!("Too many attempts, {}", format_wait(retry_after)),
            );
        }

        RateLimitDecision::allow()
    }

    /// Record a completed attempt for `actor` on `action`.
    pub async fn record_attempt(&self, action: &str, actor: &str) {
        let Some(rule) = self.rules.get(action) else {
            return;
        };

        let key = Self::key(action, actor);
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_tracked_keys {
            Self::prune_expired_locked(&mut entries, rule.window, rule.cooldown);
            if entries.len() >= self.max_tracked_keys {
                let _ = Self::evict_oldest_locked(&mut entries);
            }
        }

        let log = entries.entry(key).or_default();
        log.prune(rule.window);
        let now = Instant::now();
        log.attempts.push(now);
        log.last_attempt = Some(now);
    }

    /// Reset attempts for one action/actor pair
    pub async fn reset(&self, action: &str, actor: &str) {
        let mut entries = self.entries.write().await;
        entries.remove(&Self::key(action, actor));
    }

    /// Clear all attempt state
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();
    }

    /// Prune expired entries
    ///
    /// Should be called periodically to clean up old keys.
    pub async fn prune_old(&self) {
        let max_window = self
            .rules
            .values()
            .map(|rule| rule.window.max(rule.cooldown))
            .max()
            .unwrap_or(Duration::from_secs(3600));

        let mut entries = self.entries.write().await;
        let removed = Self::prune_expired_locked(&mut entries, max_window, Duration::ZERO);

        if removed > 0 {
            tracing::debug!("Pruned {} old rate limit entries", removed);
        }
    }

    /// Get rate limiter statistics
    pub async fn stats(&self) -> RateLimitStats {
        let entries = self.entries.read().await;

        RateLimitStats {
            total_entries: entries.len(),
            rules: self.rules.len(),
            max_tracked_keys: self.max_tracked_keys,
        }
    }
}

/// Rate limiter statistics
#[derive(Debug, Clone)]
pub struct RateLimitStats {
    /// Total number of tracked keys
    pub total_entries: usize,
    /// Number of configured action rules
    pub rules: usize,
    /// Maximum number of keys tracked in memory
    pub max_tracked_keys: usize,
}
