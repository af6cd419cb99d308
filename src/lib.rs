//! Lightning - A faith-based social networking server
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Profiles, testimonies, messages, social graph            │
//! │  - Moderation / admin endpoints                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Business logic                                           │
//! │  - Policy engine + rate limiter enforcement                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `policy`: Visibility/permission decisions and rate limiting
//! - `data`: Database layer
//! - `generation`: Testimony draft generation (Anthropic API)
//! - `auth`: Sessions and password auth
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod policy;
pub mod service;

use std::sync::Arc;

use policy::{PolicyEngine, RateLimiter};
use service::{
    MessageService, ModerationService, ProfileService, SocialService, TestimonyService,
};

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and rate limiter.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Policy engine over the database
    pub policy: PolicyEngine<data::Database>,

    /// Per-action rate limiter
    pub rate_limiter: Arc<RateLimiter>,

    /// Testimony draft generator (None when not configured)
    pub generator: Option<Arc<generation::TestimonyGenerator>>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Build the policy engine and rate limiter
    /// 3. Initialize the testimony generator (if configured)
    /// 4. Ensure the admin user exists
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        // 1. Connect to SQLite database
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // 2. Policy engine and rate limiter
        let policy = PolicyEngine::new(db.clone());
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.max_tracked_keys));

        // 3. Testimony generator
        let generator = generation::TestimonyGenerator::from_config(&config.generation)?
            .map(Arc::new);
        if generator.is_some() {
            tracing::info!("Testimony generation enabled");
        } else {
            tracing::info!("Testimony generation disabled (no API key configured)");
        }

        // 4. Ensure admin user
        Self::ensure_admin_user(&db, &config).await?;

        // 5. Seed application gauges
        metrics::USERS_TOTAL.set(db.count_users().await?);
        metrics::TESTIMONIES_TOTAL.set(db.count_testimonies().await?);
        metrics::MESSAGES_TOTAL.set(db.count_messages().await?);
        metrics::OPEN_REPORTS_TOTAL.set(db.count_open_reports().await?);

        tracing::info!("Application state initialized successfully");

        Ok(Self {
            config: Arc::new(config),
            db,
            policy,
            rate_limiter,
            generator,
        })
    }

    /// Ensure the admin user exists with current configuration
    ///
    /// Creates the admin account on first startup. If no password is
    /// configured, a random one is generated and logged once.
    async fn ensure_admin_user(
        db: &data::Database,
        config: &config::AppConfig,
    ) -> Result<(), error::AppError> {
        use crate::auth::session::hash_password;

        let username = config.admin.username.trim().to_ascii_lowercase();

        if let Some(existing) = db.get_user_by_username(&username).await? {
            if !existing.is_admin {
                db.promote_to_admin(&existing.id).await?;
                tracing::info!(username = %existing.username, "Admin rights restored");
            } else {
                tracing::info!(username = %existing.username, "Admin account exists");
            }
            return Ok(());
        }

        tracing::info!("Creating admin account...");

        let password = match &config.admin.password {
            Some(password) if !password.trim().is_empty() => password.clone(),
            _ => {
                let generated = generate_password();
                tracing::warn!(
                    username = %username,
                    password = %generated,
                    "No admin password configured; generated one-time password"
                );
                generated
            }
        };

        let now = chrono::Utc::now();
        let admin = data::User {
            id: data::EntityId::new().0,
            username,
            display_name: Some(config.admin.display_name.clone()),
            bio: None,
            avatar_url: None,
            profile_visibility: data::ProfileVisibility::Public.as_str().to_string(),
            message_privacy: data::MessagePrivacy::Everyone.as_str().to_string(),
            church_id: None,
            password_hash: hash_password(&password),
            is_admin: true,
            created_at: now,
            updated_at: now,
        };
        db.insert_user(&admin).await?;

        tracing::info!(
            username = %admin.username,
            display_name = ?admin.display_name,
            "Admin account created"
        );

        Ok(())
    }

    // =========================================================================
    // Service accessors
    // =========================================================================

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(self.db.clone(), self.policy.clone())
    }

    pub fn testimonies(&self) -> TestimonyService {
        TestimonyService::new(
            self.db.clone(),
            self.policy.clone(),
            self.rate_limiter.clone(),
            self.generator.clone(),
        )
    }

    pub fn messages(&self) -> MessageService {
        MessageService::new(
            self.db.clone(),
            self.policy.clone(),
            self.rate_limiter.clone(),
        )
    }

    pub fn social(&self) -> SocialService {
        SocialService::new(self.db.clone(), self.rate_limiter.clone())
    }

    pub fn moderation(&self) -> ModerationService {
        ModerationService::new(self.db.clone(), self.rate_limiter.clone())
    }
}

fn generate_password() -> String {
    use rand::Rng;
    use rand::distributions::Alphanumeric;

    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{compression::CompressionLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);

    let admin_routes = api::admin_router().layer(axum::middleware::from_fn_with_state(
        state.clone(),
        auth::require_admin,
    ));

    let api_routes = api::profiles_router()
        .merge(api::testimonies_router())
        .merge(api::messages_router())
        .merge(api::social_router())
        .merge(api::moderation_router())
        .nest("/admin", admin_routes);

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(auth::auth_router())
        .nest("/api/v1", api_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
