//! Common test utilities for E2E tests

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use lightning::policy::{RateLimitRule, RateLimiter};
use lightning::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Relaxed rules so sequential test actions never trip cooldowns.
pub fn relaxed_rate_limit_rules() -> HashMap<&'static str, RateLimitRule> {
    let mut rules = HashMap::new();
    for action in [
        "send_message",
        "create_testimony",
        "friend_request",
        "report",
        "generate_testimony",
    ] {
        rules.insert(
            action,
            RateLimitRule::new(1000, Duration::from_secs(60), Duration::ZERO),
        );
    }
    rules
}

impl TestServer {
    /// Create a new test server with relaxed rate limits.
    pub async fn new() -> Self {
        Self::with_rate_limit_rules(relaxed_rate_limit_rules()).await
    }

    /// Create a new test server with an explicit rate limit rule table.
    pub async fn with_rate_limit_rules(rules: HashMap<&'static str, RateLimitRule>) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        // Initialize app state
        let mut state = AppState::new(test_config(db_path)).await.unwrap();
        state.rate_limiter = std::sync::Arc::new(RateLimiter::with_rules(rules, 1000));

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        // Build router
        let app = lightning::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Register a user through the API.
    ///
    /// # Returns
    /// (user_id, bearer token)
    pub async fn register_user(&self, username: &str) -> (String, String) {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(&serde_json::json!({
                "username": username,
                "password": "test-password-123",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "registration failed for {username}");

        let body: serde_json::Value = response.json().await.unwrap();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        let token = body["token"].as_str().unwrap().to_string();
        (user_id, token)
    }

    /// Log in as the bootstrap admin user.
    ///
    /// # Returns
    /// (user_id, bearer token)
    pub async fn login_admin(&self) -> (String, String) {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&serde_json::json!({
                "username": "admin",
                "password": "test-admin-password",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "admin login failed");

        let body: serde_json::Value = response.json().await.unwrap();
        let user_id = body["user"]["id"].as_str().unwrap().to_string();
        let token = body["token"].as_str().unwrap().to_string();
        (user_id, token)
    }

    /// Authenticated GET returning the parsed body.
    pub async fn get_json(&self, token: &str, path: &str) -> (u16, serde_json::Value) {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Authenticated POST returning the parsed body.
    pub async fn post_json(
        &self,
        token: &str,
        path: &str,
        body: serde_json::Value,
    ) -> (u16, serde_json::Value) {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    /// Join a church for the given user.
    pub async fn join_church(&self, token: &str, name: &str) {
        let (status, _) = self
            .post_json(token, "/api/v1/profiles/me/church", serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, 200);
    }
}

fn test_config(db_path: PathBuf) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        database: config::DatabaseConfig { path: db_path },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604800,
        },
        instance: config::InstanceConfig {
            title: "Lightning Test".to_string(),
            description: "Test instance".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        admin: config::AdminConfig {
            username: "admin".to_string(),
            display_name: "Admin".to_string(),
            password: Some("test-admin-password".to_string()),
        },
        rate_limit: config::RateLimitConfig {
            max_tracked_keys: 1000,
            prune_interval_seconds: 300,
        },
        generation: config::GenerationConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}
