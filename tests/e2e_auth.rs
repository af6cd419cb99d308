//! Registration, login, and session tests

mod common;

use common::TestServer;

#[tokio::test]
async fn register_login_and_fetch_own_profile() {
    let server = TestServer::new().await;

    let (user_id, token) = server.register_user("alice").await;

    let (status, profile) = server.get_json(&token, "/api/v1/profiles/me").await;
    assert_eq!(status, 200);
    assert_eq!(profile["id"], serde_json::json!(user_id));
    assert_eq!(profile["username"], serde_json::json!("alice"));
    // Credential material is never serialized.
    assert!(profile.get("password_hash").is_none());

    let response = server
        .client
        .post(server.url("/auth/login"))
        .json(&serde_json::json!({
            "username": "alice",
            "password": "test-password-123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let server = TestServer::new().await;
    server.register_user("alice").await;

    let response = server
        .client
        .post(server.url("/auth/login"))
        .json(&serde_json::json!({
            "username": "alice",
            "password": "wrong-password",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn duplicate_username_rejected() {
    let server = TestServer::new().await;
    server.register_user("alice").await;

    let response = server
        .client
        .post(server.url("/auth/register"))
        .json(&serde_json::json!({
            "username": "alice",
            "password": "another-password-123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn protected_routes_require_auth() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/api/v1/profiles/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = server
        .client
        .get(server.url("/api/v1/profiles/me"))
        .bearer_auth("not-a-valid-token")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let server = TestServer::new().await;
    let (_alice_id, alice_token) = server.register_user("alice").await;

    let (status, _) = server.get_json(&alice_token, "/api/v1/admin/reports").await;
    assert_eq!(status, 403);

    let (_admin_id, admin_token) = server.login_admin().await;
    let (status, _) = server.get_json(&admin_token, "/api/v1/admin/reports").await;
    assert_eq!(status, 200);
}
