//! Registration, login, and token resolution over HTTP.

#![allow(clippy::unwrap_used)]

use parcelflow_integration_tests::{TestServer, login, register_user};
use reqwest::StatusCode;

#[tokio::test]
async fn register_login_and_fetch_self() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "alice", "pw123456", "customer").await;
    let token = login(&client, &server, "alice", "pw123456").await;

    // With the token: the caller's own profile, without the password hash.
    let res = client
        .get(server.url("/users/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["username"], "alice");
    assert_eq!(body["role"], "customer");
    assert!(body.get("password_hash").is_none());

    // Without the token: 401.
    let res = client.get(server.url("/users/me")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_failures_are_undifferentiated() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "alice", "pw123456", "customer").await;

    // Wrong password and unknown user fail identically.
    let wrong_password = client
        .post(server.url("/token"))
        .form(&[("username", "alice"), ("password", "wrong-password")])
        .send()
        .await
        .unwrap();
    let unknown_user = client
        .post(server.url("/token"))
        .form(&[("username", "nobody"), ("password", "pw123456")])
        .send()
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_user.status(), StatusCode::UNAUTHORIZED);

    let body_a: serde_json::Value = wrong_password.json().await.unwrap();
    let body_b: serde_json::Value = unknown_user.json().await.unwrap();
    assert_eq!(body_a, body_b);
}

#[tokio::test]
async fn empty_credentials_are_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(server.url("/token"))
        .form(&[("username", ""), ("password", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "alice", "pw123456", "customer").await;

    let res = client
        .post(server.url("/users/"))
        .json(&serde_json::json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "pw123456",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(server.url("/users/me"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn deactivated_account_loses_access_immediately() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "root", "pw123456", "admin").await;
    let alice_id = register_user(&client, &server, "alice", "pw123456", "customer").await;

    let admin_token = login(&client, &server, "root", "pw123456").await;
    let alice_token = login(&client, &server, "alice", "pw123456").await;

    // Alice can call /users/me...
    let res = client
        .get(server.url("/users/me"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // ...until an admin deactivates the account.
    let res = client
        .patch(server.url(&format!("/admin/users/{alice_id}/status")))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The still-unexpired token no longer resolves.
    let res = client
        .get(server.url("/users/me"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_endpoints_are_admin_only() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "mgr", "pw123456", "manager").await;
    let token = login(&client, &server, "mgr", "pw123456").await;

    let res = client
        .get(server.url("/admin/users/"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
