//! Notification state and dashboard access over HTTP.

#![allow(clippy::unwrap_used)]

use parcelflow_integration_tests::{TestServer, login, register_user};
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn staff_notify_and_recipient_reads() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "emp", "pw123456", "employee").await;
    let customer_id = register_user(&client, &server, "cust", "pw123456", "customer").await;
    let employee_token = login(&client, &server, "emp", "pw123456").await;
    let customer_token = login(&client, &server, "cust", "pw123456").await;

    // An employee creates a notification for the customer.
    let res = client
        .post(server.url("/notifications/"))
        .bearer_auth(&employee_token)
        .json(&json!({
            "user_id": customer_id,
            "title": "Out for delivery",
            "message": "Your shipment arrives today.",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    assert_eq!(created["status"], "pending");
    let notification_id = created["id"].as_i64().unwrap();

    // The recipient sees it among unread notifications.
    let res = client
        .get(server.url("/notifications/?unread_only=true"))
        .bearer_auth(&customer_token)
        .send()
        .await
        .unwrap();
    let unread: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(unread.len(), 1);

    // Marking it read stamps read_at and empties the unread view.
    let res = client
        .patch(server.url(&format!("/notifications/{notification_id}/read")))
        .bearer_auth(&customer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let read: serde_json::Value = res.json().await.unwrap();
    assert!(read["read_at"].is_string());

    let res = client
        .get(server.url("/notifications/?unread_only=true"))
        .bearer_auth(&customer_token)
        .send()
        .await
        .unwrap();
    let unread: Vec<serde_json::Value> = res.json().await.unwrap();
    assert!(unread.is_empty());
}

#[tokio::test]
async fn customers_cannot_create_notifications() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let customer_id = register_user(&client, &server, "cust", "pw123456", "customer").await;
    let token = login(&client, &server, "cust", "pw123456").await;

    let res = client
        .post(server.url("/notifications/"))
        .bearer_auth(&token)
        .json(&json!({
            "user_id": customer_id,
            "title": "hi",
            "message": "self-notification",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn foreign_notifications_are_invisible() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "emp", "pw123456", "employee").await;
    let a_id = register_user(&client, &server, "user-a", "pw123456", "customer").await;
    register_user(&client, &server, "user-b", "pw123456", "customer").await;
    let employee_token = login(&client, &server, "emp", "pw123456").await;
    let b_token = login(&client, &server, "user-b", "pw123456").await;

    let res = client
        .post(server.url("/notifications/"))
        .bearer_auth(&employee_token)
        .json(&json!({ "user_id": a_id, "title": "t", "message": "m" }))
        .send()
        .await
        .unwrap();
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_i64().unwrap();

    // Someone else's notification reads as missing.
    let res = client
        .patch(server.url(&format!("/notifications/{id}/read")))
        .bearer_auth(&b_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn dashboard_is_gated_and_aggregates() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "mgr", "pw123456", "manager").await;
    register_user(&client, &server, "cust", "pw123456", "customer").await;
    let manager_token = login(&client, &server, "mgr", "pw123456").await;
    let customer_token = login(&client, &server, "cust", "pw123456").await;

    // Seed one shipment so the aggregates are non-trivial.
    let res = client
        .post(server.url("/shipments/"))
        .bearer_auth(&manager_token)
        .json(&json!({
            "origin_address": "1 Dock Rd",
            "origin_city": "Rotterdam",
            "destination_address": "9 Harbor Ln",
            "destination_city": "Oslo",
            "weight_kg": 4.2,
            "declared_value": 120.0,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(server.url("/analytics/dashboard"))
        .bearer_auth(&manager_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let dashboard: serde_json::Value = res.json().await.unwrap();
    assert_eq!(dashboard["total_shipments"], 1);
    assert_eq!(dashboard["pending_shipments"], 1);
    assert!((dashboard["total_revenue"].as_f64().unwrap() - 120.0).abs() < f64::EPSILON);
    assert_eq!(dashboard["top_destinations"][0]["city"], "Oslo");

    // Customers have no dashboard.
    let res = client
        .get(server.url("/analytics/dashboard"))
        .bearer_auth(&customer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}
