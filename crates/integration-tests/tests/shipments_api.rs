//! Shipment lifecycle and authorization over HTTP.

#![allow(clippy::unwrap_used)]

use parcelflow_integration_tests::{TestServer, login, register_user};
use reqwest::StatusCode;
use serde_json::json;

fn shipment_body() -> serde_json::Value {
    json!({
        "origin_address": "1 Dock Rd",
        "origin_city": "Rotterdam",
        "destination_address": "9 Harbor Ln",
        "destination_city": "Oslo",
        "weight_kg": 4.2,
        "declared_value": 120.0,
        "description": "glassware",
    })
}

async fn create_shipment(
    client: &reqwest::Client,
    server: &TestServer,
    token: &str,
) -> serde_json::Value {
    let res = client
        .post(server.url("/shipments/"))
        .bearer_auth(token)
        .json(&shipment_body())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    res.json().await.unwrap()
}

#[tokio::test]
async fn full_lifecycle_with_ledger() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "mgr", "pw123456", "manager").await;
    let token = login(&client, &server, "mgr", "pw123456").await;

    // Create: pending, generated tracking number, one ledger entry.
    let shipment = create_shipment(&client, &server, &token).await;
    let id = shipment["id"].as_i64().unwrap();
    let tracking_number = shipment["tracking_number"].as_str().unwrap().to_owned();
    assert_eq!(shipment["status"], "pending");
    assert!(tracking_number.starts_with("SHP"));

    // Public tracking lookup works without a token.
    let res = client
        .get(server.url(&format!("/shipments/track/{tracking_number}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Transition pending -> in_transit -> delivered.
    for status in ["in_transit", "delivered"] {
        let res = client
            .post(server.url(&format!("/shipments/{id}/tracking")))
            .bearer_auth(&token)
            .json(&json!({ "status": status, "location": "Hub 7" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    // The ledger holds three entries in order; the shipment mirrors the last.
    let res = client
        .get(server.url(&format!("/shipments/{id}/tracking")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let entries: Vec<serde_json::Value> = res.json().await.unwrap();
    let statuses: Vec<&str> = entries
        .iter()
        .map(|e| e["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["pending", "in_transit", "delivered"]);

    let res = client
        .get(server.url(&format!("/shipments/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let current: serde_json::Value = res.json().await.unwrap();
    assert_eq!(current["status"], "delivered");

    // Terminal state: any further transition is rejected, not ignored.
    let res = client
        .post(server.url(&format!("/shipments/{id}/tracking")))
        .bearer_auth(&token)
        .json(&json!({ "status": "returned", "location": "Hub 7" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn customer_owns_creations_and_cannot_mutate() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let customer_id = register_user(&client, &server, "cust", "pw123456", "customer").await;
    let token = login(&client, &server, "cust", "pw123456").await;

    let shipment = create_shipment(&client, &server, &token).await;
    let id = shipment["id"].as_i64().unwrap();
    assert_eq!(shipment["owner_id"].as_i64().unwrap(), customer_id);

    // Customers never mutate, even their own shipments: 403, because the
    // shipment is legitimately visible to them.
    let res = client
        .patch(server.url(&format!("/shipments/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "priority": "high" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(server.url(&format!("/shipments/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn foreign_shipments_are_invisible_to_customers() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "mgr", "pw123456", "manager").await;
    register_user(&client, &server, "cust", "pw123456", "customer").await;
    let manager_token = login(&client, &server, "mgr", "pw123456").await;
    let customer_token = login(&client, &server, "cust", "pw123456").await;

    let shipment = create_shipment(&client, &server, &manager_token).await;
    let id = shipment["id"].as_i64().unwrap();

    // Outside the customer's visibility: 404, not 403.
    let res = client
        .get(server.url(&format!("/shipments/{id}")))
        .bearer_auth(&customer_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // And the listing is scoped to their own shipments.
    let res = client
        .get(server.url("/shipments/"))
        .bearer_auth(&customer_token)
        .send()
        .await
        .unwrap();
    let listed: Vec<serde_json::Value> = res.json().await.unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn employee_appends_tracking_but_cannot_delete() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "mgr", "pw123456", "manager").await;
    register_user(&client, &server, "emp", "pw123456", "employee").await;
    register_user(&client, &server, "root", "pw123456", "admin").await;
    let manager_token = login(&client, &server, "mgr", "pw123456").await;
    let employee_token = login(&client, &server, "emp", "pw123456").await;
    let admin_token = login(&client, &server, "root", "pw123456").await;

    let shipment = create_shipment(&client, &server, &manager_token).await;
    let id = shipment["id"].as_i64().unwrap();

    // Employees append tracking entries.
    let res = client
        .post(server.url(&format!("/shipments/{id}/tracking")))
        .bearer_auth(&employee_token)
        .json(&json!({ "status": "confirmed", "location": "Origin Facility" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    // But may not delete shipments.
    let res = client
        .delete(server.url(&format!("/shipments/{id}")))
        .bearer_auth(&employee_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Admins may do anything.
    let res = client
        .delete(server.url(&format!("/shipments/{id}")))
        .bearer_auth(&admin_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn duplicate_tracking_number_conflicts() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "mgr", "pw123456", "manager").await;
    let token = login(&client, &server, "mgr", "pw123456").await;

    let mut body = shipment_body();
    body["tracking_number"] = json!("SHPAAAA1111");

    let res = client
        .post(server.url("/shipments/"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(server.url("/shipments/"))
        .bearer_auth(&token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn patch_updates_fields_and_status_through_the_ledger() {
    let server = TestServer::spawn().await;
    let client = reqwest::Client::new();

    register_user(&client, &server, "mgr", "pw123456", "manager").await;
    let token = login(&client, &server, "mgr", "pw123456").await;

    let shipment = create_shipment(&client, &server, &token).await;
    let id = shipment["id"].as_i64().unwrap();

    let res = client
        .patch(server.url(&format!("/shipments/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "priority": "urgent", "status": "confirmed" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: serde_json::Value = res.json().await.unwrap();
    assert_eq!(updated["priority"], "urgent");
    assert_eq!(updated["status"], "confirmed");

    // The status change left a ledger entry behind.
    let res = client
        .get(server.url(&format!("/shipments/{id}/tracking")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let entries: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries.last().unwrap()["status"], "confirmed");
}
