//! HTTP contract tests: routing, envelopes and error-to-status mapping,
//! driven against the real router with fully in-memory state.

#![allow(clippy::unwrap_used)]

use axum::http::{HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use pickup_server::{AppState, build_router};
use serde_json::{Value, json};
use uuid::Uuid;

fn server() -> TestServer {
    TestServer::new(build_router(AppState::in_memory())).unwrap()
}

fn bearer(user_id: Uuid) -> (HeaderName, HeaderValue) {
    (
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {user_id}")).unwrap(),
    )
}

async fn register(server: &TestServer, name: &str) -> Uuid {
    let response = server
        .post("/api/users")
        .json(&json!({ "name": name, "email": format!("{name}@example.com") }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap()
}

fn event_body(max_players: u32) -> Value {
    let start = Utc::now() + Duration::hours(2);
    let end = Utc::now() + Duration::hours(4);
    json!({
        "name": "Wednesday volleyball",
        "description": "beach court, all levels",
        "location": { "lon": 13.4, "lat": 52.5 },
        "sport_id": Uuid::new_v4(),
        "start_at": start,
        "end_at": end,
        "intensity": "MEDIUM",
        "max_players": max_players,
        "fee_cents": 300,
        "currency": "EUR"
    })
}

async fn create_event(server: &TestServer, host: Uuid, max_players: u32) -> Uuid {
    let (name, value) = bearer(host);
    let response = server
        .post("/api/events")
        .add_header(name, value)
        .json(&event_body(max_players))
        .await;
    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    Uuid::parse_str(body["event"]["id"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn health_endpoints_respond() {
    let server = server();
    assert_eq!(server.get("/health").await.status_code(), StatusCode::OK);
    assert_eq!(server.get("/ready").await.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn user_registration_and_lookup() {
    let server = server();
    let id = register(&server, "ada").await;

    let response = server.get(&format!("/api/users/{id}")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"]["name"], "ada");

    let response = server.get(&format!("/api/users/{}", Uuid::new_v4())).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn creating_an_event_requires_a_bearer_token() {
    let server = server();
    let response = server.post("/api/events").json(&event_body(4)).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn event_create_get_and_list() {
    let server = server();
    let host = register(&server, "host").await;
    let event_id = create_event(&server, host, 4).await;

    let response = server.get(&format!("/api/events/{event_id}")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["event"]["status"], "WAITING");
    assert_eq!(body["event"]["players"], json!([host.to_string()]));
    assert_eq!(body["event"]["host_id"], host.to_string());

    let response = server.get("/api/events?status=WAITING").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["events"].as_array().unwrap().len(), 1);

    let response = server
        .get(&format!("/api/events?host={}", Uuid::new_v4()))
        .await;
    let body: Value = response.json();
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn event_creation_validates_payload() {
    let server = server();
    let host = register(&server, "host").await;

    let mut too_small = event_body(4);
    too_small["max_players"] = json!(1);
    let (name, value) = bearer(host);
    let response = server
        .post("/api/events")
        .add_header(name, value)
        .json(&too_small)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

    let mut bad_currency = event_body(4);
    bad_currency["currency"] = json!("EURO");
    let (name, value) = bearer(host);
    let response = server
        .post("/api/events")
        .add_header(name, value)
        .json(&bad_currency)
        .await;
    assert_eq!(response.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn join_and_leave_flow() {
    let server = server();
    let host = register(&server, "host").await;
    let first = register(&server, "first").await;
    let second = register(&server, "second").await;
    let event_id = create_event(&server, host, 2).await;

    // First guest takes the last slot.
    let (name, value) = bearer(first);
    let response = server
        .post(&format!("/api/events/{event_id}/join"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["user"]["name"], "first");

    let response = server.get(&format!("/api/events/{event_id}")).await;
    let body: Value = response.json();
    assert_eq!(body["event"]["status"], "FULL");

    // The event is full: both a duplicate join and a new one conflict.
    let (name, value) = bearer(first);
    let response = server
        .post(&format!("/api/events/{event_id}/join"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let (name, value) = bearer(second);
    let response = server
        .post(&format!("/api/events/{event_id}/join"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let response = server.get(&format!("/api/events/{event_id}/players")).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["players"].as_array().unwrap().len(), 2);

    // Leaving frees the slot and reopens the event.
    let (name, value) = bearer(first);
    let response = server
        .post(&format!("/api/events/{event_id}/leave"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server.get(&format!("/api/events/{event_id}")).await;
    let body: Value = response.json();
    assert_eq!(body["event"]["status"], "WAITING");

    // A second leave finds no membership.
    let (name, value) = bearer(first);
    let response = server
        .post(&format!("/api/events/{event_id}/leave"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    // The freed slot is up for grabs again.
    let (name, value) = bearer(second);
    let response = server
        .post(&format!("/api/events/{event_id}/join"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn update_and_delete_are_guarded() {
    let server = server();
    let host = register(&server, "host").await;
    let stranger = register(&server, "stranger").await;
    let event_id = create_event(&server, host, 4).await;

    // Only the host may touch the event.
    let (name, value) = bearer(stranger);
    let response = server
        .put(&format!("/api/events/{event_id}"))
        .add_header(name, value)
        .json(&json!({ "name": "hijacked" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    // The host can edit while alone on the roster.
    let (name, value) = bearer(host);
    let response = server
        .put(&format!("/api/events/{event_id}"))
        .add_header(name, value)
        .json(&json!({ "name": "Wednesday volleyball (moved)" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["event"]["name"], "Wednesday volleyball (moved)");

    // Once someone joined, edits conflict.
    let (name, value) = bearer(stranger);
    let response = server
        .post(&format!("/api/events/{event_id}/join"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let (name, value) = bearer(host);
    let response = server
        .put(&format!("/api/events/{event_id}"))
        .add_header(name, value)
        .json(&json!({ "name": "too late" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    let (name, value) = bearer(host);
    let response = server
        .delete(&format!("/api/events/{event_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);

    // After the guest leaves, removal succeeds and the event is gone.
    let (name, value) = bearer(stranger);
    server
        .post(&format!("/api/events/{event_id}/leave"))
        .add_header(name, value)
        .await;

    let (name, value) = bearer(host);
    let response = server
        .delete(&format!("/api/events/{event_id}"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);

    let response = server.get(&format!("/api/events/{event_id}")).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn notifications_are_stored_and_owner_guarded() {
    let server = server();
    let host = register(&server, "host").await;
    let guest = register(&server, "guest").await;
    let event_id = create_event(&server, host, 2).await;

    let (name, value) = bearer(guest);
    server
        .post(&format!("/api/events/{event_id}/join"))
        .add_header(name, value)
        .await;

    // Delivery runs on the dispatcher task; give it a moment.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let (name, value) = bearer(host);
    let response = server
        .get(&format!("/api/users/{host}/notifications"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    let kinds: Vec<&str> = body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["JOIN_EVENT", "EVENT_FULL"]);
    assert_eq!(
        body["notifications"][0]["context_url"],
        format!("/api/events/{event_id}")
    );

    // Someone else's inbox is off limits.
    let (name, value) = bearer(guest);
    let response = server
        .get(&format!("/api/users/{host}/notifications"))
        .add_header(name, value)
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);
}
