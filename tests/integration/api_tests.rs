//! API integration tests
//!
//! Expect a running server with an empty database plus the seed rows below:
//!
//! ```sql
//! INSERT INTO users (name, email) VALUES ('Alice', 'alice@example.com');
//! INSERT INTO categories (name) VALUES ('Concerts');
//! ```

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn in_days(days: i64) -> String {
    (Utc::now() + Duration::days(days)).format(DATE_FORMAT).to_string()
}

async fn create_event(client: &Client, title: &str) -> Value {
    let response = client
        .post(format!("{}/users/1/events", BASE_URL))
        .json(&json!({
            "annotation": "An evening of live music downtown",
            "category": 1,
            "description": "Three bands, one stage and a long night of music",
            "eventDate": in_days(10),
            "location": {"lat": 55.75, "lon": 37.62},
            "title": title
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse response")
}

async fn admin_action(client: &Client, id: i64, action: &str) -> reqwest::Response {
    client
        .patch(format!("{}/admin/events/{}", BASE_URL, id))
        .json(&json!({ "stateAction": action }))
        .send()
        .await
        .expect("Failed to send request")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_create_event_starts_pending() {
    let client = Client::new();
    let event = create_event(&client, "Pending concert").await;

    assert_eq!(event["state"], "PENDING");
    assert_eq!(event["views"], 0);
    assert!(event["publishedOn"].is_null());
    assert_eq!(event["initiator"]["id"], 1);
}

#[tokio::test]
#[ignore]
async fn test_create_event_too_soon() {
    let client = Client::new();

    let response = client
        .post(format!("{}/users/1/events", BASE_URL))
        .json(&json!({
            "annotation": "An evening of live music downtown",
            "category": 1,
            "description": "Three bands, one stage and a long night of music",
            "eventDate": (Utc::now() + Duration::hours(1)).format(DATE_FORMAT).to_string(),
            "location": {"lat": 55.75, "lon": 37.62},
            "title": "Too soon"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "EventDateTooSoon");
}

#[tokio::test]
#[ignore]
async fn test_publish_flow() {
    let client = Client::new();
    let event = create_event(&client, "Published concert").await;
    let id = event["id"].as_i64().expect("No id in response");

    // Not visible publicly while pending
    let response = client
        .get(format!("{}/events/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = admin_action(&client, id, "PUBLISH_EVENT").await;
    assert_eq!(response.status(), StatusCode::OK);
    let published: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(published["state"], "PUBLISHED");
    assert!(published["publishedOn"].is_string());

    // Publishing twice is a conflict
    let response = admin_action(&client, id, "PUBLISH_EVENT").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The owner can no longer edit it
    let response = client
        .patch(format!("{}/users/1/events/{}", BASE_URL, id))
        .json(&json!({ "title": "Renamed concert" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = client
        .get(format!("{}/events/{}", BASE_URL, id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore]
async fn test_owner_cannot_publish() {
    let client = Client::new();
    let event = create_event(&client, "Self published").await;
    let id = event["id"].as_i64().expect("No id in response");

    let response = client
        .patch(format!("{}/users/1/events/{}", BASE_URL, id))
        .json(&json!({ "stateAction": "PUBLISH_EVENT" }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "InvalidStateAction");
}

#[tokio::test]
#[ignore]
async fn test_admin_search_with_repeated_keys() {
    let client = Client::new();
    create_event(&client, "Searchable concert").await;

    let response = client
        .get(format!(
            "{}/admin/events?users=1&states=PENDING&states=CANCELED&categories=1&from=0&size=50",
            BASE_URL
        ))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Vec<Value> = response.json().await.expect("Failed to parse response");
    assert!(!body.is_empty());
    assert!(body.iter().all(|e| e["state"] != "PUBLISHED"));
}

#[tokio::test]
#[ignore]
async fn test_public_search_only_published() {
    let client = Client::new();

    let response = client
        .get(format!("{}/events?text=music&sort=EVENT_DATE&from=0&size=10", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Vec<Value> = response.json().await.expect("Failed to parse response");
    for event in &body {
        assert!(event["views"].is_u64());
    }
}

#[tokio::test]
#[ignore]
async fn test_public_search_rejects_inverted_range() {
    let client = Client::new();

    let response = client
        .get(format!("{}/events", BASE_URL))
        .query(&[("rangeStart", in_days(5)), ("rangeEnd", in_days(1))])
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
