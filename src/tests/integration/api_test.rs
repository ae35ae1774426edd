//! Endpoint-level tests for validation and error mapping.

use serde_json::{json, Value};

use crate::tests::common::fixtures::{next_monday, setup_test_server};

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _dir) = setup_test_server();

    let response = server.get("/health").await;
    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_event_type_validation_errors() {
    let (server, _dir) = setup_test_server();

    let response = server
        .post("/api/event-types")
        .json(&json!({
            "name": "Bad Slug",
            "slug": "Not A Slug!",
            "duration_minutes": 30
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);

    let response = server
        .post("/api/event-types")
        .json(&json!({
            "name": "Zero",
            "slug": "zero",
            "duration_minutes": 0
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);

    // Duplicate slug
    let payload = json!({
        "name": "Intro Call",
        "slug": "intro-call",
        "duration_minutes": 30
    });
    let response = server.post("/api/event-types").json(&payload).await;
    assert_eq!(response.status_code().as_u16(), 201);
    let response = server.post("/api/event-types").json(&payload).await;
    assert_eq!(response.status_code().as_u16(), 422);
}

#[tokio::test]
async fn test_availability_validation_errors() {
    let (server, _dir) = setup_test_server();

    let response = server
        .post("/api/event-types")
        .json(&json!({
            "name": "Intro Call",
            "slug": "intro-call",
            "duration_minutes": 30
        }))
        .await;
    let event_type_id = response.json::<Value>()["id"].as_u64().unwrap();

    // day_of_week out of range
    let response = server
        .post("/api/availability")
        .json(&json!({
            "event_type_id": event_type_id,
            "day_of_week": 7,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "timezone": "UTC"
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);

    // start after end (also covers midnight-spanning windows)
    let response = server
        .post("/api/availability")
        .json(&json!({
            "event_type_id": event_type_id,
            "day_of_week": 0,
            "start_time": "22:00:00",
            "end_time": "02:00:00",
            "timezone": "UTC"
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);

    // unknown timezone
    let response = server
        .post("/api/availability")
        .json(&json!({
            "event_type_id": event_type_id,
            "day_of_week": 0,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "timezone": "Mars/Olympus_Mons"
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);

    // unknown event type
    let response = server
        .post("/api/availability")
        .json(&json!({
            "event_type_id": 999,
            "day_of_week": 0,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "timezone": "UTC"
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_slot_query_for_unknown_slug_is_404() {
    let (server, _dir) = setup_test_server();

    let url = format!(
        "/api/bookings/available/no-such-event?date={}&timezone=UTC",
        next_monday()
    );
    let response = server.get(&url).await;
    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_event_type_without_rules_yields_empty_list() {
    let (server, _dir) = setup_test_server();

    server
        .post("/api/event-types")
        .json(&json!({
            "name": "Unscheduled",
            "slug": "unscheduled",
            "duration_minutes": 30
        }))
        .await;

    let url = format!(
        "/api/bookings/available/unscheduled?date={}&timezone=UTC",
        next_monday()
    );
    let response = server.get(&url).await;
    assert_eq!(response.status_code().as_u16(), 200);
    let body: Value = response.json();
    assert!(body["available_slots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_naive_timestamp_is_rejected_at_the_boundary() {
    let (server, _dir) = setup_test_server();

    server
        .post("/api/event-types")
        .json(&json!({
            "name": "Intro Call",
            "slug": "intro-call",
            "duration_minutes": 30
        }))
        .await;

    // No offset or UTC designator: deserialization of the instant fails
    let response = server
        .post("/api/bookings")
        .json(&json!({
            "event_type_slug": "intro-call",
            "invitee_name": "Ada Lovelace",
            "invitee_email": "ada@example.com",
            "scheduled_at": "2030-06-17T09:00:00"
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);
}

#[tokio::test]
async fn test_booking_with_malformed_email_is_422() {
    let (server, _dir) = setup_test_server();
    let monday = next_monday();

    let response = server
        .post("/api/event-types")
        .json(&json!({
            "name": "Intro Call",
            "slug": "intro-call",
            "duration_minutes": 30
        }))
        .await;
    let event_type_id = response.json::<Value>()["id"].as_u64().unwrap();

    server
        .post("/api/availability")
        .json(&json!({
            "event_type_id": event_type_id,
            "day_of_week": 0,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "timezone": "UTC"
        }))
        .await;

    let url = format!("/api/bookings/available/intro-call?date={}&timezone=UTC", monday);
    let body: Value = server.get(&url).await.json();
    let first_slot = body["available_slots"][0].as_str().unwrap().to_string();

    let response = server
        .post("/api/bookings")
        .json(&json!({
            "event_type_slug": "intro-call",
            "invitee_name": "Ada Lovelace",
            "invitee_email": "not-an-email",
            "scheduled_at": first_slot
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);
}

#[tokio::test]
async fn test_cancel_unknown_meeting_is_404() {
    let (server, _dir) = setup_test_server();

    let response = server.put("/api/meetings/999/cancel").await;
    assert_eq!(response.status_code().as_u16(), 404);
}

#[tokio::test]
async fn test_event_type_update_and_slug_lookup() {
    let (server, _dir) = setup_test_server();

    let response = server
        .post("/api/event-types")
        .json(&json!({
            "name": "Intro Call",
            "slug": "intro-call",
            "duration_minutes": 30
        }))
        .await;
    let event_type_id = response.json::<Value>()["id"].as_u64().unwrap();

    let response = server
        .put(&format!("/api/event-types/{}", event_type_id))
        .json(&json!({ "duration_minutes": 45 }))
        .await;
    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(response.json::<Value>()["duration_minutes"], 45);

    let response = server.get("/api/event-types/slug/intro-call").await;
    assert_eq!(response.status_code().as_u16(), 200);
    assert_eq!(response.json::<Value>()["duration_minutes"], 45);

    let response = server.get("/api/event-types/slug/missing").await;
    assert_eq!(response.status_code().as_u16(), 404);
}
