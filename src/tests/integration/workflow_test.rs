//! End-to-end booking workflow over the HTTP surface.

use serde_json::{json, Value};

use crate::tests::common::fixtures::{next_monday, setup_test_server};

#[tokio::test]
async fn test_full_booking_workflow() {
    let (server, _dir) = setup_test_server();
    let monday = next_monday();

    // Organizer publishes an event type
    let response = server
        .post("/api/event-types")
        .json(&json!({
            "name": "Intro Call",
            "slug": "intro-call",
            "duration_minutes": 30
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 201);
    let event_type: Value = response.json();
    let event_type_id = event_type["id"].as_u64().unwrap();

    // ... with Monday business hours (UTC keeps the slot math transparent)
    let response = server
        .post("/api/availability/bulk")
        .json(&json!([{
            "event_type_id": event_type_id,
            "day_of_week": 0,
            "start_time": "09:00:00",
            "end_time": "17:00:00",
            "timezone": "UTC"
        }]))
        .await;
    assert_eq!(response.status_code().as_u16(), 201);

    // Invitee sees the full grid of 16 half-hour slots
    let slots_url = format!("/api/bookings/available/intro-call?date={}&timezone=UTC", monday);
    let response = server.get(&slots_url).await;
    assert_eq!(response.status_code().as_u16(), 200);
    let body: Value = response.json();
    let slots = body["available_slots"].as_array().unwrap();
    assert_eq!(slots.len(), 16);
    let first_slot = slots[0].as_str().unwrap().to_string();

    // Invitee books the first slot
    let response = server
        .post("/api/bookings")
        .json(&json!({
            "event_type_slug": "intro-call",
            "invitee_name": "Ada Lovelace",
            "invitee_email": "ada@example.com",
            "scheduled_at": first_slot
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 201);
    let meeting: Value = response.json();
    assert_eq!(meeting["status"], "scheduled");
    let meeting_id = meeting["id"].as_u64().unwrap();

    // The booked slot is no longer offered
    let response = server.get(&slots_url).await;
    let body: Value = response.json();
    let remaining = body["available_slots"].as_array().unwrap();
    assert_eq!(remaining.len(), 15);
    assert!(!remaining.iter().any(|s| s.as_str() == Some(first_slot.as_str())));

    // A second booking for the same instant loses
    let response = server
        .post("/api/bookings")
        .json(&json!({
            "event_type_slug": "intro-call",
            "invitee_name": "Grace Hopper",
            "invitee_email": "grace@example.com",
            "scheduled_at": first_slot
        }))
        .await;
    assert_eq!(response.status_code().as_u16(), 409);

    // The meeting shows up in the upcoming view
    let response = server.get("/api/meetings/upcoming").await;
    let upcoming: Value = response.json();
    assert_eq!(upcoming.as_array().unwrap().len(), 1);
    assert_eq!(upcoming[0]["invitee_email"], "ada@example.com");

    // Organizer cancels; the slot is offerable again
    let cancel_url = format!("/api/meetings/{}/cancel", meeting_id);
    let response = server.put(&cancel_url).await;
    assert_eq!(response.status_code().as_u16(), 200);
    let cancelled: Value = response.json();
    assert_eq!(cancelled["status"], "cancelled");

    let response = server.get(&slots_url).await;
    let body: Value = response.json();
    assert_eq!(body["available_slots"].as_array().unwrap().len(), 16);

    // Cancelling again is an idempotent no-op
    let response = server.put(&cancel_url).await;
    assert_eq!(response.status_code().as_u16(), 200);

    // The cancelled meeting lives in the past view now
    let response = server.get("/api/meetings/past").await;
    let past: Value = response.json();
    assert_eq!(past.as_array().unwrap().len(), 1);
    assert_eq!(past[0]["status"], "cancelled");

    // With no live bookings left, the event type can be deleted
    let response = server
        .delete(&format!("/api/event-types/{}", event_type_id))
        .await;
    assert_eq!(response.status_code().as_u16(), 204);
}

#[tokio::test]
async fn test_delete_is_refused_while_bookings_are_live() {
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

    let slots_url = format!("/api/bookings/available/intro-call?date={}&timezone=UTC", monday);
    let body: Value = server.get(&slots_url).await.json();
    let first_slot = body["available_slots"][0].as_str().unwrap().to_string();

    server
        .post("/api/bookings")
        .json(&json!({
            "event_type_slug": "intro-call",
            "invitee_name": "Ada Lovelace",
            "invitee_email": "ada@example.com",
            "scheduled_at": first_slot
        }))
        .await;

    let response = server
        .delete(&format!("/api/event-types/{}", event_type_id))
        .await;
    assert_eq!(response.status_code().as_u16(), 422);
}
