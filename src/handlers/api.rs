use axum::{
    extract::{Json as ExtractJson, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::error::ServiceError;
use crate::models::availability::{
    AvailabilityRule, AvailabilityRuleCreate, AvailabilityRuleUpdate,
};
use crate::models::common::SlotQuery;
use crate::models::event_type::{EventType, EventTypeCreate, EventTypeUpdate};
use crate::models::meeting::{AvailableSlotsResponse, BookingRequest, Meeting};
use crate::services::booking;
use crate::services::catalog::CatalogService;
use crate::services::ledger::MeetingLedger;

// AppState struct containing shared resources
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub ledger: Arc<MeetingLedger>,
}

// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

// ---- Event type administration ----

pub async fn list_event_types(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventType>>, ServiceError> {
    Ok(Json(state.catalog.list_event_types()?))
}

pub async fn create_event_type(
    State(state): State<Arc<AppState>>,
    ExtractJson(payload): ExtractJson<EventTypeCreate>,
) -> Result<(StatusCode, Json<EventType>), ServiceError> {
    info!("Received request to create event type '{}'", payload.slug);
    let event_type = state.catalog.create_event_type(payload)?;
    Ok((StatusCode::CREATED, Json(event_type)))
}

pub async fn get_event_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<EventType>, ServiceError> {
    Ok(Json(state.catalog.get_event_type(id)?))
}

pub async fn get_event_type_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<EventType>, ServiceError> {
    Ok(Json(state.catalog.find_event_type_by_slug(&slug)?))
}

pub async fn update_event_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    ExtractJson(payload): ExtractJson<EventTypeUpdate>,
) -> Result<Json<EventType>, ServiceError> {
    info!("Received request to update event type {}", id);
    Ok(Json(state.catalog.update_event_type(id, payload)?))
}

pub async fn delete_event_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ServiceError> {
    info!("Received request to delete event type {}", id);

    // Refuse while live bookings still reference the event type; historical
    // meetings carry their own snapshot and are unaffected.
    if state.ledger.has_upcoming_for_event_type(id, Utc::now())? {
        return Err(ServiceError::Validation(
            "event type has upcoming scheduled meetings and cannot be deleted".to_string(),
        ));
    }

    state.catalog.delete_event_type(id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Availability rule administration ----

pub async fn list_availability_for_event_type(
    State(state): State<Arc<AppState>>,
    Path(event_type_id): Path<u64>,
) -> Result<Json<Vec<AvailabilityRule>>, ServiceError> {
    // Verify the event type exists so an unknown id is a 404, not an empty list
    state.catalog.get_event_type(event_type_id)?;
    Ok(Json(state.catalog.rules_for_event_type(event_type_id)?))
}

pub async fn create_availability(
    State(state): State<Arc<AppState>>,
    ExtractJson(payload): ExtractJson<AvailabilityRuleCreate>,
) -> Result<(StatusCode, Json<AvailabilityRule>), ServiceError> {
    info!(
        "Received request to create availability rule for event type {}",
        payload.event_type_id
    );
    let rule = state.catalog.create_rule(payload)?;
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn create_bulk_availability(
    State(state): State<Arc<AppState>>,
    ExtractJson(payloads): ExtractJson<Vec<AvailabilityRuleCreate>>,
) -> Result<(StatusCode, Json<Vec<AvailabilityRule>>), ServiceError> {
    info!("Received request to create {} availability rules", payloads.len());
    let rules = state.catalog.create_rules_bulk(payloads)?;
    Ok((StatusCode::CREATED, Json(rules)))
}

pub async fn update_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    ExtractJson(payload): ExtractJson<AvailabilityRuleUpdate>,
) -> Result<Json<AvailabilityRule>, ServiceError> {
    info!("Received request to update availability rule {}", id);
    Ok(Json(state.catalog.update_rule(id, payload)?))
}

pub async fn delete_availability(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ServiceError> {
    info!("Received request to delete availability rule {}", id);
    state.catalog.delete_rule(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_availability_for_event_type(
    State(state): State<Arc<AppState>>,
    Path(event_type_id): Path<u64>,
) -> Result<StatusCode, ServiceError> {
    info!(
        "Received request to delete all availability rules for event type {}",
        event_type_id
    );
    state.catalog.delete_rules_for_event_type(event_type_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Invitee-facing booking flow ----

pub async fn get_available_slots(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<AvailableSlotsResponse>, ServiceError> {
    info!(
        "Received slot query for '{}' on {} (viewer timezone: {})",
        slug, query.date, query.timezone
    );

    let (event_type, slots) = booking::list_available(
        &state.catalog,
        &state.ledger,
        &slug,
        query.date,
        &query.timezone,
        Utc::now(),
    )?;

    Ok(Json(AvailableSlotsResponse {
        event_type_id: event_type.id,
        event_type_name: event_type.name,
        duration_minutes: event_type.duration_minutes,
        date: query.date.to_string(),
        timezone: query.timezone,
        available_slots: slots.iter().map(|s| s.start.to_rfc3339()).collect(),
    }))
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    ExtractJson(request): ExtractJson<BookingRequest>,
) -> Result<(StatusCode, Json<Meeting>), ServiceError> {
    info!(
        "Received booking request for '{}' at {}",
        request.event_type_slug, request.scheduled_at
    );
    let meeting = booking::commit(&state.catalog, &state.ledger, &request, Utc::now())?;
    Ok((StatusCode::CREATED, Json(meeting)))
}

// ---- Meeting views and lifecycle ----

pub async fn list_upcoming_meetings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Meeting>>, ServiceError> {
    let now = Utc::now();
    let meetings = state.ledger.list_upcoming(now)?;
    Ok(Json(meetings.iter().map(|m| m.as_of(now)).collect()))
}

pub async fn list_past_meetings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Meeting>>, ServiceError> {
    let now = Utc::now();
    let meetings = state.ledger.list_past(now)?;
    Ok(Json(meetings.iter().map(|m| m.as_of(now)).collect()))
}

pub async fn get_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Meeting>, ServiceError> {
    let meeting = state
        .ledger
        .find_by_id(id)?
        .ok_or(ServiceError::NotFound("meeting"))?;
    Ok(Json(meeting.as_of(Utc::now())))
}

pub async fn cancel_meeting(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<Json<Meeting>, ServiceError> {
    info!("Received request to cancel meeting {}", id);
    let meeting = state.ledger.cancel(id, Utc::now())?;
    Ok(Json(meeting))
}
