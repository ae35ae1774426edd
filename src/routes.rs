use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::handlers::api::{
    cancel_meeting, create_availability, create_booking, create_bulk_availability,
    create_event_type, delete_availability, delete_availability_for_event_type,
    delete_event_type, get_available_slots, get_event_type, get_event_type_by_slug, get_meeting,
    health_check, list_availability_for_event_type, list_event_types, list_past_meetings,
    list_upcoming_meetings, update_availability, update_event_type, AppState,
};

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let event_type_routes = Router::new()
        .route("/api/event-types", get(list_event_types).post(create_event_type))
        .route(
            "/api/event-types/:id",
            get(get_event_type).put(update_event_type).delete(delete_event_type),
        )
        .route("/api/event-types/slug/:slug", get(get_event_type_by_slug));

    let availability_routes = Router::new()
        .route("/api/availability", post(create_availability))
        .route("/api/availability/bulk", post(create_bulk_availability))
        .route(
            "/api/availability/:id",
            put(update_availability).delete(delete_availability),
        )
        .route(
            "/api/availability/event-type/:event_type_id",
            get(list_availability_for_event_type).delete(delete_availability_for_event_type),
        );

    let booking_routes = Router::new()
        .route("/api/bookings/available/:slug", get(get_available_slots))
        .route("/api/bookings", post(create_booking));

    let meeting_routes = Router::new()
        .route("/api/meetings/upcoming", get(list_upcoming_meetings))
        .route("/api/meetings/past", get(list_past_meetings))
        .route("/api/meetings/:id", get(get_meeting))
        .route("/api/meetings/:id/cancel", put(cancel_meeting));

    Router::new()
        .route("/health", get(health_check))
        .merge(event_type_routes)
        .merge(availability_routes)
        .merge(booking_routes)
        .merge(meeting_routes)
        .with_state(app_state)
}
