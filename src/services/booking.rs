use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use crate::models::event_type::EventType;
use crate::models::meeting::{
    validate_email, validate_invitee_name, BookingRequest, Meeting, TimeSlot,
};
use crate::services::catalog::CatalogService;
use crate::services::ledger::MeetingLedger;
use crate::services::slots::generate_slots;

/// Parse an invitee-supplied timezone, defaulting to UTC when the string is
/// absent or not a known IANA zone.
pub fn resolve_viewer_timezone(timezone: &str) -> Tz {
    timezone.parse().unwrap_or_else(|_| {
        warn!("Unknown viewer timezone '{}', defaulting to UTC", timezone);
        chrono_tz::UTC
    })
}

/// List the offerable slots for `slug` on `date` as seen from the viewer's
/// timezone: generator output minus every candidate whose interval overlaps
/// a committed meeting. An empty list is a valid result, never an error.
pub fn list_available(
    catalog: &CatalogService,
    ledger: &MeetingLedger,
    slug: &str,
    date: NaiveDate,
    viewer_timezone: &str,
    now: DateTime<Utc>,
) -> Result<(EventType, Vec<TimeSlot>), ServiceError> {
    let event_type = catalog.find_event_type_by_slug(slug)?;
    let viewer_tz = resolve_viewer_timezone(viewer_timezone);

    let rules = catalog.rules_for_event_type(event_type.id)?;
    let candidates = generate_slots(&rules, date, viewer_tz, event_type.duration_minutes, now);
    if candidates.is_empty() {
        return Ok((event_type, Vec::new()));
    }

    let duration = Duration::minutes(i64::from(event_type.duration_minutes));

    // One ledger read covers every candidate; the generator output is sorted,
    // so the span from first start to last end bounds them all.
    let span_start = candidates[0];
    let span_end = candidates[candidates.len() - 1] + duration;
    let booked = ledger.find_overlapping(event_type.id, span_start, span_end)?;

    let slots: Vec<TimeSlot> = candidates
        .into_iter()
        .map(|start| TimeSlot {
            event_type_id: event_type.id,
            start,
            end: start + duration,
        })
        .filter(|slot| !booked.iter().any(|m| m.occupies(slot.start, slot.end)))
        .collect();

    debug!(
        "Resolved {} offerable slots for '{}' on {} ({} booked removed)",
        slots.len(),
        slug,
        date,
        booked.len()
    );
    Ok((event_type, slots))
}

/// Commit a booking against a currently-offerable slot.
///
/// The requested instant is re-validated against the live rule set before
/// the ledger insert, so a stale client cannot book an instant that was
/// never (or is no longer) a generated slot. The ledger then performs the
/// serialized check-then-insert; losing that race and requesting an invalid
/// instant both surface as `SlotUnavailable`.
pub fn commit(
    catalog: &CatalogService,
    ledger: &MeetingLedger,
    request: &BookingRequest,
    now: DateTime<Utc>,
) -> Result<Meeting, ServiceError> {
    let event_type = catalog.find_event_type_by_slug(&request.event_type_slug)?;
    validate_invitee_name(&request.invitee_name)?;
    validate_email(&request.invitee_email)?;

    // Membership check pinned to the instant's UTC calendar date; the viewer
    // timezone only affects which date a slot is listed under, not whether
    // the instant itself is offerable.
    let rules = catalog.rules_for_event_type(event_type.id)?;
    let candidates = generate_slots(
        &rules,
        request.scheduled_at.date_naive(),
        chrono_tz::UTC,
        event_type.duration_minutes,
        now,
    );
    if candidates.binary_search(&request.scheduled_at).is_err() {
        info!(
            "Rejecting booking for '{}' at {}: not an offerable slot",
            request.event_type_slug, request.scheduled_at
        );
        return Err(ServiceError::SlotUnavailable);
    }

    ledger.book_if_free(
        &event_type,
        &request.invitee_name,
        &request.invitee_email,
        request.scheduled_at,
        now,
    )
}
