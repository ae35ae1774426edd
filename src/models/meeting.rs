use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::ServiceError;

// Syntactic check only; deliverability is not our concern.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Cancelled => "cancelled",
            MeetingStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ServiceError> {
        match value {
            "scheduled" => Ok(MeetingStatus::Scheduled),
            "cancelled" => Ok(MeetingStatus::Cancelled),
            "completed" => Ok(MeetingStatus::Completed),
            other => Err(ServiceError::Storage(format!(
                "unknown meeting status: {}",
                other
            ))),
        }
    }
}

/// A committed booking. The event type's slug and duration are snapshotted at
/// booking time so historical meetings stay intact when the event type is
/// later edited or deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Meeting {
    pub id: u64,
    pub event_type_id: u64,
    pub event_type_slug: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub scheduled_at: DateTime<Utc>,
    pub duration_minutes: u32,
    pub status: MeetingStatus,
    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Meeting {
    /// End of the occupied interval [scheduled_at, scheduled_at + duration).
    pub fn end(&self) -> DateTime<Utc> {
        self.scheduled_at + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether this meeting blocks the half-open interval [start, end).
    /// Cancelled meetings never block anything.
    pub fn occupies(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.status == MeetingStatus::Scheduled && self.scheduled_at < end && self.end() > start
    }

    /// Read-time status: a scheduled meeting whose occupied interval has
    /// fully elapsed reads as completed. Never applied to cancelled meetings.
    pub fn effective_status(&self, now: DateTime<Utc>) -> MeetingStatus {
        if self.status == MeetingStatus::Scheduled && self.end() <= now {
            MeetingStatus::Completed
        } else {
            self.status
        }
    }

    /// Copy of the meeting with the derived status applied, for responses.
    pub fn as_of(&self, now: DateTime<Utc>) -> Meeting {
        let mut view = self.clone();
        view.status = view.effective_status(now);
        view
    }
}

/// A candidate bookable start instant. An offer, never a commitment; these
/// are produced by the slot generator and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub event_type_id: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

// Booking request as submitted by an invitee. `scheduled_at` must carry an
// explicit offset or UTC designator; naive timestamps fail deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub event_type_slug: String,
    pub invitee_name: String,
    pub invitee_email: String,
    pub scheduled_at: DateTime<Utc>,
}

// Response payload for the available-slots endpoint
#[derive(Debug, Serialize)]
pub struct AvailableSlotsResponse {
    pub event_type_id: u64,
    pub event_type_name: String,
    pub duration_minutes: u32,
    pub date: String,
    pub timezone: String,
    pub available_slots: Vec<String>,
}

pub fn validate_email(email: &str) -> Result<(), ServiceError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "'{}' is not a well-formed email address",
            email
        )))
    }
}

pub fn validate_invitee_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "invitee_name must not be empty".to_string(),
        ));
    }
    Ok(())
}
