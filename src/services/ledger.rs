use chrono::{DateTime, Duration, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{error, info};

use crate::error::ServiceError;
use crate::models::event_type::EventType;
use crate::models::meeting::{Meeting, MeetingStatus};

// On-disk row; instants are stored as RFC 3339 strings in UTC.
#[derive(Debug, Serialize, Deserialize)]
struct MeetingRow {
    id: u64,
    event_type_id: u64,
    event_type_slug: String,
    invitee_name: String,
    invitee_email: String,
    scheduled_at: String,
    duration_minutes: u32,
    status: String,
    created_at: String,
    cancelled_at: String, // empty if not cancelled
}

fn parse_instant(value: &str, field: &str) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ServiceError::Storage(format!("invalid {} timestamp '{}': {}", field, value, e)))
}

impl MeetingRow {
    fn from_meeting(meeting: &Meeting) -> Self {
        Self {
            id: meeting.id,
            event_type_id: meeting.event_type_id,
            event_type_slug: meeting.event_type_slug.clone(),
            invitee_name: meeting.invitee_name.clone(),
            invitee_email: meeting.invitee_email.clone(),
            scheduled_at: meeting.scheduled_at.to_rfc3339(),
            duration_minutes: meeting.duration_minutes,
            status: meeting.status.as_str().to_string(),
            created_at: meeting.created_at.to_rfc3339(),
            cancelled_at: meeting
                .cancelled_at
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
        }
    }

    fn into_meeting(self) -> Result<Meeting, ServiceError> {
        let cancelled_at = if self.cancelled_at.is_empty() {
            None
        } else {
            Some(parse_instant(&self.cancelled_at, "cancelled_at")?)
        };

        Ok(Meeting {
            id: self.id,
            event_type_id: self.event_type_id,
            event_type_slug: self.event_type_slug,
            invitee_name: self.invitee_name,
            invitee_email: self.invitee_email,
            scheduled_at: parse_instant(&self.scheduled_at, "scheduled_at")?,
            duration_minutes: self.duration_minutes,
            status: MeetingStatus::parse(&self.status)?,
            created_at: parse_instant(&self.created_at, "created_at")?,
            cancelled_at,
        })
    }
}

/// Authoritative store of committed meetings, backed by a CSV file.
///
/// The file mutex serializes every check-then-insert: `book_if_free` holds it
/// across the overlap scan and the append, so of any set of concurrent
/// attempts at overlapping intervals exactly one can succeed.
pub struct MeetingLedger {
    csv_path: String,
    file_mutex: Mutex<()>,
}

impl MeetingLedger {
    pub fn new(csv_path: &str) -> Result<Self, ServiceError> {
        if !Path::new(csv_path).exists() {
            info!("Creating new meetings ledger file at {}", csv_path);

            let file = File::create(csv_path)
                .map_err(|e| ServiceError::Storage(format!("failed to create ledger file: {}", e)))?;

            let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
            writer
                .write_record([
                    "id",
                    "event_type_id",
                    "event_type_slug",
                    "invitee_name",
                    "invitee_email",
                    "scheduled_at",
                    "duration_minutes",
                    "status",
                    "created_at",
                    "cancelled_at",
                ])
                .map_err(|e| ServiceError::Storage(format!("failed to write headers: {}", e)))?;
            writer
                .flush()
                .map_err(|e| ServiceError::Storage(format!("failed to flush headers: {}", e)))?;
        }

        Ok(Self {
            csv_path: csv_path.to_string(),
            file_mutex: Mutex::new(()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, ServiceError> {
        self.file_mutex
            .lock()
            .map_err(|e| ServiceError::Storage(format!("ledger mutex poisoned: {}", e)))
    }

    // Callers must hold the file mutex.
    fn read_all(&self) -> Result<Vec<Meeting>, ServiceError> {
        let file = File::open(&self.csv_path)
            .map_err(|e| ServiceError::Storage(format!("failed to open ledger file: {}", e)))?;

        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let mut meetings = Vec::new();
        for result in reader.deserialize::<MeetingRow>() {
            let row =
                result.map_err(|e| ServiceError::Storage(format!("failed to read row: {}", e)))?;
            meetings.push(row.into_meeting()?);
        }
        Ok(meetings)
    }

    // Callers must hold the file mutex.
    fn append(&self, meeting: &Meeting) -> Result<(), ServiceError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| ServiceError::Storage(format!("failed to open ledger file: {}", e)))?;

        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer
            .serialize(MeetingRow::from_meeting(meeting))
            .map_err(|e| ServiceError::Storage(format!("failed to serialize row: {}", e)))?;
        writer
            .flush()
            .map_err(|e| ServiceError::Storage(format!("failed to flush writer: {}", e)))
    }

    // Callers must hold the file mutex.
    fn rewrite(&self, meetings: &[Meeting]) -> Result<(), ServiceError> {
        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.csv_path)
            .map_err(|e| {
                ServiceError::Storage(format!("failed to open ledger file for writing: {}", e))
            })?;

        let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
        for meeting in meetings {
            writer
                .serialize(MeetingRow::from_meeting(meeting))
                .map_err(|e| ServiceError::Storage(format!("failed to write row: {}", e)))?;
        }
        writer
            .flush()
            .map_err(|e| ServiceError::Storage(format!("failed to flush writer: {}", e)))
    }

    /// Conditional insert: commit a meeting at `scheduled_at` only if no
    /// scheduled meeting for the same event type occupies any part of
    /// [scheduled_at, scheduled_at + duration). Losing the race surfaces as
    /// `SlotUnavailable`.
    pub fn book_if_free(
        &self,
        event_type: &EventType,
        invitee_name: &str,
        invitee_email: &str,
        scheduled_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Meeting, ServiceError> {
        let _guard = self.lock()?;

        let meetings = self.read_all()?;
        let end = scheduled_at + Duration::minutes(i64::from(event_type.duration_minutes));

        let conflict = meetings
            .iter()
            .any(|m| m.event_type_id == event_type.id && m.occupies(scheduled_at, end));
        if conflict {
            info!(
                "Rejecting booking for event type {} at {}: interval already occupied",
                event_type.slug, scheduled_at
            );
            return Err(ServiceError::SlotUnavailable);
        }

        let meeting = Meeting {
            id: meetings.iter().map(|m| m.id).max().unwrap_or(0) + 1,
            event_type_id: event_type.id,
            event_type_slug: event_type.slug.clone(),
            invitee_name: invitee_name.to_string(),
            invitee_email: invitee_email.to_string(),
            scheduled_at,
            duration_minutes: event_type.duration_minutes,
            status: MeetingStatus::Scheduled,
            created_at: now,
            cancelled_at: None,
        };

        self.append(&meeting)?;
        info!(
            "Committed meeting {} for event type {} at {}",
            meeting.id, event_type.slug, scheduled_at
        );
        Ok(meeting)
    }

    /// Scheduled meetings whose occupied interval intersects the half-open
    /// interval [start, end) for the given event type.
    pub fn find_overlapping(
        &self,
        event_type_id: u64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Meeting>, ServiceError> {
        let _guard = self.lock()?;
        let meetings = self.read_all()?;
        Ok(meetings
            .into_iter()
            .filter(|m| m.event_type_id == event_type_id && m.occupies(start, end))
            .collect())
    }

    /// Scheduled meetings that have not started yet, soonest first.
    pub fn list_upcoming(&self, now: DateTime<Utc>) -> Result<Vec<Meeting>, ServiceError> {
        let _guard = self.lock()?;
        let mut meetings: Vec<Meeting> = self
            .read_all()?
            .into_iter()
            .filter(|m| m.status == MeetingStatus::Scheduled && m.scheduled_at >= now)
            .collect();
        meetings.sort_by_key(|m| m.scheduled_at);
        Ok(meetings)
    }

    /// Everything that is no longer bookable history: started/elapsed
    /// meetings plus cancelled ones, most recent first.
    pub fn list_past(&self, now: DateTime<Utc>) -> Result<Vec<Meeting>, ServiceError> {
        let _guard = self.lock()?;
        let mut meetings: Vec<Meeting> = self
            .read_all()?
            .into_iter()
            .filter(|m| m.scheduled_at < now || m.status != MeetingStatus::Scheduled)
            .collect();
        meetings.sort_by_key(|m| std::cmp::Reverse(m.scheduled_at));
        Ok(meetings)
    }

    pub fn find_by_id(&self, id: u64) -> Result<Option<Meeting>, ServiceError> {
        let _guard = self.lock()?;
        Ok(self.read_all()?.into_iter().find(|m| m.id == id))
    }

    /// True when any scheduled meeting for the event type has not started
    /// yet. Used to refuse event-type deletion while bookings are live.
    pub fn has_upcoming_for_event_type(
        &self,
        event_type_id: u64,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let _guard = self.lock()?;
        Ok(self.read_all()?.iter().any(|m| {
            m.event_type_id == event_type_id
                && m.status == MeetingStatus::Scheduled
                && m.scheduled_at >= now
        }))
    }

    /// Cancel a meeting. Idempotent: cancelling an already-cancelled meeting
    /// is a no-op that returns the meeting unchanged. The freed interval is
    /// immediately visible to `find_overlapping`.
    pub fn cancel(&self, id: u64, now: DateTime<Utc>) -> Result<Meeting, ServiceError> {
        let _guard = self.lock()?;

        let mut meetings = self.read_all()?;
        let Some(index) = meetings.iter().position(|m| m.id == id) else {
            return Err(ServiceError::NotFound("meeting"));
        };

        if meetings[index].status == MeetingStatus::Cancelled {
            info!("Meeting {} is already cancelled, nothing to do", id);
            return Ok(meetings[index].clone());
        }

        meetings[index].status = MeetingStatus::Cancelled;
        meetings[index].cancelled_at = Some(now);
        let cancelled = meetings[index].clone();

        if let Err(e) = self.rewrite(&meetings) {
            error!("Failed to persist cancellation of meeting {}: {}", id, e);
            return Err(e);
        }

        info!(
            "Cancelled meeting {} (event type {}, was scheduled at {})",
            id, cancelled.event_type_slug, cancelled.scheduled_at
        );
        Ok(cancelled)
    }
}
