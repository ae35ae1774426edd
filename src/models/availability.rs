use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ServiceError;
use crate::models::common::default_timezone;

/// A recurring weekly open window for one event type.
///
/// `day_of_week` uses Monday=0 through Sunday=6. Start and end are wall-clock
/// times in the rule's own IANA timezone; a rule never spans midnight
/// (start < end is enforced at creation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: u64,
    pub event_type_id: u64,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub timezone: String,
}

impl AvailabilityRule {
    /// Resolve the rule's timezone. Rules are validated at creation, so a
    /// parse failure here means the record was edited out-of-band; fall back
    /// to UTC rather than dropping the window silently.
    pub fn tz(&self) -> Tz {
        self.timezone.parse().unwrap_or_else(|_| {
            warn!(
                "Rule {} has unknown timezone '{}', treating as UTC",
                self.id, self.timezone
            );
            chrono_tz::UTC
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityRuleCreate {
    pub event_type_id: u64,
    pub day_of_week: u8,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilityRuleUpdate {
    pub day_of_week: Option<u8>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub timezone: Option<String>,
}

/// Field-level invariants shared by create, bulk-create and update paths.
pub fn validate_rule_fields(
    day_of_week: u8,
    start_time: NaiveTime,
    end_time: NaiveTime,
    timezone: &str,
) -> Result<(), ServiceError> {
    if day_of_week > 6 {
        return Err(ServiceError::Validation(
            "day_of_week must be between 0 and 6 (Monday=0)".to_string(),
        ));
    }
    // start >= end also rejects midnight-spanning windows, which the slot
    // generator does not support.
    if start_time >= end_time {
        return Err(ServiceError::Validation(
            "start_time must be before end_time".to_string(),
        ));
    }
    if timezone.parse::<Tz>().is_err() {
        return Err(ServiceError::Validation(format!(
            "unknown timezone: {}",
            timezone
        )));
    }
    Ok(())
}
