use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::ServiceError;

static SLUG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("invalid slug pattern"));

/// A bookable meeting template. The slug is the external booking key and is
/// unique across all event types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventType {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub duration_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventTypeCreate {
    pub name: String,
    pub slug: String,
    pub duration_minutes: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventTypeUpdate {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub duration_minutes: Option<u32>,
}

pub fn validate_slug(slug: &str) -> Result<(), ServiceError> {
    if SLUG_PATTERN.is_match(slug) {
        Ok(())
    } else {
        Err(ServiceError::Validation(format!(
            "slug '{}' is invalid: only lowercase letters, digits and hyphens are allowed",
            slug
        )))
    }
}

pub fn validate_duration(duration_minutes: u32) -> Result<(), ServiceError> {
    if duration_minutes == 0 {
        return Err(ServiceError::Validation(
            "duration_minutes must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ServiceError> {
    if name.trim().is_empty() {
        return Err(ServiceError::Validation(
            "name must not be empty".to_string(),
        ));
    }
    Ok(())
}
