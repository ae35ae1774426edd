use chrono::{DateTime, NaiveTime, Utc};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::error::ServiceError;
use crate::models::availability::{
    validate_rule_fields, AvailabilityRule, AvailabilityRuleCreate, AvailabilityRuleUpdate,
};
use crate::models::event_type::{
    validate_duration, validate_name, validate_slug, EventType, EventTypeCreate, EventTypeUpdate,
};

const TIME_FORMAT: &str = "%H:%M:%S";

#[derive(Debug, Serialize, Deserialize)]
struct EventTypeRow {
    id: u64,
    name: String,
    slug: String,
    duration_minutes: u32,
    created_at: String,
    updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RuleRow {
    id: u64,
    event_type_id: u64,
    day_of_week: u8,
    start_time: String,
    end_time: String,
    timezone: String,
}

fn parse_instant(value: &str, field: &str) -> Result<DateTime<Utc>, ServiceError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ServiceError::Storage(format!("invalid {} timestamp '{}': {}", field, value, e)))
}

fn parse_time(value: &str, field: &str) -> Result<NaiveTime, ServiceError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| ServiceError::Storage(format!("invalid {} value '{}': {}", field, value, e)))
}

impl EventTypeRow {
    fn from_event_type(event_type: &EventType) -> Self {
        Self {
            id: event_type.id,
            name: event_type.name.clone(),
            slug: event_type.slug.clone(),
            duration_minutes: event_type.duration_minutes,
            created_at: event_type.created_at.to_rfc3339(),
            updated_at: event_type.updated_at.to_rfc3339(),
        }
    }

    fn into_event_type(self) -> Result<EventType, ServiceError> {
        Ok(EventType {
            id: self.id,
            name: self.name,
            slug: self.slug,
            duration_minutes: self.duration_minutes,
            created_at: parse_instant(&self.created_at, "created_at")?,
            updated_at: parse_instant(&self.updated_at, "updated_at")?,
        })
    }
}

impl RuleRow {
    fn from_rule(rule: &AvailabilityRule) -> Self {
        Self {
            id: rule.id,
            event_type_id: rule.event_type_id,
            day_of_week: rule.day_of_week,
            start_time: rule.start_time.format(TIME_FORMAT).to_string(),
            end_time: rule.end_time.format(TIME_FORMAT).to_string(),
            timezone: rule.timezone.clone(),
        }
    }

    fn into_rule(self) -> Result<AvailabilityRule, ServiceError> {
        Ok(AvailabilityRule {
            id: self.id,
            event_type_id: self.event_type_id,
            day_of_week: self.day_of_week,
            start_time: parse_time(&self.start_time, "start_time")?,
            end_time: parse_time(&self.end_time, "end_time")?,
            timezone: self.timezone,
        })
    }
}

fn ensure_file(csv_path: &str, headers: &[&str]) -> Result<(), ServiceError> {
    if Path::new(csv_path).exists() {
        return Ok(());
    }
    info!("Creating new catalog file at {}", csv_path);

    let file = File::create(csv_path)
        .map_err(|e| ServiceError::Storage(format!("failed to create catalog file: {}", e)))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    writer
        .write_record(headers)
        .map_err(|e| ServiceError::Storage(format!("failed to write headers: {}", e)))?;
    writer
        .flush()
        .map_err(|e| ServiceError::Storage(format!("failed to flush headers: {}", e)))
}

fn read_rows<R: DeserializeOwned>(csv_path: &str) -> Result<Vec<R>, ServiceError> {
    let file = File::open(csv_path)
        .map_err(|e| ServiceError::Storage(format!("failed to open catalog file: {}", e)))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
    let mut rows = Vec::new();
    for result in reader.deserialize::<R>() {
        rows.push(result.map_err(|e| ServiceError::Storage(format!("failed to read row: {}", e)))?);
    }
    Ok(rows)
}

fn write_rows<R: Serialize>(csv_path: &str, rows: &[R]) -> Result<(), ServiceError> {
    let file = OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(csv_path)
        .map_err(|e| {
            ServiceError::Storage(format!("failed to open catalog file for writing: {}", e))
        })?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| ServiceError::Storage(format!("failed to write row: {}", e)))?;
    }
    writer
        .flush()
        .map_err(|e| ServiceError::Storage(format!("failed to flush writer: {}", e)))
}

/// Store of event types and their availability rules, backed by two CSV
/// files. The booking engine only reads from it; writes come from the
/// organizer's administrative screens.
pub struct CatalogService {
    event_types_path: String,
    rules_path: String,
    event_types_mutex: Mutex<()>,
    rules_mutex: Mutex<()>,
}

impl CatalogService {
    pub fn new(event_types_path: &str, rules_path: &str) -> Result<Self, ServiceError> {
        ensure_file(
            event_types_path,
            &["id", "name", "slug", "duration_minutes", "created_at", "updated_at"],
        )?;
        ensure_file(
            rules_path,
            &["id", "event_type_id", "day_of_week", "start_time", "end_time", "timezone"],
        )?;

        Ok(Self {
            event_types_path: event_types_path.to_string(),
            rules_path: rules_path.to_string(),
            event_types_mutex: Mutex::new(()),
            rules_mutex: Mutex::new(()),
        })
    }

    fn lock_event_types(&self) -> Result<MutexGuard<'_, ()>, ServiceError> {
        self.event_types_mutex
            .lock()
            .map_err(|e| ServiceError::Storage(format!("catalog mutex poisoned: {}", e)))
    }

    fn lock_rules(&self) -> Result<MutexGuard<'_, ()>, ServiceError> {
        self.rules_mutex
            .lock()
            .map_err(|e| ServiceError::Storage(format!("catalog mutex poisoned: {}", e)))
    }

    // Callers must hold the event types mutex.
    fn read_event_types(&self) -> Result<Vec<EventType>, ServiceError> {
        read_rows::<EventTypeRow>(&self.event_types_path)?
            .into_iter()
            .map(EventTypeRow::into_event_type)
            .collect()
    }

    // Callers must hold the rules mutex.
    fn read_rules(&self) -> Result<Vec<AvailabilityRule>, ServiceError> {
        read_rows::<RuleRow>(&self.rules_path)?
            .into_iter()
            .map(RuleRow::into_rule)
            .collect()
    }

    // Callers must hold the event types mutex.
    fn write_event_types(&self, event_types: &[EventType]) -> Result<(), ServiceError> {
        let rows: Vec<EventTypeRow> = event_types.iter().map(EventTypeRow::from_event_type).collect();
        write_rows(&self.event_types_path, &rows)
    }

    // Callers must hold the rules mutex.
    fn write_rules(&self, rules: &[AvailabilityRule]) -> Result<(), ServiceError> {
        let rows: Vec<RuleRow> = rules.iter().map(RuleRow::from_rule).collect();
        write_rows(&self.rules_path, &rows)
    }

    pub fn create_event_type(&self, payload: EventTypeCreate) -> Result<EventType, ServiceError> {
        validate_name(&payload.name)?;
        validate_slug(&payload.slug)?;
        validate_duration(payload.duration_minutes)?;

        let _guard = self.lock_event_types()?;
        let mut event_types = self.read_event_types()?;

        if event_types.iter().any(|et| et.slug == payload.slug) {
            return Err(ServiceError::Validation(format!(
                "slug '{}' already exists",
                payload.slug
            )));
        }

        let now = Utc::now();
        let event_type = EventType {
            id: event_types.iter().map(|et| et.id).max().unwrap_or(0) + 1,
            name: payload.name,
            slug: payload.slug,
            duration_minutes: payload.duration_minutes,
            created_at: now,
            updated_at: now,
        };

        event_types.push(event_type.clone());
        self.write_event_types(&event_types)?;

        info!("Created event type '{}' (slug: {})", event_type.name, event_type.slug);
        Ok(event_type)
    }

    pub fn list_event_types(&self) -> Result<Vec<EventType>, ServiceError> {
        let _guard = self.lock_event_types()?;
        self.read_event_types()
    }

    pub fn get_event_type(&self, id: u64) -> Result<EventType, ServiceError> {
        let _guard = self.lock_event_types()?;
        self.read_event_types()?
            .into_iter()
            .find(|et| et.id == id)
            .ok_or(ServiceError::NotFound("event type"))
    }

    pub fn find_event_type_by_slug(&self, slug: &str) -> Result<EventType, ServiceError> {
        let _guard = self.lock_event_types()?;
        self.read_event_types()?
            .into_iter()
            .find(|et| et.slug == slug)
            .ok_or(ServiceError::NotFound("event type"))
    }

    pub fn update_event_type(
        &self,
        id: u64,
        payload: EventTypeUpdate,
    ) -> Result<EventType, ServiceError> {
        if let Some(name) = &payload.name {
            validate_name(name)?;
        }
        if let Some(slug) = &payload.slug {
            validate_slug(slug)?;
        }
        if let Some(duration) = payload.duration_minutes {
            validate_duration(duration)?;
        }

        let _guard = self.lock_event_types()?;
        let mut event_types = self.read_event_types()?;

        if let Some(slug) = &payload.slug {
            if event_types.iter().any(|et| et.slug == *slug && et.id != id) {
                return Err(ServiceError::Validation(format!(
                    "slug '{}' already exists",
                    slug
                )));
            }
        }

        let Some(event_type) = event_types.iter_mut().find(|et| et.id == id) else {
            return Err(ServiceError::NotFound("event type"));
        };

        if let Some(name) = payload.name {
            event_type.name = name;
        }
        if let Some(slug) = payload.slug {
            event_type.slug = slug;
        }
        if let Some(duration) = payload.duration_minutes {
            event_type.duration_minutes = duration;
        }
        event_type.updated_at = Utc::now();
        let updated = event_type.clone();

        self.write_event_types(&event_types)?;
        info!("Updated event type {} (slug: {})", updated.id, updated.slug);
        Ok(updated)
    }

    /// Delete an event type and cascade to its availability rules. The
    /// caller is responsible for refusing deletion while upcoming meetings
    /// reference the event type.
    pub fn delete_event_type(&self, id: u64) -> Result<(), ServiceError> {
        {
            let _guard = self.lock_event_types()?;
            let mut event_types = self.read_event_types()?;
            let before = event_types.len();
            event_types.retain(|et| et.id != id);
            if event_types.len() == before {
                return Err(ServiceError::NotFound("event type"));
            }
            self.write_event_types(&event_types)?;
        }

        let removed = self.delete_rules_for_event_type(id)?;
        info!("Deleted event type {} and {} availability rules", id, removed);
        Ok(())
    }

    pub fn rules_for_event_type(
        &self,
        event_type_id: u64,
    ) -> Result<Vec<AvailabilityRule>, ServiceError> {
        let _guard = self.lock_rules()?;
        Ok(self
            .read_rules()?
            .into_iter()
            .filter(|r| r.event_type_id == event_type_id)
            .collect())
    }

    pub fn create_rule(
        &self,
        payload: AvailabilityRuleCreate,
    ) -> Result<AvailabilityRule, ServiceError> {
        validate_rule_fields(
            payload.day_of_week,
            payload.start_time,
            payload.end_time,
            &payload.timezone,
        )?;
        // Confirm the owning event type exists before persisting.
        self.get_event_type(payload.event_type_id)?;

        let _guard = self.lock_rules()?;
        let mut rules = self.read_rules()?;

        let rule = AvailabilityRule {
            id: rules.iter().map(|r| r.id).max().unwrap_or(0) + 1,
            event_type_id: payload.event_type_id,
            day_of_week: payload.day_of_week,
            start_time: payload.start_time,
            end_time: payload.end_time,
            timezone: payload.timezone,
        };

        rules.push(rule.clone());
        self.write_rules(&rules)?;

        info!(
            "Created availability rule {} for event type {} (day {}, {}-{} {})",
            rule.id, rule.event_type_id, rule.day_of_week, rule.start_time, rule.end_time,
            rule.timezone
        );
        Ok(rule)
    }

    /// Create several rules at once. All payloads are validated before any
    /// row is written, so a bad entry never leaves a partial batch behind.
    pub fn create_rules_bulk(
        &self,
        payloads: Vec<AvailabilityRuleCreate>,
    ) -> Result<Vec<AvailabilityRule>, ServiceError> {
        for payload in &payloads {
            validate_rule_fields(
                payload.day_of_week,
                payload.start_time,
                payload.end_time,
                &payload.timezone,
            )?;
            self.get_event_type(payload.event_type_id)?;
        }

        let _guard = self.lock_rules()?;
        let mut rules = self.read_rules()?;
        let mut next_id = rules.iter().map(|r| r.id).max().unwrap_or(0) + 1;

        let mut created = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let rule = AvailabilityRule {
                id: next_id,
                event_type_id: payload.event_type_id,
                day_of_week: payload.day_of_week,
                start_time: payload.start_time,
                end_time: payload.end_time,
                timezone: payload.timezone,
            };
            next_id += 1;
            rules.push(rule.clone());
            created.push(rule);
        }

        self.write_rules(&rules)?;
        info!("Created {} availability rules in bulk", created.len());
        Ok(created)
    }

    pub fn update_rule(
        &self,
        id: u64,
        payload: AvailabilityRuleUpdate,
    ) -> Result<AvailabilityRule, ServiceError> {
        let _guard = self.lock_rules()?;
        let mut rules = self.read_rules()?;

        let Some(rule) = rules.iter_mut().find(|r| r.id == id) else {
            return Err(ServiceError::NotFound("availability rule"));
        };

        // Validate the merged result, not the individual fields, so a
        // partial update cannot break the start < end invariant.
        let day_of_week = payload.day_of_week.unwrap_or(rule.day_of_week);
        let start_time = payload.start_time.unwrap_or(rule.start_time);
        let end_time = payload.end_time.unwrap_or(rule.end_time);
        let timezone = payload.timezone.unwrap_or_else(|| rule.timezone.clone());
        validate_rule_fields(day_of_week, start_time, end_time, &timezone)?;

        rule.day_of_week = day_of_week;
        rule.start_time = start_time;
        rule.end_time = end_time;
        rule.timezone = timezone;
        let updated = rule.clone();

        self.write_rules(&rules)?;
        info!("Updated availability rule {}", id);
        Ok(updated)
    }

    pub fn delete_rule(&self, id: u64) -> Result<(), ServiceError> {
        let _guard = self.lock_rules()?;
        let mut rules = self.read_rules()?;
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(ServiceError::NotFound("availability rule"));
        }
        self.write_rules(&rules)?;
        info!("Deleted availability rule {}", id);
        Ok(())
    }

    pub fn delete_rules_for_event_type(&self, event_type_id: u64) -> Result<usize, ServiceError> {
        let _guard = self.lock_rules()?;
        let mut rules = self.read_rules()?;
        let before = rules.len();
        rules.retain(|r| r.event_type_id != event_type_id);
        let removed = before - rules.len();
        if removed > 0 {
            self.write_rules(&rules)?;
        }
        Ok(removed)
    }
}
