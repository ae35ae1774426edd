use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use tracing::debug;

use crate::models::availability::AvailabilityRule;

/// Day-of-week index used by availability rules: Monday=0 .. Sunday=6.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_monday() as u8
}

/// Resolve a rule's wall-clock window on a concrete organizer-local date to
/// an absolute half-open interval.
///
/// Returns None when a DST gap erases the wall-clock time; when the local
/// time is ambiguous (clocks rolled back) the earlier mapping wins.
fn resolve_window(
    rule: &AvailabilityRule,
    date: NaiveDate,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let tz: Tz = rule.tz();

    let start = tz.from_local_datetime(&date.and_time(rule.start_time)).earliest();
    let end = tz.from_local_datetime(&date.and_time(rule.end_time)).earliest();

    match (start, end) {
        (Some(start), Some(end)) => Some((start.with_timezone(&Utc), end.with_timezone(&Utc))),
        _ => {
            debug!(
                "Rule {} window on {} falls in a DST gap in {}, skipping",
                rule.id, date, rule.timezone
            );
            None
        }
    }
}

/// Merge strictly-overlapping absolute windows so overlapping rules cannot
/// double-count slots. Windows that merely touch are kept separate, so each
/// keeps its own duration alignment.
fn merge_windows(
    mut windows: Vec<(DateTime<Utc>, DateTime<Utc>)>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    windows.sort_by_key(|(start, _)| *start);

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(windows.len());
    for (start, end) in windows {
        match merged.last_mut() {
            Some((_, last_end)) if start < *last_end => {
                if end > *last_end {
                    *last_end = end;
                }
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// Produce the ordered, deduplicated candidate start instants for one event
/// type on `target_date` as seen from `viewer_tz`.
///
/// Pure and deterministic given `now`. Rules are evaluated on the organizer's
/// local calendar dates adjacent to the requested date, because a window
/// converted into the viewer's zone may land on the viewer's previous or next
/// calendar day; candidates are then filtered to those whose viewer-local
/// date equals `target_date`. Candidates earlier than `now` are never
/// offered.
pub fn generate_slots(
    rules: &[AvailabilityRule],
    target_date: NaiveDate,
    viewer_tz: Tz,
    duration_minutes: u32,
    now: DateTime<Utc>,
) -> Vec<DateTime<Utc>> {
    if rules.is_empty() || duration_minutes == 0 {
        return Vec::new();
    }

    let duration = Duration::minutes(i64::from(duration_minutes));

    // A rule's window on the organizer-local day before or after the
    // requested date can still produce instants on the viewer's date.
    let mut windows = Vec::new();
    for offset in -1i64..=1 {
        let Some(date) = target_date.checked_add_signed(Duration::days(offset)) else {
            continue;
        };
        let day = weekday_index(date);
        for rule in rules.iter().filter(|r| r.day_of_week == day) {
            if let Some(window) = resolve_window(rule, date) {
                windows.push(window);
            }
        }
    }

    let mut slots = BTreeSet::new();
    for (start, end) in merge_windows(windows) {
        let mut cursor = start;
        while cursor + duration <= end {
            if cursor >= now && cursor.with_timezone(&viewer_tz).date_naive() == target_date {
                slots.insert(cursor);
            }
            cursor += duration;
        }
    }

    slots.into_iter().collect()
}
