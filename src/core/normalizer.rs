use crate::core::days::parse_weekday;
use crate::models::{Center, Exam, RawSlot, Slot};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Why a raw slot record could not be normalized
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid day of week {0:?}")]
    InvalidDay(String),

    #[error("Invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),

    #[error("Day {day} does not match date {date} (a {actual})")]
    DayMismatch {
        date: NaiveDate,
        day: Weekday,
        actual: Weekday,
    },
}

/// Output of a normalization pass
#[derive(Debug, Default)]
pub struct Normalized {
    pub slots: Vec<Slot>,
    /// Records skipped because they failed validation
    pub rejected: usize,
}

/// Distinct pos ids referenced by the raw records
///
/// Used to load only the centers that are needed from the directory.
pub fn referenced_pos_ids(raw_slots: &[RawSlot]) -> Vec<i32> {
    let mut ids: Vec<i32> = raw_slots
        .iter()
        .filter_map(|r| r.pos_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    ids.sort_unstable();
    ids
}

/// Turn raw upstream records into typed slots
///
/// Malformed records are logged and skipped; the rest are kept. A slot whose
/// pos id is not among `centers` is kept without a center.
pub fn normalize(raw_slots: &[RawSlot], centers: &[Center]) -> Normalized {
    let wanted: HashSet<i32> = raw_slots.iter().filter_map(|r| r.pos_id).collect();
    let lookup: HashMap<i32, Arc<Center>> = centers
        .iter()
        .filter(|c| wanted.contains(&c.pos_id))
        .map(|c| (c.pos_id, Arc::new(c.clone())))
        .collect();

    let mut out = Normalized::default();

    for raw in raw_slots {
        match normalize_one(raw, &lookup) {
            Ok(slot) => out.slots.push(slot),
            Err(e) => {
                tracing::warn!(pos_id = ?raw.pos_id, "Skipping malformed slot record: {}", e);
                out.rejected += 1;
            }
        }
    }

    if out.slots.iter().any(|s| s.center.is_none()) {
        tracing::debug!(
            "{} slots reference pos ids missing from the center directory",
            out.slots.iter().filter(|s| s.center.is_none()).count()
        );
    }

    out
}

/// Normalize a single record
pub fn normalize_one(
    raw: &RawSlot,
    centers: &HashMap<i32, Arc<Center>>,
) -> Result<Slot, ValidationError> {
    let appointment = raw
        .appointment
        .as_ref()
        .ok_or(ValidationError::MissingField("appointmentDt"))?;

    let date_str = appointment
        .date
        .as_deref()
        .ok_or(ValidationError::MissingField("appointmentDt.date"))?;
    let date = parse_date(date_str)?;

    let day_str = appointment
        .day_of_week
        .as_deref()
        .ok_or(ValidationError::MissingField("appointmentDt.dayOfWeek"))?;
    let day = parse_weekday(day_str).ok_or_else(|| ValidationError::InvalidDay(day_str.to_string()))?;

    if date.weekday() != day {
        return Err(ValidationError::DayMismatch {
            date,
            day,
            actual: date.weekday(),
        });
    }

    let start_time = parse_time(
        raw.start_time
            .as_deref()
            .ok_or(ValidationError::MissingField("startTm"))?,
    )?;
    let end_time = parse_time(
        raw.end_time
            .as_deref()
            .ok_or(ValidationError::MissingField("endTm"))?,
    )?;

    let exam = raw
        .exam
        .as_ref()
        .map(|e| Exam {
            code: e.code.clone().unwrap_or_default(),
            description: e.description.clone().unwrap_or_default(),
        })
        .unwrap_or_default();

    let center = raw.pos_id.and_then(|id| centers.get(&id).cloned());

    Ok(Slot {
        date,
        day_of_week: day,
        exam,
        start_time,
        end_time,
        center,
    })
}

fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

fn parse_time(value: &str) -> Result<NaiveTime, ValidationError> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime(value.to_string()))
}
