use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Stable internal identifier of a test center
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CenterId(pub i32);

impl fmt::Display for CenterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Geographic position of a center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Test center as stored in the center directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Center {
    pub id: CenterId,
    /// Identifier the booking API knows this center by
    pub pos_id: i32,
    pub name: String,
    pub address: String,
    pub city: String,
    pub geo: GeoPoint,
    pub url: String,
}

/// Exam type offered in a slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    pub code: String,
    pub description: String,
}

/// A normalized appointment opening
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub date: NaiveDate,
    pub day_of_week: Weekday,
    pub exam: Exam,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// `None` when the upstream pos id is not in the center directory
    pub center: Option<Arc<Center>>,
}

impl Slot {
    pub fn center_id(&self) -> Option<CenterId> {
        self.center.as_ref().map(|c| c.id)
    }

    /// Key identifying this opening across runs
    pub fn key(&self) -> Option<SlotKey> {
        self.center_id().map(|center_id| SlotKey {
            center_id,
            date: self.date,
            start_time: self.start_time,
        })
    }
}

/// Identity of an opening used for repeat suppression
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotKey {
    pub center_id: CenterId,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

/// A user's notification filter
#[derive(Debug, Clone, PartialEq)]
pub struct UserPreference {
    pub id: Uuid,
    pub owner_email: String,
    pub preferred_centers: HashSet<CenterId>,
    pub preferred_days: HashSet<Weekday>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Raised when a stored preference cannot be used for matching
#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("Invalid preference {id}: {reason}")]
    InvalidPreference { id: Uuid, reason: String },
}

/// Matched slots of a single center
#[derive(Debug, Clone, PartialEq)]
pub struct CenterSlots {
    pub center: Arc<Center>,
    pub slots: Vec<Slot>,
}

/// Per-user match result, keyed by center id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchedSlots {
    groups: BTreeMap<CenterId, CenterSlots>,
}

impl MatchedSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a slot under its center; slots without a center are ignored
    pub fn push(&mut self, slot: Slot) {
        let Some(center) = slot.center.clone() else {
            return;
        };

        self.groups
            .entry(center.id)
            .or_insert_with(|| CenterSlots {
                center,
                slots: Vec::new(),
            })
            .slots
            .push(slot);
    }

    pub fn is_empty(&self) -> bool {
        self.groups.values().all(|g| g.slots.is_empty())
    }

    /// Number of centers with at least one slot
    pub fn center_count(&self) -> usize {
        self.groups.values().filter(|g| !g.slots.is_empty()).count()
    }

    pub fn slot_count(&self) -> usize {
        self.groups.values().map(|g| g.slots.len()).sum()
    }

    pub fn get(&self, center_id: CenterId) -> Option<&CenterSlots> {
        self.groups.get(&center_id)
    }

    pub fn keys(&self) -> Vec<SlotKey> {
        self.groups
            .values()
            .flat_map(|g| g.slots.iter().filter_map(Slot::key))
            .collect()
    }

    /// Keep only slots for which `keep` returns true, dropping emptied centers
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Slot) -> bool,
    {
        for group in self.groups.values_mut() {
            group.slots.retain(|slot| keep(slot));
        }
        self.groups.retain(|_, g| !g.slots.is_empty());
    }

    /// Centers ordered by display name, slots in chronological order
    pub fn into_digest_order(self) -> Vec<CenterSlots> {
        let mut groups: Vec<CenterSlots> = self
            .groups
            .into_values()
            .filter(|g| !g.slots.is_empty())
            .collect();

        for group in &mut groups {
            group.slots.sort_by_key(|s| (s.date, s.start_time));
        }
        groups.sort_by(|a, b| {
            a.center
                .name
                .cmp(&b.center.name)
                .then_with(|| a.center.id.cmp(&b.center.id))
        });

        groups
    }
}
