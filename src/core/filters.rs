use crate::models::{Slot, UserPreference};
use chrono::NaiveDate;

/// Check if the slot belongs to one of the user's preferred centers
///
/// Slots without a known center never pass.
#[inline]
pub fn matches_center(slot: &Slot, preference: &UserPreference) -> bool {
    slot.center_id()
        .map(|id| preference.preferred_centers.contains(&id))
        .unwrap_or(false)
}

/// Check if the slot falls on one of the user's preferred days
#[inline]
pub fn matches_day(slot: &Slot, preference: &UserPreference) -> bool {
    preference.preferred_days.contains(&slot.day_of_week)
}

/// Check if the slot date is within the preference range, both ends included
#[inline]
pub fn matches_date_range(slot: &Slot, preference: &UserPreference) -> bool {
    slot.date >= preference.start_date && slot.date <= preference.end_date
}

/// Polling window applied to every slot before matching
///
/// Slots dated before `today` are stale. With a non-zero `window_days`,
/// slots on or after `today + window_days` are beyond the horizon.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityWindow {
    pub from: NaiveDate,
    pub until: Option<NaiveDate>,
}

impl AvailabilityWindow {
    pub fn new(today: NaiveDate, window_days: u32) -> Self {
        let until = if window_days == 0 {
            None
        } else {
            today.checked_add_days(chrono::Days::new(window_days as u64))
        };

        Self { from: today, until }
    }

    #[inline]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && self.until.map_or(true, |until| date < until)
    }

    /// Drop slots outside the window, returning how many were removed
    pub fn apply(&self, slots: &mut Vec<Slot>) -> usize {
        let before = slots.len();
        slots.retain(|s| self.contains(s.date));
        before - slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Center, CenterId, Exam, GeoPoint};
    use chrono::{Datelike, NaiveTime, Weekday};
    use std::collections::HashSet;
    use std::sync::Arc;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_slot(center_id: Option<i32>, on: NaiveDate) -> Slot {
        Slot {
            date: on,
            day_of_week: on.weekday(),
            exam: Exam::default(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 35, 0).unwrap(),
            center: center_id.map(|id| {
                Arc::new(Center {
                    id: CenterId(id),
                    pos_id: id,
                    name: format!("Center {}", id),
                    address: String::new(),
                    city: String::new(),
                    geo: GeoPoint { lat: 0.0, lng: 0.0 },
                    url: String::new(),
                })
            }),
        }
    }

    fn create_test_preference() -> UserPreference {
        UserPreference {
            id: Uuid::new_v4(),
            owner_email: "a@example.com".to_string(),
            preferred_centers: HashSet::from([CenterId(1)]),
            preferred_days: HashSet::from([Weekday::Mon]),
            start_date: date(2024, 6, 1),
            end_date: date(2024, 6, 30),
        }
    }

    #[test]
    fn test_center_filter() {
        let preference = create_test_preference();

        assert!(matches_center(&create_test_slot(Some(1), date(2024, 6, 10)), &preference));
        assert!(!matches_center(&create_test_slot(Some(2), date(2024, 6, 10)), &preference));
        assert!(!matches_center(&create_test_slot(None, date(2024, 6, 10)), &preference));
    }

    #[test]
    fn test_day_filter() {
        let preference = create_test_preference();

        assert!(matches_day(&create_test_slot(Some(1), date(2024, 6, 10)), &preference));
        assert!(!matches_day(&create_test_slot(Some(1), date(2024, 6, 11)), &preference));
    }

    #[test]
    fn test_date_range_inclusive() {
        let preference = create_test_preference();

        assert!(matches_date_range(&create_test_slot(Some(1), date(2024, 6, 1)), &preference));
        assert!(matches_date_range(&create_test_slot(Some(1), date(2024, 6, 30)), &preference));
        assert!(!matches_date_range(&create_test_slot(Some(1), date(2024, 5, 31)), &preference));
        assert!(!matches_date_range(&create_test_slot(Some(1), date(2024, 7, 1)), &preference));
    }

    #[test]
    fn test_window_bounds() {
        let window = AvailabilityWindow::new(date(2024, 6, 1), 15);

        assert!(!window.contains(date(2024, 5, 31)));
        assert!(window.contains(date(2024, 6, 1)));
        assert!(window.contains(date(2024, 6, 15)));
        assert!(!window.contains(date(2024, 6, 16)));
    }

    #[test]
    fn test_zero_window_is_unbounded() {
        let window = AvailabilityWindow::new(date(2024, 6, 1), 0);

        assert!(window.contains(date(2030, 1, 1)));
        assert!(!window.contains(date(2024, 5, 1)));
    }

    #[test]
    fn test_window_apply_counts_removed() {
        let window = AvailabilityWindow::new(date(2024, 6, 1), 15);
        let mut slots = vec![
            create_test_slot(Some(1), date(2024, 5, 20)),
            create_test_slot(Some(1), date(2024, 6, 3)),
            create_test_slot(Some(1), date(2024, 8, 1)),
        ];

        assert_eq!(window.apply(&mut slots), 2);
        assert_eq!(slots.len(), 1);
    }
}
