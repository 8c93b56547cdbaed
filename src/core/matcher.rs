use crate::core::filters::{matches_center, matches_date_range, matches_day};
use crate::models::{MatchedSlots, Slot, UserPreference};

/// Select the slots relevant to one user, grouped by center
///
/// # Pipeline Stages
/// 1. Known and preferred center
/// 2. Preferred day of week
/// 3. Inclusive date range
///
/// Returns an empty result when nothing matches. Input order is kept within
/// each center; callers decide presentation order.
pub fn match_slots(slots: &[Slot], preference: &UserPreference) -> MatchedSlots {
    let mut matched = MatchedSlots::new();

    slots
        .iter()
        // Stage 1: center
        .filter(|slot| matches_center(slot, preference))
        // Stage 2: day of week
        .filter(|slot| matches_day(slot, preference))
        // Stage 3: date range
        .filter(|slot| matches_date_range(slot, preference))
        .for_each(|slot| matched.push(slot.clone()));

    matched
}
