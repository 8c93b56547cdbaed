use crate::core::days::weekday_from_index;
use crate::models::domain::{CenterId, MatchError, UserPreference};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Preference row as read from the preference store
///
/// Owned by the lead-management side; this crate only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PreferenceRecord {
    pub id: Uuid,
    #[validate(email)]
    pub email: String,
    pub preferred_centers: Vec<i32>,
    /// 0 = Monday .. 6 = Sunday
    pub preferred_days: Vec<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TryFrom<PreferenceRecord> for UserPreference {
    type Error = MatchError;

    fn try_from(record: PreferenceRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let invalid = move |reason: String| MatchError::InvalidPreference { id, reason };

        if let Err(errors) = record.validate() {
            return Err(invalid(errors.to_string()));
        }

        let start_date = record
            .start_date
            .ok_or_else(|| invalid("missing start_date".to_string()))?;
        let end_date = record
            .end_date
            .ok_or_else(|| invalid("missing end_date".to_string()))?;

        let preferred_days = record
            .preferred_days
            .iter()
            .map(|&day| {
                weekday_from_index(day).ok_or_else(|| invalid(format!("day index {} out of range", day)))
            })
            .collect::<Result<_, _>>()?;

        Ok(UserPreference {
            id: record.id,
            owner_email: record.email,
            preferred_centers: record.preferred_centers.into_iter().map(CenterId).collect(),
            preferred_days,
            start_date,
            end_date,
        })
    }
}
