use serde::{Deserialize, Serialize};

/// Login body for the booking API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "drvrLastName")]
    pub last_name: String,
    #[serde(rename = "licenceNumber")]
    pub licence_number: String,
    pub keyword: String,
}

/// Availability query for a single center
///
/// The day and part-of-day filters are sent as JSON-encoded strings, which
/// is what the booking API expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    #[serde(rename = "aPosID")]
    pub pos_id: i32,
    #[serde(rename = "examType")]
    pub exam_type: String,
    #[serde(rename = "examDate")]
    pub exam_date: String,
    #[serde(rename = "ignoreReserveTime")]
    pub ignore_reserve_time: bool,
    #[serde(rename = "prfDaysOfWeek")]
    pub preferred_days_of_week: String,
    #[serde(rename = "prfPartsOfDay")]
    pub preferred_parts_of_day: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
    #[serde(rename = "licenseNumber")]
    pub license_number: String,
}

/// Every day of the week, Monday first
pub const ALL_DAYS_OF_WEEK: &str = "[0,1,2,3,4,5,6]";
/// Morning and afternoon
pub const ALL_PARTS_OF_DAY: &str = "[0,1]";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAppointmentDate {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(rename = "dayOfWeek", default)]
    pub day_of_week: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawExam {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Slot record as returned by the booking API
///
/// Every field is optional so that one odd record does not fail decoding of
/// the whole response; the normalizer decides what is usable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSlot {
    #[serde(rename = "appointmentDt", default)]
    pub appointment: Option<RawAppointmentDate>,
    #[serde(rename = "dlExam", default)]
    pub exam: Option<RawExam>,
    #[serde(rename = "startTm", default)]
    pub start_time: Option<String>,
    #[serde(rename = "endTm", default)]
    pub end_time: Option<String>,
    #[serde(rename = "lemgMsgId", default)]
    pub external_message_id: Option<i64>,
    #[serde(rename = "posId", default)]
    pub pos_id: Option<i32>,
    #[serde(rename = "resourceId", default)]
    pub resource_id: Option<i64>,
    #[serde(default)]
    pub signature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_slot_wire_format() {
        let json = r#"{
            "appointmentDt": {"date": "2025-11-28", "dayOfWeek": "Friday"},
            "dlExam": {"code": "5-R-1", "description": "5-R-ROAD"},
            "endTm": "15:30",
            "lemgMsgId": 35,
            "posId": 274,
            "resourceId": 21903,
            "signature": "abc",
            "startTm": "14:55"
        }"#;

        let raw: RawSlot = serde_json::from_str(json).unwrap();

        assert_eq!(raw.pos_id, Some(274));
        assert_eq!(raw.start_time.as_deref(), Some("14:55"));
        let appointment = raw.appointment.unwrap();
        assert_eq!(appointment.date.as_deref(), Some("2025-11-28"));
        assert_eq!(appointment.day_of_week.as_deref(), Some("Friday"));
    }

    #[test]
    fn test_raw_slot_tolerates_missing_fields() {
        let raw: RawSlot = serde_json::from_str(r#"{"posId": 9}"#).unwrap();
        assert_eq!(raw.pos_id, Some(9));
        assert!(raw.appointment.is_none());
    }

    #[test]
    fn test_availability_request_field_names() {
        let request = AvailabilityRequest {
            pos_id: 73,
            exam_type: "5-R-1".to_string(),
            exam_date: "2024-10-25".to_string(),
            ignore_reserve_time: false,
            preferred_days_of_week: ALL_DAYS_OF_WEEK.to_string(),
            preferred_parts_of_day: ALL_PARTS_OF_DAY.to_string(),
            last_name: "DOE".to_string(),
            license_number: "1234567".to_string(),
        };

        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["aPosID"], 73);
        assert_eq!(value["prfDaysOfWeek"], "[0,1,2,3,4,5,6]");
        assert_eq!(value["prfPartsOfDay"], "[0,1]");
        assert_eq!(value["ignoreReserveTime"], false);
    }
}
