// Model exports
pub mod domain;
pub mod records;
pub mod upstream;

pub use domain::{Center, CenterId, CenterSlots, Exam, GeoPoint, MatchError, MatchedSlots, Slot, SlotKey, UserPreference};
pub use records::PreferenceRecord;
pub use upstream::{AvailabilityRequest, LoginRequest, RawAppointmentDate, RawExam, RawSlot};
