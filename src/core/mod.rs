// Core pipeline exports
pub mod days;
pub mod digest;
pub mod filters;
pub mod matcher;
pub mod normalizer;

pub use days::{day_name, parse_weekday, weekday_from_index};
pub use digest::{Digest, DigestError, DigestRenderer};
pub use filters::{matches_center, matches_date_range, matches_day, AvailabilityWindow};
pub use matcher::match_slots;
pub use normalizer::{normalize, referenced_pos_ids, Normalized, ValidationError};
