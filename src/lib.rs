//! Slotwatch - road test availability notifier
//!
//! Logs in to the provincial booking service, collects open road-test slots
//! across every known test center, matches them against each user's stored
//! preferences and emails one HTML digest per user.

pub mod config;
pub mod core;
pub mod jobs;
pub mod models;
pub mod services;

// Re-export commonly used types
pub use core::{match_slots, normalize, DigestRenderer};
pub use jobs::{NotifyJob, RunError, RunSummary};
pub use models::{Center, CenterId, MatchedSlots, RawSlot, Slot, UserPreference};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matched = MatchedSlots::new();
        assert!(matched.is_empty());

        let digest = DigestRenderer::new().unwrap().render(&matched.into_digest_order()).unwrap();
        assert!(!digest.html.contains("<li>"));
    }
}
