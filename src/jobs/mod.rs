// Batch job exports
pub mod notify;

pub use notify::{JobSettings, NotifyJob, RunError, RunSummary};
