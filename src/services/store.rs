use crate::models::{Center, PreferenceRecord, SlotKey};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised by the persistent stores
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

/// Directory of test centers
#[async_trait]
pub trait CenterDirectory: Send + Sync {
    async fn all_centers(&self) -> Result<Vec<Center>, StoreError>;

    /// Centers whose external pos_id is in `pos_ids`
    async fn centers_by_pos_ids(&self, pos_ids: &[i32]) -> Result<Vec<Center>, StoreError>;
}

/// Read-only access to user preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load_preferences(&self) -> Result<Vec<PreferenceRecord>, StoreError>;
}

/// Slots already notified, per user
#[async_trait]
pub trait SeenSlotStore: Send + Sync {
    async fn seen(&self, owner_email: &str) -> Result<HashSet<SlotKey>, StoreError>;

    async fn record(&self, owner_email: &str, keys: &[SlotKey]) -> Result<(), StoreError>;

    /// Forget slots dated before `before`, returning how many were removed
    async fn prune(&self, before: NaiveDate) -> Result<u64, StoreError>;
}
