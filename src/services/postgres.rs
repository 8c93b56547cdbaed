use crate::config::DatabaseSettings;
use crate::models::{Center, CenterId, GeoPoint, PreferenceRecord, SlotKey};
use crate::services::store::{CenterDirectory, PreferenceStore, SeenSlotStore, StoreError};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashSet;
use std::time::Duration;

const CENTER_COLUMNS: &str = r#"
    id, pos_id, name, address, city, url,
    lat::DOUBLE PRECISION AS lat,
    lng::DOUBLE PRECISION AS lng
"#;

/// PostgreSQL client backing the center directory, the preference store
/// and the seen-slot store
///
/// Centers and preferences are owned by the lead-management application and
/// only read here. The `seen_slots` table belongs to this crate and is
/// created by the embedded migrations.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            &settings.url,
            settings.max_connections.unwrap_or(5),
            settings.min_connections.unwrap_or(1),
        )
        .await
    }
}

fn center_from_row(row: &PgRow) -> Result<Center, StoreError> {
    Ok(Center {
        id: CenterId(row.try_get("id")?),
        pos_id: row.try_get("pos_id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        city: row.try_get("city")?,
        geo: GeoPoint {
            lat: row.try_get("lat")?,
            lng: row.try_get("lng")?,
        },
        url: row.try_get("url")?,
    })
}

#[async_trait]
impl CenterDirectory for PostgresClient {
    async fn all_centers(&self) -> Result<Vec<Center>, StoreError> {
        let query = format!("SELECT {} FROM centers ORDER BY id", CENTER_COLUMNS);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let centers = rows.iter().map(center_from_row).collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} centers", centers.len());

        Ok(centers)
    }

    async fn centers_by_pos_ids(&self, pos_ids: &[i32]) -> Result<Vec<Center>, StoreError> {
        if pos_ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            "SELECT {} FROM centers WHERE pos_id = ANY($1) ORDER BY id",
            CENTER_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(pos_ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(center_from_row).collect()
    }
}

#[async_trait]
impl PreferenceStore for PostgresClient {
    /// Load every preference attached to a lead with an email address
    async fn load_preferences(&self) -> Result<Vec<PreferenceRecord>, StoreError> {
        let query = r#"
            SELECT
                up.id,
                l.email,
                up.preferred_days,
                up.start_date,
                up.end_date,
                COALESCE(
                    array_agg(upc.center_id) FILTER (WHERE upc.center_id IS NOT NULL),
                    '{}'::INTEGER[]
                ) AS preferred_centers
            FROM user_preferences up
            JOIN leads l ON l.id = up.lead_id
            LEFT JOIN user_preferences_centers upc ON upc.user_preference_id = up.id
            WHERE l.email IS NOT NULL AND l.email <> ''
            GROUP BY up.id, l.email, up.preferred_days, up.start_date, up.end_date
            ORDER BY l.email
        "#;

        let rows = sqlx::query(query).fetch_all(&self.pool).await?;

        let records = rows
            .iter()
            .map(|row| -> Result<PreferenceRecord, StoreError> {
                let preferred_days: Option<Vec<i32>> = row.try_get("preferred_days")?;
                Ok(PreferenceRecord {
                    id: row.try_get("id")?,
                    email: row.try_get("email")?,
                    preferred_centers: row.try_get("preferred_centers")?,
                    preferred_days: preferred_days.unwrap_or_default(),
                    start_date: row.try_get("start_date")?,
                    end_date: row.try_get("end_date")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!("Loaded {} preference records", records.len());

        Ok(records)
    }
}

#[async_trait]
impl SeenSlotStore for PostgresClient {
    async fn seen(&self, owner_email: &str) -> Result<HashSet<SlotKey>, StoreError> {
        let query = r#"
            SELECT center_id, slot_date, start_time
            FROM seen_slots
            WHERE owner_email = $1
        "#;

        let rows = sqlx::query(query)
            .bind(owner_email)
            .fetch_all(&self.pool)
            .await?;

        let keys = rows
            .iter()
            .map(|row| -> Result<SlotKey, StoreError> {
                Ok(SlotKey {
                    center_id: CenterId(row.try_get("center_id")?),
                    date: row.try_get("slot_date")?,
                    start_time: row.try_get("start_time")?,
                })
            })
            .collect::<Result<HashSet<_>, _>>()?;

        tracing::debug!(owner = owner_email, "{} slots already notified", keys.len());

        Ok(keys)
    }

    /// Uses INSERT ... ON CONFLICT DO NOTHING so re-recording is harmless
    async fn record(&self, owner_email: &str, keys: &[SlotKey]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }

        let query = r#"
            INSERT INTO seen_slots (owner_email, center_id, slot_date, start_time, notified_at)
            VALUES ($1, $2, $3, $4, NOW())
            ON CONFLICT (owner_email, center_id, slot_date, start_time) DO NOTHING
        "#;

        let mut tx = self.pool.begin().await?;
        for key in keys {
            sqlx::query(query)
                .bind(owner_email)
                .bind(key.center_id.0)
                .bind(key.date)
                .bind(key.start_time)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!(owner = owner_email, "Recorded {} notified slots", keys.len());

        Ok(())
    }

    async fn prune(&self, before: NaiveDate) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM seen_slots WHERE slot_date < $1")
            .bind(before)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
