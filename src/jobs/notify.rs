use crate::core::{match_slots, normalize, referenced_pos_ids, AvailabilityWindow, DigestError, DigestRenderer};
use crate::models::{PreferenceRecord, Slot, UserPreference};
use crate::services::{
    fetch_all, AuthError, AuthToken, AvailabilitySource, CenterDirectory, CredentialStorage, EmailMessage,
    FetchError, Mailer, PreferenceStore, SeenSlotStore, SendError, StoreError,
};
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failures that end a run early
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Availability fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Mail transport error: {0}")]
    Mail(#[from] SendError),

    #[error("Digest templates failed to load: {0}")]
    Digest(#[from] DigestError),
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub centers_queried: usize,
    pub centers_failed: usize,
    pub raw_slots: usize,
    pub rejected_slots: usize,
    pub outside_window: usize,
    pub available_slots: usize,
    pub preferences: usize,
    pub invalid_preferences: usize,
    pub users_without_matches: usize,
    pub suppressed_slots: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
}

impl RunSummary {
    pub fn log(&self) {
        info!(
            centers_queried = self.centers_queried,
            centers_failed = self.centers_failed,
            raw_slots = self.raw_slots,
            rejected_slots = self.rejected_slots,
            outside_window = self.outside_window,
            available_slots = self.available_slots,
            preferences = self.preferences,
            invalid_preferences = self.invalid_preferences,
            users_without_matches = self.users_without_matches,
            suppressed_slots = self.suppressed_slots,
            emails_sent = self.emails_sent,
            emails_failed = self.emails_failed,
            "Run complete"
        );
    }
}

#[derive(Debug, Clone)]
pub struct JobSettings {
    pub window_days: u32,
    pub subject: String,
}

/// One pass from login to the last digest email
///
/// Collaborators are shared trait objects so the binary wires Postgres,
/// reqwest and S3 implementations while tests pass in-memory ones.
#[derive(Clone)]
pub struct NotifyJob {
    pub source: Arc<dyn AvailabilitySource>,
    pub centers: Arc<dyn CenterDirectory>,
    pub preferences: Arc<dyn PreferenceStore>,
    /// `None` disables repeat suppression
    pub seen: Option<Arc<dyn SeenSlotStore>>,
    pub tokens: Option<Arc<dyn CredentialStorage>>,
    pub settings: JobSettings,
}

impl NotifyJob {
    /// Execute one run
    ///
    /// # Stages
    /// 1. Authenticate (fatal)
    /// 2. Fetch, normalize and window the availability (fatal if every center fails)
    /// 3. Load preferences
    /// 4. Match, render and send one digest per user (per-user failures are logged)
    ///
    /// The mailer is opened before stage 4 and closed once after it.
    pub async fn run(&self, mailer: &mut dyn Mailer, today: NaiveDate) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();

        // Stage 1: login
        let token = self.source.authenticate().await?;
        info!("Authenticated with booking service");
        self.persist_token(&token).await;

        // Stage 2: availability
        let slots = self.collect_slots(&token, today, &mut summary).await?;
        if slots.is_empty() {
            info!("No appointments available, nothing to notify");
            summary.log();
            return Ok(summary);
        }

        // Stage 3: preferences
        let records = self.preferences.load_preferences().await?;
        summary.preferences = records.len();
        info!("Loaded {} user preferences", records.len());

        if let Some(seen) = &self.seen {
            match seen.prune(today).await {
                Ok(removed) => debug!("Pruned {} past notified slots", removed),
                Err(e) => warn!("Failed to prune notified slots: {}", e),
            }
        }

        // Stage 4: notify
        let renderer = DigestRenderer::new()?;
        mailer.open().await?;
        self.notify_all(mailer, &renderer, &slots, records, &mut summary).await;
        mailer.close().await;

        summary.log();
        Ok(summary)
    }

    async fn persist_token(&self, token: &AuthToken) {
        if let Some(tokens) = &self.tokens {
            if let Err(e) = tokens.save_token(token).await {
                warn!("Failed to save session token: {}", e);
            }
        }
    }

    async fn collect_slots(
        &self,
        token: &AuthToken,
        today: NaiveDate,
        summary: &mut RunSummary,
    ) -> Result<Vec<Slot>, RunError> {
        let centers = self.centers.all_centers().await?;
        info!("Querying availability for {} centers", centers.len());

        let outcome = fetch_all(self.source.as_ref(), &centers, token, today).await?;
        summary.centers_queried = outcome.centers_queried;
        summary.centers_failed = outcome.centers_failed;
        summary.raw_slots = outcome.raw_slots.len() + outcome.undecodable;

        let pos_ids = referenced_pos_ids(&outcome.raw_slots);
        let referenced = self.centers.centers_by_pos_ids(&pos_ids).await?;

        let normalized = normalize(&outcome.raw_slots, &referenced);
        summary.rejected_slots = normalized.rejected + outcome.undecodable;

        let mut slots = normalized.slots;
        let window = AvailabilityWindow::new(today, self.settings.window_days);
        summary.outside_window = window.apply(&mut slots);
        summary.available_slots = slots.len();

        info!(
            "{} slots available ({} rejected, {} outside the window)",
            slots.len(),
            summary.rejected_slots,
            summary.outside_window
        );

        Ok(slots)
    }

    async fn notify_all(
        &self,
        mailer: &mut dyn Mailer,
        renderer: &DigestRenderer,
        slots: &[Slot],
        records: Vec<PreferenceRecord>,
        summary: &mut RunSummary,
    ) {
        for record in records {
            let preference = match UserPreference::try_from(record) {
                Ok(preference) => preference,
                Err(e) => {
                    error!("Skipping preference: {}", e);
                    summary.invalid_preferences += 1;
                    continue;
                }
            };

            self.notify_user(mailer, renderer, slots, &preference, summary).await;
        }
    }

    async fn notify_user(
        &self,
        mailer: &mut dyn Mailer,
        renderer: &DigestRenderer,
        slots: &[Slot],
        preference: &UserPreference,
        summary: &mut RunSummary,
    ) {
        let owner = preference.owner_email.as_str();
        let mut matched = match_slots(slots, preference);

        if let Some(seen) = &self.seen {
            match seen.seen(owner).await {
                Ok(already) => {
                    let before = matched.slot_count();
                    matched.retain(|slot| slot.key().map_or(true, |key| !already.contains(&key)));
                    summary.suppressed_slots += before - matched.slot_count();
                }
                Err(e) => warn!(owner, "Failed to load notified slots, sending without filtering: {}", e),
            }
        }

        if matched.is_empty() {
            debug!(owner, "No matching appointments");
            summary.users_without_matches += 1;
            return;
        }

        let keys = matched.keys();
        let center_count = matched.center_count();
        let groups = matched.into_digest_order();

        let digest = match renderer.render(&groups) {
            Ok(digest) => digest,
            Err(e) => {
                error!(owner, "Failed to render digest: {}", e);
                summary.emails_failed += 1;
                return;
            }
        };

        let message = EmailMessage {
            to: owner.to_string(),
            subject: self.settings.subject.clone(),
            html_body: digest.html,
            text_body: digest.text,
        };

        if let Err(e) = mailer.send(&message).await {
            error!(owner, "Failed to send digest: {}", e);
            summary.emails_failed += 1;
            return;
        }

        info!(owner, "Sent digest with {} slots across {} centers", keys.len(), center_count);
        summary.emails_sent += 1;

        if let Some(seen) = &self.seen {
            if let Err(e) = seen.record(owner, &keys).await {
                warn!(owner, "Failed to record notified slots: {}", e);
            }
        }
    }
}
