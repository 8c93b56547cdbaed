// Shared fixtures and in-memory fakes for the integration suites
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use slotwatch::config::BookingSettings;
use slotwatch::jobs::{JobSettings, NotifyJob};
use slotwatch::models::{
    Center, CenterId, GeoPoint, PreferenceRecord, RawAppointmentDate, RawExam, RawSlot, SlotKey,
};
use slotwatch::services::{
    AuthError, AuthToken, AvailabilitySource, CenterDirectory, CredentialError, CredentialStorage, DecodedSlots,
    EmailMessage, FetchError, MailCredentials, Mailer, PreferenceStore, SeenSlotStore, SendError, StoreError,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn create_center(id: i32, pos_id: i32, name: &str) -> Center {
    Center {
        id: CenterId(id),
        pos_id,
        name: name.to_string(),
        address: format!("{} Test Road", id),
        city: "Vancouver".to_string(),
        geo: GeoPoint { lat: 49.26, lng: -123.11 },
        url: format!("https://centers.test/{}", id),
    }
}

/// Centers 1, 2 and 3 at pos ids 101, 102 and 103
pub fn three_centers() -> Vec<Center> {
    vec![
        create_center(1, 101, "Burnaby"),
        create_center(2, 102, "North Vancouver"),
        create_center(3, 103, "Richmond"),
    ]
}

pub fn raw_slot(pos_id: i32, on: &str, day: &str, start: &str, end: &str) -> RawSlot {
    RawSlot {
        appointment: Some(RawAppointmentDate {
            date: Some(on.to_string()),
            day_of_week: Some(day.to_string()),
        }),
        exam: Some(RawExam {
            code: Some("5-R-1".to_string()),
            description: Some("Class 5 Road Test".to_string()),
        }),
        start_time: Some(start.to_string()),
        end_time: Some(end.to_string()),
        external_message_id: Some(1),
        pos_id: Some(pos_id),
        resource_id: Some(7),
        signature: Some("sig".to_string()),
    }
}

pub fn preference_record(email: &str, centers: &[i32], days: &[i32]) -> PreferenceRecord {
    PreferenceRecord {
        id: Uuid::new_v4(),
        email: email.to_string(),
        preferred_centers: centers.to_vec(),
        preferred_days: days.to_vec(),
        start_date: Some(date(2024, 6, 1)),
        end_date: Some(date(2024, 6, 30)),
    }
}

pub fn booking_settings(base_url: &str) -> BookingSettings {
    BookingSettings {
        login_url: format!("{}/login", base_url),
        availability_url: format!("{}/availability", base_url),
        exam_type: "5-R-1".to_string(),
        last_name: "DOE".to_string(),
        license_number: "1234567".to_string(),
        keyword: "secret".to_string(),
        timeout_secs: 5,
    }
}

/// Availability source backed by a fixed table of records per pos id
#[derive(Default)]
pub struct FakeSource {
    pub auth_fails: bool,
    pub slots: HashMap<i32, Vec<RawSlot>>,
    /// Records per pos id that the source could not decode
    pub undecodable: HashMap<i32, usize>,
    pub failing: HashSet<i32>,
}

impl FakeSource {
    pub fn with_slots(slots: Vec<RawSlot>) -> Self {
        let mut by_pos: HashMap<i32, Vec<RawSlot>> = HashMap::new();
        for slot in slots {
            by_pos.entry(slot.pos_id.unwrap_or_default()).or_default().push(slot);
        }
        Self {
            slots: by_pos,
            ..Self::default()
        }
    }
}

#[async_trait]
impl AvailabilitySource for FakeSource {
    async fn authenticate(&self) -> Result<AuthToken, AuthError> {
        if self.auth_fails {
            return Err(AuthError::MissingToken);
        }
        Ok(AuthToken::new("Bearer test-token"))
    }

    async fn fetch_center(
        &self,
        center: &Center,
        _token: &AuthToken,
        _exam_date: NaiveDate,
    ) -> Result<DecodedSlots, FetchError> {
        if self.failing.contains(&center.pos_id) {
            return Err(FetchError::ApiError(format!("pos {} unavailable", center.pos_id)));
        }
        Ok(DecodedSlots {
            slots: self.slots.get(&center.pos_id).cloned().unwrap_or_default(),
            undecodable: self.undecodable.get(&center.pos_id).copied().unwrap_or_default(),
        })
    }
}

/// Token store that remembers every saved token, or refuses all saves
#[derive(Default)]
pub struct FakeTokenStore {
    pub saved: Mutex<Vec<String>>,
    pub read_only: bool,
}

#[async_trait]
impl CredentialStorage for FakeTokenStore {
    async fn load_credentials(&self) -> Result<MailCredentials, CredentialError> {
        Ok(MailCredentials {
            username: "alerts@example.com".to_string(),
            password: "app-password".to_string(),
        })
    }

    async fn save_token(&self, token: &AuthToken) -> Result<(), CredentialError> {
        if self.read_only {
            return Err(CredentialError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "token file is read-only",
            )));
        }
        self.saved.lock().unwrap().push(token.as_str().to_string());
        Ok(())
    }
}

pub struct FakeDirectory {
    pub centers: Vec<Center>,
}

#[async_trait]
impl CenterDirectory for FakeDirectory {
    async fn all_centers(&self) -> Result<Vec<Center>, StoreError> {
        Ok(self.centers.clone())
    }

    async fn centers_by_pos_ids(&self, pos_ids: &[i32]) -> Result<Vec<Center>, StoreError> {
        Ok(self
            .centers
            .iter()
            .filter(|c| pos_ids.contains(&c.pos_id))
            .cloned()
            .collect())
    }
}

pub struct FakePreferences {
    pub records: Vec<PreferenceRecord>,
}

#[async_trait]
impl PreferenceStore for FakePreferences {
    async fn load_preferences(&self) -> Result<Vec<PreferenceRecord>, StoreError> {
        Ok(self.records.clone())
    }
}

#[derive(Default)]
pub struct MemorySeen {
    pub keys: Mutex<HashMap<String, HashSet<SlotKey>>>,
}

#[async_trait]
impl SeenSlotStore for MemorySeen {
    async fn seen(&self, owner_email: &str) -> Result<HashSet<SlotKey>, StoreError> {
        Ok(self
            .keys
            .lock()
            .unwrap()
            .get(owner_email)
            .cloned()
            .unwrap_or_default())
    }

    async fn record(&self, owner_email: &str, keys: &[SlotKey]) -> Result<(), StoreError> {
        self.keys
            .lock()
            .unwrap()
            .entry(owner_email.to_string())
            .or_default()
            .extend(keys.iter().cloned());
        Ok(())
    }

    async fn prune(&self, before: NaiveDate) -> Result<u64, StoreError> {
        let mut removed = 0;
        for keys in self.keys.lock().unwrap().values_mut() {
            let len = keys.len();
            keys.retain(|k| k.date >= before);
            removed += (len - keys.len()) as u64;
        }
        Ok(removed)
    }
}

/// Mailer that keeps every delivered message and fails for chosen recipients
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Vec<EmailMessage>,
    pub fail_for: HashSet<String>,
    pub opened: usize,
    pub closed: usize,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn open(&mut self) -> Result<(), SendError> {
        self.opened += 1;
        Ok(())
    }

    async fn send(&mut self, message: &EmailMessage) -> Result<(), SendError> {
        if self.fail_for.contains(&message.to) {
            return Err(SendError::Unreachable("smtp.test:587".to_string()));
        }
        self.sent.push(message.clone());
        Ok(())
    }

    async fn close(&mut self) {
        self.closed += 1;
    }
}

pub fn create_job(
    source: Arc<dyn AvailabilitySource>,
    centers: Vec<Center>,
    records: Vec<PreferenceRecord>,
    seen: Option<Arc<MemorySeen>>,
    window_days: u32,
) -> NotifyJob {
    NotifyJob {
        source,
        centers: Arc::new(FakeDirectory { centers }),
        preferences: Arc::new(FakePreferences { records }),
        seen: seen.map(|s| s as Arc<dyn SeenSlotStore>),
        tokens: None,
        settings: JobSettings {
            window_days,
            subject: "New road test availability".to_string(),
        },
    }
}
