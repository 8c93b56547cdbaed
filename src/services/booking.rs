use crate::config::BookingSettings;
use crate::models::upstream::{ALL_DAYS_OF_WEEK, ALL_PARTS_OF_DAY};
use crate::models::{AvailabilityRequest, Center, LoginRequest, RawSlot};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors from the login step
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Login request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Login rejected with status {0}")]
    Rejected(StatusCode),

    #[error("Login response carried no Authorization header")]
    MissingToken,
}

/// Errors from availability requests
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("All {0} centers failed to return availability")]
    AllCentersFailed(usize),
}

/// Bearer token issued by the booking service
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Records returned for one center
#[derive(Debug, Default)]
pub struct DecodedSlots {
    pub slots: Vec<RawSlot>,
    /// Array elements that did not decode as a slot record
    pub undecodable: usize,
}

/// Decode each element of an availability response on its own
///
/// A malformed element is logged and counted; its siblings are kept.
pub fn decode_slots(pos_id: i32, values: Vec<serde_json::Value>) -> DecodedSlots {
    let mut decoded = DecodedSlots::default();

    for value in values {
        match serde_json::from_value::<RawSlot>(value) {
            Ok(slot) => decoded.slots.push(slot),
            Err(e) => {
                tracing::warn!(pos_id, "Skipping undecodable slot record: {}", e);
                decoded.undecodable += 1;
            }
        }
    }

    decoded
}

/// Source of open appointment slots
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    /// Log in and return the bearer token
    async fn authenticate(&self) -> Result<AuthToken, AuthError>;

    /// Open slots at one center from `exam_date` onwards
    async fn fetch_center(
        &self,
        center: &Center,
        token: &AuthToken,
        exam_date: NaiveDate,
    ) -> Result<DecodedSlots, FetchError>;
}

/// Raw records gathered across centers
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub raw_slots: Vec<RawSlot>,
    pub undecodable: usize,
    pub centers_queried: usize,
    pub centers_failed: usize,
}

/// Query every center in turn
///
/// A failing center is logged and contributes nothing. Only when every
/// queried center fails does the whole fetch fail.
pub async fn fetch_all(
    source: &dyn AvailabilitySource,
    centers: &[Center],
    token: &AuthToken,
    exam_date: NaiveDate,
) -> Result<FetchOutcome, FetchError> {
    let mut outcome = FetchOutcome::default();

    for center in centers {
        outcome.centers_queried += 1;
        match source.fetch_center(center, token, exam_date).await {
            Ok(decoded) => {
                tracing::debug!(center = %center.name, pos_id = center.pos_id, "Fetched {} slots", decoded.slots.len());
                outcome.raw_slots.extend(decoded.slots);
                outcome.undecodable += decoded.undecodable;
            }
            Err(e) => {
                tracing::error!(center = %center.name, pos_id = center.pos_id, "Failed to retrieve appointments: {}", e);
                outcome.centers_failed += 1;
            }
        }
    }

    if outcome.centers_queried > 0 && outcome.centers_failed == outcome.centers_queried {
        return Err(FetchError::AllCentersFailed(outcome.centers_failed));
    }

    Ok(outcome)
}

/// Headers the booking web client sends
const BROWSER_HEADERS: &[(&str, &str)] = &[
    ("Accept", "application/json, text/plain, */*"),
    ("Cache-Control", "no-cache, no-store"),
    ("Pragma", "no-cache"),
    ("Expires", "0"),
    ("Referer", "https://onlinebusiness.icbc.com/webdeas-ui/booking"),
    (
        "User-Agent",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    ),
];

/// Booking API client
///
/// Handles:
/// - Logging in with the configured driver identity
/// - Requesting open slots per center
pub struct BookingClient {
    login_url: String,
    availability_url: String,
    exam_type: String,
    last_name: String,
    license_number: String,
    keyword: String,
    client: Client,
}

impl BookingClient {
    /// Create a new booking client
    pub fn new(settings: &BookingSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            login_url: settings.login_url.clone(),
            availability_url: settings.availability_url.clone(),
            exam_type: settings.exam_type.clone(),
            last_name: settings.last_name.clone(),
            license_number: settings.license_number.clone(),
            keyword: settings.keyword.clone(),
            client,
        })
    }

    fn with_browser_headers(&self, mut request: RequestBuilder) -> RequestBuilder {
        for (name, value) in BROWSER_HEADERS {
            request = request.header(*name, *value);
        }
        request
    }

    fn availability_request(&self, center: &Center, exam_date: NaiveDate) -> AvailabilityRequest {
        AvailabilityRequest {
            pos_id: center.pos_id,
            exam_type: self.exam_type.clone(),
            exam_date: exam_date.format("%Y-%m-%d").to_string(),
            ignore_reserve_time: false,
            preferred_days_of_week: ALL_DAYS_OF_WEEK.to_string(),
            preferred_parts_of_day: ALL_PARTS_OF_DAY.to_string(),
            last_name: self.last_name.clone(),
            license_number: self.license_number.clone(),
        }
    }
}

#[async_trait]
impl AvailabilitySource for BookingClient {
    async fn authenticate(&self) -> Result<AuthToken, AuthError> {
        let body = LoginRequest {
            last_name: self.last_name.clone(),
            licence_number: self.license_number.clone(),
            keyword: self.keyword.clone(),
        };

        tracing::debug!("Logging in at {}", self.login_url);

        let response = self
            .with_browser_headers(self.client.put(&self.login_url))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AuthError::Rejected(response.status()));
        }

        let token = response
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingToken)?;

        Ok(AuthToken::new(token))
    }

    async fn fetch_center(
        &self,
        center: &Center,
        token: &AuthToken,
        exam_date: NaiveDate,
    ) -> Result<DecodedSlots, FetchError> {
        let body = self.availability_request(center, exam_date);

        let response = self
            .with_browser_headers(self.client.post(&self.availability_url))
            .header(AUTHORIZATION, token.as_str())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ApiError(format!(
                "Availability for pos {} failed: {}",
                center.pos_id, status
            )));
        }

        let values = response.json::<Vec<serde_json::Value>>().await.map_err(|e| {
            FetchError::InvalidResponse(format!(
                "Failed to parse availability for pos {}: {}",
                center.pos_id, e
            ))
        })?;

        Ok(decode_slots(center.pos_id, values))
    }
}
