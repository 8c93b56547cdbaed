use crate::config::{CredentialBackend, CredentialSettings};
use crate::services::booking::AuthToken;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_REGION: &str = "us-east-1";

/// Errors from the credential store
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed credential document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    #[error("Credential store misconfigured: {0}")]
    Misconfigured(String),
}

/// SMTP login for the mail transport
#[derive(Clone, Serialize, Deserialize)]
pub struct MailCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for MailCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Token document persisted after login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub saved_at: DateTime<Utc>,
}

impl StoredToken {
    fn now(token: &AuthToken) -> Self {
        Self {
            token: token.as_str().to_string(),
            saved_at: Utc::now(),
        }
    }
}

/// Where mail credentials are read from and the session token is kept
#[async_trait]
pub trait CredentialStorage: Send + Sync {
    async fn load_credentials(&self) -> Result<MailCredentials, CredentialError>;

    async fn save_token(&self, token: &AuthToken) -> Result<(), CredentialError>;
}

/// JSON files on the local filesystem
pub struct LocalFileStorage {
    credentials_path: PathBuf,
    token_path: PathBuf,
}

impl LocalFileStorage {
    pub fn new(credentials_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials_path: credentials_path.into(),
            token_path: token_path.into(),
        }
    }
}

#[async_trait]
impl CredentialStorage for LocalFileStorage {
    async fn load_credentials(&self) -> Result<MailCredentials, CredentialError> {
        let raw = tokio::fs::read(&self.credentials_path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    async fn save_token(&self, token: &AuthToken) -> Result<(), CredentialError> {
        let body = serde_json::to_vec_pretty(&StoredToken::now(token))?;
        tokio::fs::write(&self.token_path, body).await?;

        tracing::debug!("Token saved to {}", self.token_path.display());

        Ok(())
    }
}

/// Objects in an S3-compatible bucket
pub struct ObjectStorage {
    client: Client,
    bucket: String,
    credentials_key: String,
    token_key: String,
}

impl ObjectStorage {
    pub fn new(client: Client, bucket: String, credentials_key: String, token_key: String) -> Self {
        Self {
            client,
            bucket,
            credentials_key,
            token_key,
        }
    }
}

#[async_trait]
impl CredentialStorage for ObjectStorage {
    async fn load_credentials(&self) -> Result<MailCredentials, CredentialError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&self.credentials_key)
            .send()
            .await
            .map_err(|e| {
                CredentialError::ObjectStorage(format!(
                    "Failed to download {} from {}: {}",
                    self.credentials_key, self.bucket, e
                ))
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| CredentialError::ObjectStorage(format!("Failed to read object body: {}", e)))?
            .into_bytes();

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save_token(&self, token: &AuthToken) -> Result<(), CredentialError> {
        let body = serde_json::to_vec(&StoredToken::now(token))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&self.token_key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                CredentialError::ObjectStorage(format!(
                    "Failed to upload {} to {}: {}",
                    self.token_key, self.bucket, e
                ))
            })?;

        tracing::debug!("Token uploaded to s3://{}/{}", self.bucket, self.token_key);

        Ok(())
    }
}

/// Build an S3 client, path-style when a custom endpoint is given
pub async fn create_s3_client(endpoint: Option<&str>, region: Option<&str>) -> Client {
    let region = region.unwrap_or(DEFAULT_REGION).to_string();
    let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region));

    if let Some(endpoint_url) = endpoint {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let config = config_builder.load().await;

    let s3_config_builder = aws_sdk_s3::config::Builder::from(&config);
    let s3_config = if endpoint.is_some() {
        s3_config_builder.force_path_style(true).build()
    } else {
        s3_config_builder.build()
    };

    Client::from_conf(s3_config)
}

/// Select the credential store named by configuration
pub async fn from_settings(
    settings: &CredentialSettings,
) -> Result<Box<dyn CredentialStorage>, CredentialError> {
    match settings.backend {
        CredentialBackend::Local => Ok(Box::new(LocalFileStorage::new(
            settings.credentials_path.clone(),
            settings.token_path.clone(),
        ))),
        CredentialBackend::S3 => {
            let bucket = settings
                .bucket
                .clone()
                .ok_or_else(|| CredentialError::Misconfigured("credentials.bucket is required for the s3 backend".to_string()))?;

            let client = create_s3_client(settings.endpoint.as_deref(), settings.region.as_deref()).await;

            Ok(Box::new(ObjectStorage::new(
                client,
                bucket,
                settings.credentials_key.clone(),
                settings.token_key.clone(),
            )))
        }
    }
}
