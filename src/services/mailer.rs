use crate::config::MailSettings;
use crate::services::credentials::MailCredentials;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use thiserror::Error;

/// Errors from the mail transport
#[derive(Debug, Error)]
pub enum SendError {
    #[error("Mail transport is not open")]
    NotOpen,

    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] lettre::address::AddressError),

    #[error("Failed to build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("SMTP server at {0} did not accept the connection")]
    Unreachable(String),
}

/// One outgoing digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

/// Mail transport with an explicit open/close lifecycle
///
/// `open` is called once per run before the first send and `close` exactly
/// once afterwards.
#[async_trait]
pub trait Mailer: Send {
    async fn open(&mut self) -> Result<(), SendError>;

    async fn send(&mut self, message: &EmailMessage) -> Result<(), SendError>;

    async fn close(&mut self);
}

/// SMTP mailer on top of lettre
pub struct SmtpMailer {
    host: String,
    port: u16,
    timeout: Duration,
    sender: Mailbox,
    credentials: Option<MailCredentials>,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl SmtpMailer {
    pub fn new(settings: &MailSettings, credentials: Option<MailCredentials>) -> Result<Self, SendError> {
        let address: Address = settings.sender_email.parse()?;

        Ok(Self {
            host: settings.smtp_host.clone(),
            port: settings.smtp_port,
            timeout: Duration::from_secs(settings.timeout_secs),
            sender: Mailbox::new(settings.from_name.clone(), address),
            credentials,
            transport: None,
        })
    }

    fn build_message(&self, email: &EmailMessage) -> Result<Message, SendError> {
        let to: Mailbox = email.to.parse()?;

        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(&email.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text_body.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html_body.clone()),
                    ),
            )?;

        Ok(message)
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn open(&mut self) -> Result<(), SendError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .timeout(Some(self.timeout));

        if let Some(creds) = &self.credentials {
            builder = builder.credentials(Credentials::new(creds.username.clone(), creds.password.clone()));
        }

        let transport = builder.build();
        if !transport.test_connection().await? {
            return Err(SendError::Unreachable(format!("{}:{}", self.host, self.port)));
        }

        tracing::info!("SMTP connection to {}:{} established", self.host, self.port);
        self.transport = Some(transport);

        Ok(())
    }

    async fn send(&mut self, email: &EmailMessage) -> Result<(), SendError> {
        let transport = self.transport.as_ref().ok_or(SendError::NotOpen)?;
        let message = self.build_message(email)?;

        transport.send(message).await?;

        Ok(())
    }

    async fn close(&mut self) {
        if self.transport.take().is_some() {
            tracing::info!("SMTP connection closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> MailSettings {
        MailSettings {
            smtp_host: "smtp.example.com".to_string(),
            smtp_port: 587,
            sender_email: "alerts@example.com".to_string(),
            from_name: Some("Slot Alerts".to_string()),
            subject: "New road test slots".to_string(),
            username: None,
            password: None,
            timeout_secs: 10,
        }
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut bad = settings();
        bad.sender_email = "not-an-address".to_string();

        assert!(matches!(SmtpMailer::new(&bad, None), Err(SendError::InvalidAddress(_))));
    }

    #[test]
    fn test_build_message_headers() {
        let mailer = SmtpMailer::new(&settings(), None).unwrap();
        let email = EmailMessage {
            to: "driver@example.com".to_string(),
            subject: "New road test slots".to_string(),
            html_body: "<html><body>hi</body></html>".to_string(),
            text_body: "hi".to_string(),
        };

        let message = mailer.build_message(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("To: driver@example.com"));
        assert!(raw.contains("Subject: New road test slots"));
        assert!(raw.contains("Slot Alerts"));
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("text/plain"));
        assert!(raw.contains("text/html"));
    }

    #[tokio::test]
    async fn test_send_before_open_fails() {
        let mut mailer = SmtpMailer::new(&settings(), None).unwrap();
        let email = EmailMessage {
            to: "driver@example.com".to_string(),
            subject: "s".to_string(),
            html_body: String::new(),
            text_body: String::new(),
        };

        assert!(matches!(mailer.send(&email).await, Err(SendError::NotOpen)));

        // close without open is a no-op
        mailer.close().await;
    }
}
