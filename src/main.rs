use slotwatch::config::{LoggingSettings, Settings};
use slotwatch::jobs::{JobSettings, NotifyJob};
use slotwatch::services::{
    credentials, BookingClient, CredentialStorage, MailCredentials, PostgresClient, SeenSlotStore, SmtpMailer,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber
///
/// `RUST_LOG` wins over `LOG_LEVEL`, which wins over the configured level.
fn init_tracing(logging: &LoggingSettings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| logging.format.clone());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();
    let logging = settings
        .as_ref()
        .map(|s| s.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    info!("Starting slotwatch run...");

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration loaded successfully");

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let booking = Arc::new(BookingClient::new(&settings.booking)?);

    let postgres = Arc::new(PostgresClient::from_settings(&settings.database).await?);
    info!("PostgreSQL client initialized");

    let credential_store: Arc<dyn CredentialStorage> =
        Arc::from(credentials::from_settings(&settings.credentials).await?);

    let mail_credentials = match (&settings.mail.username, &settings.mail.password) {
        (Some(username), Some(password)) => MailCredentials {
            username: username.clone(),
            password: password.clone(),
        },
        _ => {
            info!("Loading mail credentials from {:?} store", settings.credentials.backend);
            credential_store.load_credentials().await?
        }
    };

    let mut mailer = SmtpMailer::new(&settings.mail, Some(mail_credentials))?;

    let seen = if settings.notification.suppress_repeats {
        Some(postgres.clone() as Arc<dyn SeenSlotStore>)
    } else {
        info!("Repeat suppression disabled");
        None
    };

    let job = NotifyJob {
        source: booking,
        centers: postgres.clone(),
        preferences: postgres,
        seen,
        tokens: Some(credential_store),
        settings: JobSettings {
            window_days: settings.notification.window_days,
            subject: settings.mail.subject.clone(),
        },
    };

    let today = chrono::Local::now().date_naive();
    job.run(&mut mailer, today).await?;

    Ok(())
}
