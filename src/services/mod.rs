// Service exports
pub mod booking;
pub mod credentials;
pub mod mailer;
pub mod postgres;
pub mod store;

pub use booking::{decode_slots, fetch_all, AuthError, AuthToken, AvailabilitySource, BookingClient, DecodedSlots, FetchError, FetchOutcome};
pub use credentials::{CredentialError, CredentialStorage, LocalFileStorage, MailCredentials, ObjectStorage};
pub use mailer::{EmailMessage, Mailer, SendError, SmtpMailer};
pub use postgres::PostgresClient;
pub use store::{CenterDirectory, PreferenceStore, SeenSlotStore, StoreError};
