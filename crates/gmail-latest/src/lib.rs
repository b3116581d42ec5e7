//! Fetch the newest unread Gmail message for a delegated user and reduce it to
//! plain text.
//!
//! The pipeline authenticates with a service-account key under domain-wide
//! delegation, lists the inbox for one unread message, fetches it in full and
//! decodes its body. [`fetch_latest_unread_text`] always yields text: the
//! decoded body, one of the configured sentinels, or an error description.
//!
//! ```no_run
//! # async fn example() {
//! let key = std::fs::read("service-account.json").unwrap_or_default();
//! let settings = gmail_latest::Settings::default();
//! let text = gmail_latest::fetch_latest_unread_text(&key, "alice@example.com", &settings).await;
//! println!("{text}");
//! # }
//! ```

mod auth;
mod body;
mod client;
mod config;
mod credential;
mod error;
mod fetcher;
mod types;

pub use auth::{AuthorizedClient, Authenticator, DelegatedIdentity, GMAIL_READONLY_SCOPE};
pub use body::{decode_body, extract_body};
pub use client::{DEFAULT_GMAIL_ENDPOINT, GmailClient};
pub use config::{CONFIG_ENV_VAR, ConfigError, Sentinels, Settings};
pub use credential::{CredentialError, ServiceAccountKey};
pub use error::{DecodeError, FetchError};
pub use fetcher::{LatestMessage, MessageFetcher, Outcome, render};
pub use types::{MessageHeader, MessagePart, MessagePartBody};

/// Runs the whole pipeline and returns the result text.
///
/// Every failure, including unusable key material, is folded into the
/// returned string.
pub async fn fetch_latest_unread_text(
    credential: &[u8],
    identity: &str,
    settings: &Settings,
) -> String {
    render(
        fetch_latest_unread(credential, identity, settings).await,
        &settings.sentinels,
    )
}

/// Runs the whole pipeline, keeping the typed outcome and error.
///
/// # Errors
///
/// Returns [`FetchError::Credential`] if the key or identity is unusable,
/// otherwise any error from [`MessageFetcher::fetch_latest_unread`].
pub async fn fetch_latest_unread(
    credential: &[u8],
    identity: &str,
    settings: &Settings,
) -> Result<Outcome, FetchError> {
    let key = ServiceAccountKey::from_slice(credential)?;
    let identity = DelegatedIdentity::new(identity)?;

    let http = reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout())
        .build()?;

    let mut authenticator = Authenticator::new(key).with_http_client(http);
    if let Some(token_uri) = &settings.token_uri {
        authenticator = authenticator.with_token_uri(token_uri.clone());
    }

    let client = GmailClient::new(authenticator.authorize(identity), &settings.endpoint)?;
    MessageFetcher::new(client, settings.labels.clone(), settings.timeout())
        .fetch_latest_unread()
        .await
}
