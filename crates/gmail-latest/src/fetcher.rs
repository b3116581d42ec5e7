//! List the newest unread message, fetch it in full and reduce it to plain
//! text.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{
    body::{decode_body, extract_body},
    client::GmailClient,
    config::Sentinels,
    error::FetchError,
    types::{GmailMessage, ListMessagesResponse},
};

const UNREAD_QUERY: &str = "is:unread";

/// The newest unread message, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestMessage {
    pub id: String,
    pub thread_id: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub text: String,
}

/// Terminal state of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The unread query returned nothing.
    NoNewMessages,
    /// The latest message carries no inline text.
    NoText { message_id: String },
    /// The latest message was decoded.
    Decoded(LatestMessage),
}

#[derive(Debug)]
pub struct MessageFetcher {
    client: GmailClient,
    labels: Vec<String>,
    timeout: Duration,
}

impl MessageFetcher {
    /// Restricts the unread query to messages carrying every label in
    /// `labels`.
    pub fn new(client: GmailClient, labels: Vec<String>, timeout: Duration) -> Self {
        Self {
            client,
            labels,
            timeout,
        }
    }

    /// Runs list, get and decode under one deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The token exchange or either API call fails or is rejected
    /// - A response lacks the expected fields
    /// - The body data is not valid base64url or UTF-8
    /// - The deadline expires first
    pub async fn fetch_latest_unread(&self) -> Result<Outcome, FetchError> {
        tokio::time::timeout(self.timeout, self.fetch_inner())
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }

    async fn fetch_inner(&self) -> Result<Outcome, FetchError> {
        // One `labelIds` pair per label; the API ANDs repeated keys.
        let mut query: Vec<(&str, &str)> = self
            .labels
            .iter()
            .map(|label| ("labelIds", label.as_str()))
            .collect();
        query.extend([("q", UNREAD_QUERY), ("maxResults", "1")]);

        let list: ListMessagesResponse = self
            .client
            .get_json(&["users", "me", "messages"], &query)
            .await?;
        debug!(estimate = list.result_size_estimate, "listed unread messages");

        // The provider lists newest first; only the head is ever fetched.
        let Some(latest) = list.messages.into_iter().next() else {
            return Ok(Outcome::NoNewMessages);
        };

        let message: GmailMessage = self
            .client
            .get_json(
                &["users", "me", "messages", &latest.id],
                &[("format", "full")],
            )
            .await?;

        let payload = message.payload.ok_or_else(|| {
            FetchError::MalformedResponse(format!("message {} has no payload", message.id))
        })?;

        let Some(data) = extract_body(&payload) else {
            return Ok(Outcome::NoText {
                message_id: message.id,
            });
        };
        let text = decode_body(data)?;

        Ok(Outcome::Decoded(LatestMessage {
            from: payload.header("From").map(str::to_string),
            subject: payload.header("Subject").map(str::to_string),
            thread_id: message.thread_id.or(latest.thread_id),
            id: message.id,
            text,
        }))
    }
}

/// Converts a pass result into the single result text.
pub fn render(result: Result<Outcome, FetchError>, sentinels: &Sentinels) -> String {
    match result {
        Ok(Outcome::NoNewMessages) => {
            info!("no unread messages");
            sentinels.no_new_messages.clone()
        }
        Ok(Outcome::NoText { message_id }) => {
            info!(%message_id, "latest unread message has no text body");
            sentinels.no_text.clone()
        }
        Ok(Outcome::Decoded(message)) => {
            info!(message_id = %message.id, chars = message.text.chars().count(), "decoded latest unread message");
            message.text
        }
        Err(error) => {
            warn!(%error, "retrieval failed");
            format!("{}: {error}", sentinels.error_prefix)
        }
    }
}
