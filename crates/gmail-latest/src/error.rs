//! Error taxonomy for authentication and retrieval.

use std::{string::FromUtf8Error, time::Duration};

use crate::credential::CredentialError;

/// Errors that can occur while fetching and decoding the latest message.
///
/// None of these escape [`crate::fetch_latest_unread_text`]; they are
/// rendered into the result text instead.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FetchError {
    /// The key material could not be used.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// The provider rejected the impersonation or the scope.
    #[error("authorization rejected ({status}): {message}")]
    Authorization {
        status: reqwest::StatusCode,
        message: String,
    },

    /// The configured API endpoint is not a usable base URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Gmail API request failed ({status}): {body}")]
    Service {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Expected fields were absent from the provider's response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Inline body data could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The overall deadline expired before retrieval finished.
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors raised while decoding inline body data.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("invalid base64 body data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("body is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}
