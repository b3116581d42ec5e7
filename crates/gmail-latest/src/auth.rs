//! Authenticator: turns a service-account key and a delegated identity into an
//! authorized, read-only client handle.
//!
//! Building the handle is purely local. The OAuth 2.0 JWT-bearer grant
//! (RFC 7523) runs on first use and its access token lives only as long as the
//! handle.

use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

use jsonwebtoken::{Algorithm, Header};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::{
    credential::{CredentialError, ServiceAccountKey},
    error::FetchError,
    types::{TokenErrorResponse, TokenRequest, TokenResponse},
};

/// The only scope ever requested.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Mailbox address to impersonate.
///
/// Only emptiness is checked locally; whether the service account may act for
/// this address is decided by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatedIdentity(String);

impl DelegatedIdentity {
    /// # Errors
    ///
    /// Returns [`CredentialError::EmptyIdentity`] if the trimmed value is
    /// empty.
    pub fn new(value: impl Into<String>) -> Result<Self, CredentialError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(CredentialError::EmptyIdentity);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DelegatedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    sub: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

/// Produces [`AuthorizedClient`] handles for one service-account key.
#[derive(Debug, Clone)]
pub struct Authenticator {
    key: ServiceAccountKey,
    token_uri: Option<String>,
    http: Option<reqwest::Client>,
}

impl Authenticator {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            token_uri: None,
            http: None,
        }
    }

    /// Overrides the token endpoint declared in the key file.
    #[must_use]
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = Some(token_uri.into());
        self
    }

    /// Uses a preconfigured HTTP client for the token exchange and API calls.
    #[must_use]
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Binds the key to `identity` and the read-only scope.
    ///
    /// No network call is made here.
    pub fn authorize(&self, identity: DelegatedIdentity) -> AuthorizedClient {
        let token_uri = self
            .token_uri
            .clone()
            .unwrap_or_else(|| self.key.token_uri().to_string());

        debug!(
            service_account = self.key.client_email(),
            subject = %identity,
            token_uri = %token_uri,
            "authorized client created"
        );

        AuthorizedClient {
            key: self.key.clone(),
            identity,
            token_uri,
            http: self.http.clone().unwrap_or_default(),
            access_token: OnceCell::new(),
        }
    }
}

/// Handle that authorizes calls as the delegated identity.
///
/// Created fresh per retrieval and discarded afterwards.
pub struct AuthorizedClient {
    key: ServiceAccountKey,
    identity: DelegatedIdentity,
    token_uri: String,
    http: reqwest::Client,
    access_token: OnceCell<String>,
}

impl AuthorizedClient {
    pub fn scope(&self) -> &'static str {
        GMAIL_READONLY_SCOPE
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Returns the access token, running the token exchange on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The assertion cannot be signed
    /// - The token endpoint cannot be reached
    /// - The token endpoint rejects the assertion
    /// - The token endpoint reply lacks an access token
    pub async fn access_token(&self) -> Result<&str, FetchError> {
        self.access_token
            .get_or_try_init(|| self.exchange_assertion())
            .await
            .map(String::as_str)
    }

    fn sign_assertion(&self) -> Result<String, FetchError> {
        let iat = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let claims = AssertionClaims {
            iss: self.key.client_email(),
            sub: self.identity.as_str(),
            scope: GMAIL_READONLY_SCOPE,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key.private_key_id().to_string());

        jsonwebtoken::encode(&header, &claims, self.key.signing_key())
            .map_err(|e| FetchError::Credential(CredentialError::InvalidKey(e)))
    }

    async fn exchange_assertion(&self) -> Result<String, FetchError> {
        let assertion = self.sign_assertion()?;

        debug!(token_uri = %self.token_uri, "exchanging assertion for access token");
        let response = self
            .http
            .post(&self.token_uri)
            .form(&TokenRequest {
                grant_type: JWT_BEARER_GRANT,
                assertion: &assertion,
            })
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let reply: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            let message = match (reply.error, reply.error_description) {
                (Some(error), Some(description)) => format!("{error}: {description}"),
                (Some(error), None) => error,
                (None, Some(description)) => description,
                (None, None) => body,
            };
            return Err(FetchError::Authorization { status, message });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| FetchError::MalformedResponse(format!("token response: {e}")))?;
        debug!(expires_in = ?token.expires_in, "access token obtained");
        Ok(token.access_token)
    }
}

impl fmt::Debug for AuthorizedClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedClient")
            .field("service_account", &self.key.client_email())
            .field("identity", &self.identity)
            .field("token_uri", &self.token_uri)
            .field("scope", &GMAIL_READONLY_SCOPE)
            .field("has_token", &self.access_token.initialized())
            .finish()
    }
}
