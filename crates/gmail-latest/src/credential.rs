//! Service-account key material.

use std::{fmt, path::Path};

use jsonwebtoken::EncodingKey;
use serde::Deserialize;

pub(crate) const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const SERVICE_ACCOUNT_TYPE: &str = "service_account";

/// Errors that can occur when loading credential material.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CredentialError {
    /// The key file could not be read.
    #[error("failed to read credential file: {0}")]
    Read(#[from] std::io::Error),

    /// The key data is not well-formed JSON of the expected shape.
    #[error("failed to parse credential: {0}")]
    Parse(#[from] serde_json::Error),

    /// A required field is missing or empty.
    #[error("credential field '{0}' is missing or empty")]
    MissingField(&'static str),

    /// The key is not a service-account key.
    #[error("unsupported credential type '{0}', expected 'service_account'")]
    UnsupportedType(String),

    /// The private key could not be loaded as an RSA signing key.
    #[error("invalid private key: {0}")]
    InvalidKey(#[from] jsonwebtoken::errors::Error),

    /// The delegated identity is empty.
    #[error("delegated identity must not be empty")]
    EmptyIdentity,
}

#[derive(Deserialize)]
struct RawServiceAccountKey {
    #[serde(rename = "type", default)]
    key_type: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    private_key: Option<String>,
    #[serde(default)]
    client_email: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// A parsed service-account key, ready for signing token assertions.
#[derive(Clone)]
pub struct ServiceAccountKey {
    client_email: String,
    private_key_id: String,
    project_id: Option<String>,
    token_uri: String,
    signing_key: EncodingKey,
}

impl ServiceAccountKey {
    /// Parses the provider's service-account key JSON from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The bytes are not valid JSON of the key shape
    /// - `type` is present and not `service_account`
    /// - `client_email`, `private_key_id` or `private_key` is missing or empty
    /// - The private key is not a PEM-encoded RSA key
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CredentialError> {
        let raw: RawServiceAccountKey = serde_json::from_slice(bytes)?;

        if let Some(key_type) = raw.key_type
            && key_type != SERVICE_ACCOUNT_TYPE
        {
            return Err(CredentialError::UnsupportedType(key_type));
        }

        let client_email = required(raw.client_email, "client_email")?;
        let private_key_id = required(raw.private_key_id, "private_key_id")?;
        let private_key = required(raw.private_key, "private_key")?;
        let signing_key = EncodingKey::from_rsa_pem(private_key.as_bytes())?;

        let token_uri = raw
            .token_uri
            .filter(|uri| !uri.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        Ok(Self {
            client_email,
            private_key_id,
            project_id: raw.project_id,
            token_uri,
            signing_key,
        })
    }

    /// Reads and parses a key file.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Read`] if the file cannot be read, otherwise
    /// the same errors as [`ServiceAccountKey::from_slice`].
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let bytes = std::fs::read(path)?;
        Self::from_slice(&bytes)
    }

    /// The service identity that signs assertions.
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    pub fn private_key_id(&self) -> &str {
        &self.private_key_id
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    /// Token endpoint declared by the key file.
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub(crate) fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("project_id", &self.project_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String, CredentialError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(CredentialError::MissingField(field))
}
