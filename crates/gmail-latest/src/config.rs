//! Settings for endpoints, deadlines and the fixed result strings.
//!
//! # Resolution Algorithm
//!
//! 1. `GMAIL_LATEST_CONFIG` environment variable
//! 2. `gmail-latest.toml` in the current directory
//! 3. XDG config directory (`~/.config/gmail-latest/config.toml`)
//! 4. Built-in defaults
//!
//! Missing files are not errors. A file that exists but cannot be read or
//! parsed is.
//!
//! # Example
//!
//! ```toml
//! labels = ["INBOX", "IMPORTANT"]
//! timeout_secs = 15
//!
//! [sentinels]
//! no_new_messages = "keine neuen Nachrichten"
//! no_text = "Nachricht enthält keinen Text"
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::client::DEFAULT_GMAIL_ENDPOINT;

/// Environment variable naming an explicit settings file.
pub const CONFIG_ENV_VAR: &str = "GMAIL_LATEST_CONFIG";

const LOCAL_FILE_NAME: &str = "gmail-latest.toml";
const XDG_DIR_NAME: &str = "gmail-latest";
const XDG_FILE_NAME: &str = "config.toml";

/// Errors that can occur while loading settings.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// I/O error when reading a settings file.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error when a settings file is malformed.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A setting holds a value retrieval cannot work with.
    #[error("invalid setting in {path}: {message}")]
    Invalid { path: PathBuf, message: String },
}

/// Retrieval settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Gmail API base URL.
    pub endpoint: String,

    /// Token endpoint override. When unset, the key file's `token_uri` is
    /// used.
    pub token_uri: Option<String>,

    /// Labels the unread query is restricted to; a message must carry all
    /// of them.
    pub labels: Vec<String>,

    /// Overall deadline covering the token exchange, list and get calls.
    /// Must be at least one second.
    pub timeout_secs: u64,

    /// Deadline for establishing each TCP connection.
    pub connect_timeout_secs: u64,

    pub sentinels: Sentinels,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_GMAIL_ENDPOINT.to_string(),
            token_uri: None,
            labels: vec!["INBOX".to_string()],
            timeout_secs: 30,
            connect_timeout_secs: 10,
            sentinels: Sentinels::default(),
        }
    }
}

/// Fixed result strings; the localisation point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sentinels {
    /// Result when the unread query is empty.
    pub no_new_messages: String,

    /// Result when the latest message has no inline text.
    pub no_text: String,

    /// Prefix of the result when retrieval fails.
    pub error_prefix: String,
}

impl Default for Sentinels {
    fn default() -> Self {
        Self {
            no_new_messages: "no new messages".to_string(),
            no_text: "message contains no text".to_string(),
            error_prefix: "failed to fetch latest unread message".to_string(),
        }
    }
}

impl Settings {
    /// Loads settings from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if the file cannot be read or parsed, or
    /// if it sets no labels, a blank label or a zero timeout.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate().map_err(|message| ConfigError::Invalid {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), String> {
        if self.labels.is_empty() {
            return Err("labels must not be empty".to_string());
        }
        if self.labels.iter().any(|label| label.trim().is_empty()) {
            return Err("labels must not contain blank entries".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be at least 1".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be at least 1".to_string());
        }
        Ok(())
    }

    /// Loads settings using the resolution algorithm, falling back to
    /// defaults when no file is found.
    ///
    /// # Errors
    ///
    /// Returns `Err(ConfigError)` if a found file cannot be read or parsed.
    pub fn load_resolved() -> Result<Self, ConfigError> {
        let current = std::env::current_dir().ok();
        Self::resolve_from(
            std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from),
            current.as_deref(),
            dirs::config_dir().as_deref(),
        )
    }

    fn resolve_from(
        env_path: Option<PathBuf>,
        current_dir: Option<&Path>,
        config_dir: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        // Step 1: Environment variable override
        if let Some(path) = env_path
            && path.exists()
        {
            return Self::load(path);
        }

        // Step 2: Current directory
        if let Some(path) = current_dir.map(|dir| dir.join(LOCAL_FILE_NAME))
            && path.exists()
        {
            return Self::load(path);
        }

        // Step 3: XDG config directory
        if let Some(path) = config_dir.map(|dir| dir.join(XDG_DIR_NAME).join(XDG_FILE_NAME))
            && path.exists()
        {
            return Self::load(path);
        }

        Ok(Self::default())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
