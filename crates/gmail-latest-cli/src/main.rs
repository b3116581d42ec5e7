//! Command-line front end for `gmail-latest`.
//!
//! Usage:
//! ```bash
//! gmail-latest --credentials key.json --user alice@example.com
//! gmail-latest -c key.json -u alice@example.com --json
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gmail_latest::Settings;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "gmail-latest", author, version, about)]
struct Cli {
    /// Service-account key file (JSON) with domain-wide delegation.
    #[arg(short, long)]
    credentials: PathBuf,

    /// Mailbox address to impersonate.
    #[arg(short, long)]
    user: String,

    /// Settings file. Defaults to the resolved `gmail-latest.toml`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overall deadline in seconds (at least 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print a JSON object `{"text": ...}` instead of bare text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("warn"))
                .context("failed to parse log directive")?,
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let credential = std::fs::read(&cli.credentials).with_context(|| {
        format!(
            "failed to read credential file: {}",
            cli.credentials.display()
        )
    })?;

    debug!(user = %cli.user, endpoint = %settings.endpoint, "fetching latest unread message");
    let text = gmail_latest::fetch_latest_unread_text(&credential, &cli.user, &settings).await;
    println!("{}", format_output(text, cli.json)?);

    Ok(())
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::load_resolved()?,
    };
    if let Some(secs) = cli.timeout {
        settings.timeout_secs = secs;
    }
    Ok(settings)
}

fn format_output(text: String, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string(&serde_json::json!({ "text": text }))?)
    } else {
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_cli_requires_credentials() {
        let err = Cli::try_parse_from(["gmail-latest", "--user", "alice@example.com"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_requires_user() {
        let err = Cli::try_parse_from(["gmail-latest", "--credentials", "key.json"])
            .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_parses_short_flags() -> Result<(), clap::Error> {
        let cli = Cli::try_parse_from(["gmail-latest", "-c", "key.json", "-u", "alice@example.com"])?;
        assert_eq!(cli.credentials, PathBuf::from("key.json"));
        assert_eq!(cli.user, "alice@example.com");
        assert!(cli.config.is_none());
        assert!(cli.timeout.is_none());
        assert!(!cli.json);
        Ok(())
    }

    #[test]
    fn test_cli_rejects_non_numeric_timeout() {
        let err = Cli::try_parse_from([
            "gmail-latest",
            "-c",
            "key.json",
            "-u",
            "alice@example.com",
            "--timeout",
            "soon",
        ])
        .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_rejects_zero_timeout() {
        let err = Cli::try_parse_from([
            "gmail-latest",
            "-c",
            "key.json",
            "-u",
            "alice@example.com",
            "--timeout",
            "0",
        ])
        .expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_load_settings_applies_timeout_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "timeout_secs = 10\nlabels = [\"IMPORTANT\"]\n").unwrap();

        let cli = Cli::try_parse_from([
            "gmail-latest",
            "-c",
            "key.json",
            "-u",
            "alice@example.com",
            "--config",
            path.to_str().unwrap(),
            "--timeout",
            "3",
        ])
        .unwrap();

        let settings = load_settings(&cli).unwrap();
        assert_eq!(settings.timeout_secs, 3);
        assert_eq!(settings.labels, ["IMPORTANT"]);
    }

    #[test]
    fn test_load_settings_missing_explicit_file_fails() {
        let cli = Cli::try_parse_from([
            "gmail-latest",
            "-c",
            "key.json",
            "-u",
            "alice@example.com",
            "--config",
            "/nonexistent/settings.toml",
        ])
        .unwrap();

        assert!(load_settings(&cli).is_err());
    }

    #[test]
    fn test_format_output_json_escapes_text() {
        let out = format_output("line one\n\"quoted\"".to_string(), true).unwrap();
        assert_eq!(out, r#"{"text":"line one\n\"quoted\""}"#);
    }

    #[test]
    fn test_format_output_plain_is_verbatim() {
        assert_eq!(
            format_output("no new messages".to_string(), false).unwrap(),
            "no new messages"
        );
    }
}
