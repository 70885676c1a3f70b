//! Configuration loading for the tap
//!
//! Supports loading configuration from (in order of priority):
//! 1. An explicit JSON file
//! 2. `tap-slack.json` in the tap-slack config directory
//! 3. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::api::SlackClient;
use crate::models::{BookmarkStore, State, parse_timestamp};

/// Config filename in the tap-slack config directory
const CONFIG_FILE: &str = "tap-slack.json";

/// Run configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TapConfig {
    /// Slack access token
    pub token: String,
    /// Default watermark for streams with no bookmark, ISO-8601
    pub start_date: String,
    /// Alternate API root (defaults to the public Slack API)
    #[serde(default)]
    pub api_url: Option<String>,
}

impl TapConfig {
    /// Load configuration using the following priority:
    /// 1. `path`, when given
    /// 2. JSON file (~/.config/tap-slack/tap-slack.json)
    /// 3. Runtime environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = if let Some(path) = path {
            config::load_json_file(path)?
        } else if config::config_exists(CONFIG_FILE) {
            config::load_json(CONFIG_FILE)?
        } else {
            Self::from_env()?
        };
        config.validate()
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse config JSON")?;
        config.validate()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let token =
            std::env::var("SLACK_TOKEN").context("SLACK_TOKEN environment variable not set")?;
        let start_date = std::env::var("SLACK_START_DATE")
            .context("SLACK_START_DATE environment variable not set")?;

        Ok(Self {
            token,
            start_date,
            api_url: std::env::var("SLACK_API_URL").ok(),
        })
    }

    /// Get the default config file path (~/.config/tap-slack/tap-slack.json)
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }

    fn validate(self) -> Result<Self> {
        if self.token.trim().is_empty() {
            anyhow::bail!("Config \"token\" is empty");
        }
        self.start_timestamp()?;
        Ok(self)
    }

    /// `start_date` as epoch seconds
    pub fn start_timestamp(&self) -> Result<f64> {
        parse_timestamp(&self.start_date).context("Invalid \"start_date\" in config")
    }

    /// Build the API client this config describes
    pub fn client(&self) -> SlackClient {
        match &self.api_url {
            Some(url) => SlackClient::with_base_url(self.token.clone(), url.clone()),
            None => SlackClient::new(self.token.clone()),
        }
    }

    /// Bookmarks to resume from: the state file when given, else empty
    pub fn bookmarks(&self, state_path: Option<&Path>) -> Result<BookmarkStore> {
        let start = self.start_timestamp()?;
        match state_path {
            Some(path) => {
                let state: State = config::load_json_file(path)?;
                BookmarkStore::from_state(start, &state)
                    .with_context(|| format!("Invalid state file: {}", path.display()))
            }
            None => Ok(BookmarkStore::new(start)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "token": "xoxp-1234",
            "start_date": "2020-01-01T00:00:00Z"
        }"#;

        let config = TapConfig::from_json(json).unwrap();
        assert_eq!(config.token, "xoxp-1234");
        assert_eq!(config.start_timestamp().unwrap(), 1577836800.0);
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_missing_token() {
        let json = r#"{ "start_date": "2020-01-01T00:00:00Z" }"#;
        assert!(TapConfig::from_json(json).is_err());
    }

    #[test]
    fn test_empty_token() {
        let json = r#"{ "token": " ", "start_date": "2020-01-01" }"#;
        assert!(TapConfig::from_json(json).is_err());
    }

    #[test]
    fn test_invalid_start_date() {
        let json = r#"{ "token": "xoxp-1234", "start_date": "the beginning" }"#;
        let err = TapConfig::from_json(json).unwrap_err();
        assert!(format!("{:#}", err).contains("start_date"));
    }

    #[test]
    fn test_load_from_file_and_state() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"token": "xoxb-1", "start_date": "2020-01-01", "api_url": "http://127.0.0.1:1/api"}"#,
        )
        .unwrap();
        let state_path = dir.path().join("state.json");
        std::fs::write(
            &state_path,
            r#"{"files": "2020-01-08T00:00:00.000000Z"}"#,
        )
        .unwrap();

        let config = TapConfig::load(Some(config_path.as_path())).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("http://127.0.0.1:1/api"));

        let bookmarks = config.bookmarks(Some(state_path.as_path())).unwrap();
        assert_eq!(bookmarks.get("files"), 1577836800.0 + 7.0 * 86400.0);
        assert_eq!(bookmarks.get("conversation_history:C1"), 1577836800.0);

        let fresh = config.bookmarks(None).unwrap();
        assert!(fresh.is_empty());
    }
}
