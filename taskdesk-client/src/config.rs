//! Client configuration
//!
//! Layers, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. Optional TOML/JSON/YAML file passed to [`ClientConfig::load`]
//! 3. Environment variables (a `.env` file is honoured)
//!
//! # Environment Variables
//!
//! - `TASKDESK_API_URL`: API base URL (default: http://localhost:8000)
//! - `TASKDESK_TIMEOUT_SECS`: total request timeout (default: 30)
//! - `TASKDESK_STATUS_VOCABULARY`: `canonical` or `legacy` (default: canonical)
//! - `TASKDESK_SESSION_FILE`: where tokens are persisted (default: memory only)
//!
//! # Example
//!
//! ```no_run
//! use taskdesk_client::config::ClientConfig;
//!
//! # fn example() -> Result<(), taskdesk_client::ClientError> {
//! let config = ClientConfig::from_env()?;
//! println!("Talking to {}", config.api.base_url);
//! # Ok(())
//! # }
//! ```

use ::config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use taskdesk_shared::models::task::StatusVocabulary;

use crate::error::{ClientError, ClientResult};
use crate::transport::http_client::normalize_base_url;

/// Default API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Complete client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://tasks.example.com`
    pub base_url: String,

    /// Total request timeout
    pub timeout_secs: u64,

    /// Status spelling the server expects on writes
    #[serde(default)]
    pub status_vocabulary: StatusVocabulary,
}

/// Session persistence settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Token file; sessions are kept in memory when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: DEFAULT_API_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                status_vocabulary: StatusVocabulary::Canonical,
            },
            session: SessionConfig::default(),
        }
    }
}

fn config_error(e: ::config::ConfigError) -> ClientError {
    ClientError::Config(e.to_string())
}

impl ClientConfig {
    /// Loads configuration from defaults, an optional file and the environment
    pub fn load(file: Option<&Path>) -> ClientResult<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::load_with(file, |key| std::env::var(key).ok())
    }

    /// Loads configuration from defaults and the environment
    pub fn from_env() -> ClientResult<Self> {
        Self::load(None)
    }

    /// Loads configuration with a custom environment lookup
    pub fn load_with<F>(file: Option<&Path>, env: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Config::builder()
            .set_default("api.base_url", DEFAULT_API_URL)
            .and_then(|b| b.set_default("api.timeout_secs", DEFAULT_TIMEOUT_SECS as i64))
            .and_then(|b| b.set_default("api.status_vocabulary", "canonical"))
            .map_err(config_error)?;

        if let Some(path) = file {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        let settings = builder
            .set_override_option("api.base_url", env("TASKDESK_API_URL"))
            .and_then(|b| b.set_override_option("api.timeout_secs", env("TASKDESK_TIMEOUT_SECS")))
            .and_then(|b| {
                b.set_override_option(
                    "api.status_vocabulary",
                    env("TASKDESK_STATUS_VOCABULARY").map(|v| v.trim().to_ascii_lowercase()),
                )
            })
            .and_then(|b| b.set_override_option("session.file", env("TASKDESK_SESSION_FILE")))
            .and_then(|b| b.build())
            .map_err(config_error)?;

        let config: ClientConfig = settings.try_deserialize().map_err(config_error)?;
        config.validate()?;

        tracing::debug!(
            base_url = %config.api.base_url,
            timeout_secs = config.api.timeout_secs,
            vocabulary = ?config.api.status_vocabulary,
            persistent = config.session.file.is_some(),
            "Loaded client configuration"
        );

        Ok(config)
    }

    /// Checks values the type system cannot
    pub fn validate(&self) -> ClientResult<()> {
        normalize_base_url(&self.api.base_url)?;

        if self.api.timeout_secs == 0 {
            return Err(ClientError::Config(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::load_with(None, env_of(&[])).unwrap();

        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_environment_overrides() {
        let config = ClientConfig::load_with(
            None,
            env_of(&[
                ("TASKDESK_API_URL", "https://tasks.example.com"),
                ("TASKDESK_TIMEOUT_SECS", "5"),
                ("TASKDESK_STATUS_VOCABULARY", "Legacy"),
                ("TASKDESK_SESSION_FILE", "/tmp/taskdesk/session.json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://tasks.example.com");
        assert_eq!(config.api.timeout_secs, 5);
        assert_eq!(config.api.status_vocabulary, StatusVocabulary::Legacy);
        assert_eq!(
            config.session.file.as_deref(),
            Some(Path::new("/tmp/taskdesk/session.json"))
        );
    }

    #[test]
    fn test_file_then_environment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("taskdesk.toml");
        std::fs::write(
            &path,
            "[api]\nbase_url = \"http://file.example.com\"\ntimeout_secs = 10\n",
        )
        .unwrap();

        let config = ClientConfig::load_with(Some(&path), env_of(&[])).unwrap();
        assert_eq!(config.api.base_url, "http://file.example.com");
        assert_eq!(config.api.timeout_secs, 10);

        let config = ClientConfig::load_with(
            Some(&path),
            env_of(&[("TASKDESK_API_URL", "http://env.example.com")]),
        )
        .unwrap();
        assert_eq!(config.api.base_url, "http://env.example.com");
        assert_eq!(config.api.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_values() {
        let err = ClientConfig::load_with(None, env_of(&[("TASKDESK_API_URL", "ftp://x")]))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err = ClientConfig::load_with(None, env_of(&[("TASKDESK_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));

        let err =
            ClientConfig::load_with(None, env_of(&[("TASKDESK_STATUS_VOCABULARY", "klingon")]))
                .unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::load_with(Some(&dir.path().join("absent.toml")), env_of(&[]));
        assert!(result.is_err());
    }
}
