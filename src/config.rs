//! Configuration management for Tripplanner
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, TripPlannerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for Tripplanner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Planning backend connection settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Maps provider settings
    #[serde(default)]
    pub maps: MapsConfig,
    /// Chat behaviour, including itinerary retries
    #[serde(default)]
    pub chat: ChatConfig,
    /// Local persistence of the conversation id
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Planning backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `http://localhost:8000`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout (seconds) for JSON endpoints. The chat stream
    /// has no total timeout and is read until the backend closes it.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Connection timeout (seconds), applied to the chat stream as well
    #[serde(default = "default_connect_timeout_seconds")]
    pub connect_timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_connect_timeout_seconds() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("tripplanner/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            connect_timeout_seconds: default_connect_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Connection timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Maps provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsConfig {
    /// Static maps API key. Map output degrades to an inline error without it.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Center used when there are no markers, as `[lat, lon]`
    #[serde(default = "default_center")]
    pub default_center: [f64; 2],

    /// Zoom used when there are no markers
    #[serde(default = "default_zoom")]
    pub default_zoom: u8,

    /// Zoom used when centering on a marker
    #[serde(default = "default_focused_zoom")]
    pub focused_zoom: u8,
}

fn default_center() -> [f64; 2] {
    [20.5937, 78.9629]
}

fn default_zoom() -> u8 {
    4
}

fn default_focused_zoom() -> u8 {
    10
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_center: default_center(),
            default_zoom: default_zoom(),
            focused_zoom: default_focused_zoom(),
        }
    }
}

/// Chat behaviour configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Assistant greeting seeded into an empty conversation
    #[serde(default = "default_greeting")]
    pub greeting: Option<String>,

    /// Assistant text shown when a send or stream fails
    #[serde(default = "default_fallback_message")]
    pub fallback_message: String,

    /// Empty-itinerary retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_greeting() -> Option<String> {
    Some(
        "Hi! Tell me about your trip. Where are you headed and when? \
         I can plan your days and suggest stays."
            .to_string(),
    )
}

fn default_fallback_message() -> String {
    "Sorry, something went wrong.".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
            fallback_message: default_fallback_message(),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry policy for itineraries reported done without any days
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Automatic reformulated retries per user query
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; later retries scale linearly
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound for any single retry delay
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1500
}

fn default_max_backoff_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

/// Conversation id persistence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the embedded store. Defaults to the platform data dir.
    #[serde(default)]
    pub path: Option<String>,
}

impl StorageConfig {
    /// Resolve the store directory
    ///
    /// # Errors
    ///
    /// Returns error if no path is configured and the platform data
    /// directory cannot be determined
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(PathBuf::from(path));
        }
        let dirs = directories::ProjectDirs::from("com", "tripplanner", "tripplanner")
            .ok_or_else(|| {
                TripPlannerError::Persistence("Could not determine data directory".to_string())
            })?;
        Ok(dirs.data_dir().join("session"))
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error: defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TripPlannerError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| TripPlannerError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(base_url) = std::env::var("TRIPPLANNER_API_BASE") {
            self.api.base_url = base_url;
        }

        if let Ok(key) = std::env::var("TRIPPLANNER_MAPS_API_KEY") {
            if !key.trim().is_empty() {
                self.maps.api_key = Some(key);
            }
        }

        if let Ok(max_retries) = std::env::var("TRIPPLANNER_MAX_RETRIES") {
            if let Ok(value) = max_retries.parse() {
                self.chat.retry.max_attempts = value;
            } else {
                tracing::warn!("Invalid TRIPPLANNER_MAX_RETRIES: {}", max_retries);
            }
        }

        if let Ok(backoff) = std::env::var("TRIPPLANNER_RETRY_BACKOFF_MS") {
            if let Ok(value) = backoff.parse::<u64>() {
                self.chat.retry.initial_backoff_ms = value;
                self.chat.retry.max_backoff_ms = self.chat.retry.max_backoff_ms.max(value);
            } else {
                tracing::warn!("Invalid TRIPPLANNER_RETRY_BACKOFF_MS: {}", backoff);
            }
        }

        if let Ok(path) = std::env::var("TRIPPLANNER_STORAGE_PATH") {
            self.storage.path = Some(path);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(base) = &cli.api_base {
            self.api.base_url = base.clone();
        }
        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(TripPlannerError::Config("api.base_url cannot be empty".to_string()).into());
        }

        if let Err(e) = url::Url::parse(&self.api.base_url) {
            return Err(TripPlannerError::Config(format!(
                "api.base_url is not a valid URL ({}): {}",
                self.api.base_url, e
            ))
            .into());
        }

        if self.api.timeout_seconds == 0 {
            return Err(TripPlannerError::Config(
                "api.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.api.connect_timeout_seconds == 0 {
            return Err(TripPlannerError::Config(
                "api.connect_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.retry.max_attempts == 0 {
            return Err(TripPlannerError::Config(
                "chat.retry.max_attempts must be greater than 0".to_string(),
            )
            .into());
        }

        if self.chat.retry.max_attempts > 10 {
            return Err(TripPlannerError::Config(
                "chat.retry.max_attempts must be less than or equal to 10".to_string(),
            )
            .into());
        }

        if self.chat.retry.max_backoff_ms < self.chat.retry.initial_backoff_ms {
            return Err(TripPlannerError::Config(
                "chat.retry.max_backoff_ms must be at least chat.retry.initial_backoff_ms"
                    .to_string(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn cli_with(args: &[&str]) -> crate::cli::Cli {
        use clap::Parser;
        let mut full = vec!["tripplanner"];
        full.extend_from_slice(args);
        full.push("state");
        crate::cli::Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.api.timeout_seconds, 120);
        assert_eq!(config.chat.retry.max_attempts, 3);
        assert!(config.maps.api_key.is_none());
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_base_url() {
        let mut config = Config::default();
        config.api.base_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_base_url() {
        let mut config = Config::default();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.api.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_connect_timeout() {
        let mut config = Config::default();
        config.api.connect_timeout_seconds = 0;
        assert!(config.validate().is_err());
        assert_eq!(Config::default().api.connect_timeout_seconds, 10);
    }

    #[test]
    fn test_config_validation_retry_bounds() {
        let mut config = Config::default();
        config.chat.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        config.chat.retry.max_attempts = 11;
        assert!(config.validate().is_err());

        config.chat.retry.max_attempts = 3;
        config.chat.retry.initial_backoff_ms = 5000;
        config.chat.retry.max_backoff_ms = 1000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
api:
  base_url: "https://planner.example.com"
  timeout_seconds: 30
maps:
  api_key: "abc123"
chat:
  greeting: "Where to next?"
  retry:
    max_attempts: 2
    initial_backoff_ms: 100
    max_backoff_ms: 400
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api.base_url, "https://planner.example.com");
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(config.maps.api_key.as_deref(), Some("abc123"));
        assert_eq!(config.maps.default_zoom, 4);
        assert_eq!(config.chat.greeting.as_deref(), Some("Where to next?"));
        assert_eq!(config.chat.fallback_message, "Sorry, something went wrong.");
        assert_eq!(config.chat.retry.max_attempts, 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert_eq!(config.chat.retry.initial_backoff_ms, 1500);
    }

    #[test]
    #[serial]
    fn test_load_nonexistent_file_uses_defaults() {
        std::env::remove_var("TRIPPLANNER_API_BASE");
        let cli = cli_with(&[]);
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides() {
        std::env::set_var("TRIPPLANNER_API_BASE", "http://env.example:9000");
        std::env::set_var("TRIPPLANNER_MAPS_API_KEY", "env-key");
        std::env::set_var("TRIPPLANNER_MAX_RETRIES", "5");
        std::env::set_var("TRIPPLANNER_RETRY_BACKOFF_MS", "20000");

        let mut config = Config::default();
        config.apply_env_vars();

        std::env::remove_var("TRIPPLANNER_API_BASE");
        std::env::remove_var("TRIPPLANNER_MAPS_API_KEY");
        std::env::remove_var("TRIPPLANNER_MAX_RETRIES");
        std::env::remove_var("TRIPPLANNER_RETRY_BACKOFF_MS");

        assert_eq!(config.api.base_url, "http://env.example:9000");
        assert_eq!(config.maps.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.chat.retry.max_attempts, 5);
        assert_eq!(config.chat.retry.initial_backoff_ms, 20000);
        assert_eq!(config.chat.retry.max_backoff_ms, 20000);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_invalid_env_retry_is_ignored() {
        std::env::set_var("TRIPPLANNER_MAX_RETRIES", "many");
        let mut config = Config::default();
        config.apply_env_vars();
        std::env::remove_var("TRIPPLANNER_MAX_RETRIES");
        assert_eq!(config.chat.retry.max_attempts, 3);
    }

    #[test]
    #[serial]
    fn test_cli_overrides_win() {
        std::env::remove_var("TRIPPLANNER_API_BASE");
        let cli = cli_with(&["--api-base", "http://cli.example", "--storage-path", "/tmp/x"]);
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.api.base_url, "http://cli.example");
        assert_eq!(config.storage.path.as_deref(), Some("/tmp/x"));
    }

    #[test]
    fn test_storage_resolve_explicit_path() {
        let storage = StorageConfig {
            path: Some("/tmp/tripplanner-test".to_string()),
        };
        assert_eq!(
            storage.resolve_path().unwrap(),
            PathBuf::from("/tmp/tripplanner-test")
        );
    }
}
