//! Configuration management for lobbyward
//!
//! Environment-independent configuration with defaults matching the observed
//! deployment values, TOML file loading, and validation.

use crate::event::{AfterActivationPolicy, EmptyLobbyPolicy};
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rent slot pool configuration
    pub rent: RentConfig,

    /// Lobby event configuration
    pub events: EventConfig,

    /// Identity verification configuration
    pub verification: VerificationConfig,

    /// Reservation-request fan-out configuration
    pub booking: BookingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Rent slot pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RentConfig {
    /// How long an approved slot stays occupied
    #[serde(with = "humantime_serde")]
    pub rent_duration: Duration,

    /// Cadence of the per-pool display refresh task
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for RentConfig {
    fn default() -> Self {
        Self {
            rent_duration: Duration::from_secs(4 * 3600 + 10 * 60),
            refresh_interval: Duration::from_secs(1),
        }
    }
}

/// Lobby event configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    /// Minimum distance between creation and start
    #[serde(with = "humantime_serde")]
    pub min_lead_time: Duration,

    /// What to do when an event reaches its start with nobody enrolled
    pub empty_lobby: EmptyLobbyPolicy,

    /// Whether an activated event is deleted or stays open to late joins
    pub after_activation: AfterActivationPolicy,

    /// Clock hour assumed when a schedule says "tomorrow" with no time
    pub default_start_hour: u32,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            min_lead_time: Duration::from_secs(60),
            empty_lobby: EmptyLobbyPolicy::CancelAndAnnounce,
            after_activation: AfterActivationPolicy::Delete,
            default_start_hour: 21,
        }
    }
}

/// Identity verification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// Window a newly joined member has to submit a profile link
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(300),
        }
    }
}

/// Reservation-request fan-out configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingConfig {
    /// Members notified of every reservation request
    pub reviewers: Vec<UserId>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rent.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "rent.refresh_interval must be greater than zero".to_string(),
            ));
        }
        if self.rent.rent_duration.is_zero() {
            return Err(ConfigError::Invalid(
                "rent.rent_duration must be greater than zero".to_string(),
            ));
        }
        if self.verification.window.is_zero() {
            return Err(ConfigError::Invalid(
                "verification.window must be greater than zero".to_string(),
            ));
        }
        if self.events.default_start_hour > 23 {
            return Err(ConfigError::Invalid(format!(
                "events.default_start_hour must be 0-23, got {}",
                self.events.default_start_hour
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.rent.rent_duration, Duration::from_secs(15_000));
        assert_eq!(config.rent.refresh_interval, Duration::from_secs(1));
        assert_eq!(config.events.min_lead_time, Duration::from_secs(60));
        assert_eq!(config.events.default_start_hour, 21);
        assert_eq!(config.verification.window, Duration::from_secs(300));
        assert_eq!(config.events.empty_lobby, EmptyLobbyPolicy::CancelAndAnnounce);
        assert_eq!(config.events.after_activation, AfterActivationPolicy::Delete);
        assert!(config.booking.reviewers.is_empty());
    }

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = Config::from_toml(
            r#"
            [rent]
            rent_duration = "2h"

            [events]
            empty_lobby = "activate_empty"
            "#,
        )
        .unwrap();

        assert_eq!(config.rent.rent_duration, Duration::from_secs(7_200));
        assert_eq!(config.rent.refresh_interval, Duration::from_secs(1));
        assert_eq!(config.events.empty_lobby, EmptyLobbyPolicy::ActivateEmpty);
        assert_eq!(config.events.after_activation, AfterActivationPolicy::Delete);
    }

    #[test]
    fn test_reviewers_from_toml() {
        let config = Config::from_toml(
            r#"
            [booking]
            reviewers = ["290021992881586176", "338337150573477905"]
            "#,
        )
        .unwrap();
        assert_eq!(config.booking.reviewers.len(), 2);
        assert_eq!(config.booking.reviewers[0], UserId::new("290021992881586176"));
    }

    #[test]
    fn test_zero_refresh_interval_rejected() {
        let result = Config::from_toml(
            r#"
            [rent]
            refresh_interval = "0s"
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_out_of_range_start_hour_rejected() {
        let result = Config::from_toml(
            r#"
            [events]
            default_start_hour = 24
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let restored = Config::from_toml(&serialized).unwrap();
        assert_eq!(restored.rent.rent_duration, config.rent.rent_duration);
        assert_eq!(restored.verification.window, config.verification.window);
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[verification]\nwindow = \"2m\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.verification.window, Duration::from_secs(120));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Config::from_file("/nonexistent/lobbyward.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
