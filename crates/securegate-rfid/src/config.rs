//! Scanner configuration.

use crate::error::{Result, ScanError};
use securegate_core::constants::{
    CONTACTLESS_MARKER, DEFAULT_ABSENT_POLL_MS, DEFAULT_COMMAND_TIMEOUT_MS,
    DEFAULT_PRESENT_POLL_MS, DEFAULT_READ_ATTEMPTS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the card scanner.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use securegate_rfid::ScannerConfig;
///
/// let config: ScannerConfig = serde_json::from_str(r#"{ "read_data": false }"#).unwrap();
/// assert!(!config.read_data);
/// assert_eq!(config.reader_marker, "PICC");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Substring a reader descriptor must contain to be scanned.
    pub reader_marker: String,

    /// Poll interval while no card is present, in milliseconds.
    pub absent_interval_ms: u64,

    /// Poll interval while a processed card is present, in milliseconds.
    pub present_interval_ms: u64,

    /// Upper bound for one reader call, in milliseconds.
    pub command_timeout_ms: u64,

    /// Authenticate and read the data block after extracting the UID.
    pub read_data: bool,

    /// Authenticate-and-read attempts per card.
    pub read_attempts: u32,

    /// Silence the reader buzzer at startup instead of enabling it.
    pub mute_buzzer: bool,

    /// Log each reader's firmware version at startup.
    pub query_firmware: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            reader_marker: CONTACTLESS_MARKER.to_string(),
            absent_interval_ms: DEFAULT_ABSENT_POLL_MS,
            present_interval_ms: DEFAULT_PRESENT_POLL_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            read_data: true,
            read_attempts: DEFAULT_READ_ATTEMPTS,
            mute_buzzer: false,
            query_firmware: false,
        }
    }
}

impl ScannerConfig {
    pub fn absent_interval(&self) -> Duration {
        Duration::from_millis(self.absent_interval_ms)
    }

    pub fn present_interval(&self) -> Duration {
        Duration::from_millis(self.present_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    /// Check the configuration for values the scanner cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Config`] for zero intervals, a zero timeout,
    /// zero read attempts or an empty reader marker.
    pub fn validate(&self) -> Result<()> {
        if self.absent_interval_ms == 0 || self.present_interval_ms == 0 {
            return Err(ScanError::config("poll intervals must be non-zero"));
        }
        if self.command_timeout_ms == 0 {
            return Err(ScanError::config("command timeout must be non-zero"));
        }
        if self.read_attempts == 0 {
            return Err(ScanError::config("read attempts must be at least 1"));
        }
        if self.reader_marker.is_empty() {
            return Err(ScanError::config("reader marker must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ScannerConfig::default();
        assert_eq!(config.reader_marker, "PICC");
        assert_eq!(config.absent_interval(), Duration::from_millis(250));
        assert_eq!(config.present_interval(), Duration::from_millis(100));
        assert_eq!(config.command_timeout(), Duration::from_secs(2));
        assert!(config.read_data);
        assert_eq!(config.read_attempts, 3);
        assert!(!config.mute_buzzer);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validate_rejects_zero() {
        let config = ScannerConfig {
            absent_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ScannerConfig {
            read_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ScannerConfig {
            reader_marker: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_partial_json() {
        let config: ScannerConfig =
            serde_json::from_str(r#"{ "mute_buzzer": true, "read_attempts": 5 }"#).unwrap();
        assert!(config.mute_buzzer);
        assert_eq!(config.read_attempts, 5);
        assert_eq!(config.absent_interval_ms, 250);
    }
}
