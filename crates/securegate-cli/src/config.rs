//! Configuration loading for the command line.
//!
//! A JSON file supplies the base [`ScannerConfig`]; flags and
//! `SECUREGATE_*` environment variables override individual fields.

use anyhow::{Context, Result};
use clap::Args;
use securegate_rfid::ScannerConfig;
use std::path::Path;

/// Per-field overrides on top of the configuration file.
#[derive(Debug, Default, Clone, Args)]
pub struct Overrides {
    /// Substring identifying contactless reader descriptors
    #[arg(long, env = "SECUREGATE_READER_MARKER", global = true)]
    pub reader_marker: Option<String>,

    /// Poll interval while no card is present (ms)
    #[arg(long, env = "SECUREGATE_ABSENT_INTERVAL_MS", global = true)]
    pub absent_interval_ms: Option<u64>,

    /// Poll interval while a card is present (ms)
    #[arg(long, env = "SECUREGATE_PRESENT_INTERVAL_MS", global = true)]
    pub present_interval_ms: Option<u64>,

    /// Timeout for a single reader call (ms)
    #[arg(long, env = "SECUREGATE_COMMAND_TIMEOUT_MS", global = true)]
    pub command_timeout_ms: Option<u64>,

    /// Authenticate-and-read attempts per card
    #[arg(long, env = "SECUREGATE_READ_ATTEMPTS", global = true)]
    pub read_attempts: Option<u32>,

    /// Report UIDs only, skip the data block
    #[arg(long, global = true)]
    pub uid_only: bool,

    /// Silence the reader buzzer
    #[arg(long, global = true)]
    pub mute_buzzer: bool,

    /// Log reader firmware versions at startup
    #[arg(long, global = true)]
    pub query_firmware: bool,
}

impl Overrides {
    pub fn apply(&self, config: &mut ScannerConfig) {
        if let Some(marker) = &self.reader_marker {
            config.reader_marker = marker.clone();
        }
        if let Some(ms) = self.absent_interval_ms {
            config.absent_interval_ms = ms;
        }
        if let Some(ms) = self.present_interval_ms {
            config.present_interval_ms = ms;
        }
        if let Some(ms) = self.command_timeout_ms {
            config.command_timeout_ms = ms;
        }
        if let Some(attempts) = self.read_attempts {
            config.read_attempts = attempts;
        }
        if self.uid_only {
            config.read_data = false;
        }
        if self.mute_buzzer {
            config.mute_buzzer = true;
        }
        if self.query_firmware {
            config.query_firmware = true;
        }
    }
}

/// Build the effective configuration.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed, or the merged result is
/// invalid.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> Result<ScannerConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => ScannerConfig::default(),
    };

    overrides.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}
