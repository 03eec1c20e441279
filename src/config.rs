//! Session configuration
//!
//! Loaded from a TOML file where every field is optional:
//!
//! ```toml
//! language = "hi-IN"
//! restart_delay_ms = 300
//! max_restart_attempts = 20
//! ```

use crate::command::Language;
use crate::error::{Result, VoiceError};
use crate::session::RestartPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default recognition language
pub const DEFAULT_LANGUAGE: &str = "en-IN";

/// Configuration for a voice session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Recognition language tag
    pub language: String,
    /// Delay before an automatic restart
    pub restart_delay_ms: u64,
    /// Delay before retrying a failed start
    pub start_retry_delay_ms: u64,
    /// Duplicate transcript suppression window
    pub suppression_window_ms: u64,
    /// Unrecognized transcripts shorter than this are dropped
    pub min_unknown_chars: usize,
    /// Optional bound on consecutive restarts
    pub max_restart_attempts: Option<u32>,
    /// Consecutive network failures before the user is told
    pub network_failure_report_threshold: u32,
    /// Channel buffer size
    pub channel_buffer_size: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            restart_delay_ms: 300,
            start_retry_delay_ms: 500,
            suppression_window_ms: 2000,
            min_unknown_chars: 4,
            max_restart_attempts: None,
            network_failure_report_threshold: 3,
            channel_buffer_size: 100,
        }
    }
}

impl VoiceConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            VoiceError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: VoiceConfig = toml::from_str(&content).map_err(|e| {
            VoiceError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !Language::is_supported(&self.language) {
            return Err(VoiceError::ConfigError(format!(
                "Unsupported language: {}",
                self.language
            )));
        }
        if self.channel_buffer_size == 0 {
            return Err(VoiceError::ConfigError(
                "channel_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.network_failure_report_threshold == 0 {
            return Err(VoiceError::ConfigError(
                "network_failure_report_threshold must be at least 1".to_string(),
            ));
        }
        if self.max_restart_attempts == Some(0) {
            return Err(VoiceError::ConfigError(
                "max_restart_attempts must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Set the recognition language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the restart delay
    pub fn with_restart_delay_ms(mut self, delay: u64) -> Self {
        self.restart_delay_ms = delay;
        self
    }

    /// Set the start retry delay
    pub fn with_start_retry_delay_ms(mut self, delay: u64) -> Self {
        self.start_retry_delay_ms = delay;
        self
    }

    /// Set the duplicate suppression window
    pub fn with_suppression_window_ms(mut self, window: u64) -> Self {
        self.suppression_window_ms = window;
        self
    }

    /// Set the minimum length of a surfaced unknown command
    pub fn with_min_unknown_chars(mut self, chars: usize) -> Self {
        self.min_unknown_chars = chars;
        self
    }

    /// Bound the number of consecutive restarts
    pub fn with_max_restart_attempts(mut self, attempts: u32) -> Self {
        self.max_restart_attempts = Some(attempts);
        self
    }

    /// Set the network failure report threshold
    pub fn with_network_failure_report_threshold(mut self, threshold: u32) -> Self {
        self.network_failure_report_threshold = threshold;
        self
    }

    /// Set the channel buffer size
    pub fn with_channel_buffer_size(mut self, size: usize) -> Self {
        self.channel_buffer_size = size;
        self
    }

    /// Suppression window as a duration
    pub fn suppression_window(&self) -> Duration {
        Duration::from_millis(self.suppression_window_ms)
    }

    /// Restart policy for the session machine
    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            restart_delay: Duration::from_millis(self.restart_delay_ms),
            start_retry_delay: Duration::from_millis(self.start_retry_delay_ms),
            max_restart_attempts: self.max_restart_attempts,
            network_failure_report_threshold: self.network_failure_report_threshold,
        }
    }
}
