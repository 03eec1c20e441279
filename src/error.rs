//! Error types for the voice session engine
//!
//! Recognition faults that the session recovers from on its own never become
//! a `VoiceError`; only conditions a caller has to react to end up here.

use thiserror::Error;

/// Voice session errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceError {
    /// The runtime has no speech recognition engine
    #[error("Speech recognition not supported")]
    EngineUnsupported,

    /// The engine refused to start, even after the retry
    #[error("Failed to start voice recognition: {0}")]
    StartFailed(String),

    /// No microphone could be opened
    #[error("Microphone not available")]
    AudioCaptureUnavailable,

    /// The user declined microphone access
    #[error("Microphone permission denied")]
    PermissionDenied,

    /// The engine keeps failing on the network
    #[error("Voice recognition network failure ({0} in a row)")]
    NetworkFailure(u32),

    /// An unclassified engine error occurred more than once in a row
    #[error("Voice recognition error: {0}")]
    EngineFault(String),

    /// The configured restart bound was reached
    #[error("Voice recognition gave up after {0} restart attempts")]
    RestartLimitExceeded(u32),

    /// Channel communication error
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File system I/O error
    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for VoiceError {
    fn from(e: std::io::Error) -> Self {
        VoiceError::IOError(e.to_string())
    }
}

impl VoiceError {
    /// Check if this error is recoverable
    ///
    /// A recoverable error leaves the session listening; the others stop it
    /// until the caller intervenes.
    pub fn is_recoverable(&self) -> bool {
        match self {
            VoiceError::EngineUnsupported => false,
            VoiceError::StartFailed(_) => false,
            // Hardware and permission problems need the user
            VoiceError::AudioCaptureUnavailable => false,
            VoiceError::PermissionDenied => false,
            // Reported while the session keeps retrying
            VoiceError::NetworkFailure(_) => true,
            VoiceError::EngineFault(_) => true,
            VoiceError::RestartLimitExceeded(_) => false,
            VoiceError::ChannelError(_) => false,
            VoiceError::ConfigError(_) => false,
            VoiceError::IOError(_) => false,
        }
    }

    /// Get a user-friendly description of the error
    pub fn user_message(&self) -> String {
        match self {
            VoiceError::EngineUnsupported => {
                "Speech recognition is not supported here. Try a different browser or device."
                    .to_string()
            }
            VoiceError::StartFailed(_) => {
                "Failed to start voice recognition. Please try again.".to_string()
            }
            VoiceError::AudioCaptureUnavailable => {
                "Microphone not available. Please check your audio device.".to_string()
            }
            VoiceError::PermissionDenied => {
                "Microphone permission denied. Please enable microphone access.".to_string()
            }
            VoiceError::NetworkFailure(_) => {
                "Voice recognition is having network trouble. Still trying...".to_string()
            }
            VoiceError::EngineFault(_) => {
                "Voice recognition hit an error. Still trying...".to_string()
            }
            VoiceError::RestartLimitExceeded(_) => {
                "Voice recognition stopped after repeated failures. Please restart listening."
                    .to_string()
            }
            VoiceError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
            VoiceError::ConfigError(_) => "Configuration error. Please check settings.".to_string(),
            VoiceError::IOError(_) => "File system error occurred.".to_string(),
        }
    }
}

/// Result type alias for voice session operations
pub type Result<T> = std::result::Result<T, VoiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_not_recoverable() {
        assert!(!VoiceError::EngineUnsupported.is_recoverable());
        assert!(!VoiceError::PermissionDenied.is_recoverable());
        assert!(!VoiceError::AudioCaptureUnavailable.is_recoverable());
        assert!(!VoiceError::RestartLimitExceeded(5).is_recoverable());
    }

    #[test]
    fn test_reported_but_recoverable() {
        assert!(VoiceError::NetworkFailure(3).is_recoverable());
        assert!(VoiceError::EngineFault("service-not-allowed".into()).is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VoiceError = io.into();
        assert!(matches!(err, VoiceError::IOError(_)));
    }

    #[test]
    fn test_user_message_mentions_microphone() {
        assert!(VoiceError::PermissionDenied
            .user_message()
            .contains("microphone access"));
    }
}
