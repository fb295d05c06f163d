//! Engine Error Types

use thiserror::Error;

/// Errors that can occur while setting up the audio core
///
/// Nothing in here is produced on the real-time path. Sources report
/// silence through the `bool` returned by [`crate::AudioSource::fill`].
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unsupported number of sample channels: {0} (must be 1 or 2)")]
    UnsupportedChannelCount(u16),

    #[error("Sample buffer too short: expected {expected} samples, got {got}")]
    BufferTooShort { expected: usize, got: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("No audio devices found")]
    NoDevicesFound,

    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    #[error("Failed to play audio stream: {0}")]
    StreamPlayError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::UnsupportedChannelCount(6);
        assert!(err.to_string().contains("6"));

        let err = EngineError::BufferTooShort {
            expected: 20,
            got: 12,
        };
        assert!(err.to_string().contains("20"));
        assert!(err.to_string().contains("12"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let engine_err: EngineError = json_err.into();
        assert!(matches!(engine_err, EngineError::Serialization(_)));
    }
}
