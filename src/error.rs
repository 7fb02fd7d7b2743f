//! Error types for mkcii

use thiserror::Error;

/// Main error type for seed image generation
#[derive(Error, Debug)]
pub enum SeedError {
    /// Missing or contradictory command line input
    #[error("{0}")]
    Usage(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Image write error: {0}")]
    ImageWrite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SeedError {
    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an image write error
    pub fn image_write(message: impl Into<String>) -> Self {
        Self::ImageWrite(message.into())
    }

    /// Process exit code for this error
    ///
    /// Every failure is a deterministic input problem, so they all share
    /// the same code.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SeedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_error_displays_message_verbatim() {
        let err = SeedError::usage("-e requires -i to be set");
        assert_eq!(err.to_string(), "-e requires -i to be set");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: SeedError = io.into();
        assert!(matches!(err, SeedError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }
}
