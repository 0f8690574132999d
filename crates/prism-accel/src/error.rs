//! Error types for accelerator configuration.

use thiserror::Error;

/// Errors that can occur while configuring an accelerator.
///
/// Building and traversing a BVH never fails; only settings parsing,
/// validation and instancing setup can.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccelError {
    /// Split method name not recognized.
    #[error("unknown BVH split method \"{0}\"")]
    UnknownSplitMethod(String),

    /// Build settings out of range.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Instance transform has no inverse.
    #[error("primitive-to-world transform is not invertible")]
    SingularTransform,
}

/// Result type for accelerator configuration.
pub type Result<T> = std::result::Result<T, AccelError>;
