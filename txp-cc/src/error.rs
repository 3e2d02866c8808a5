//! Error types for txp-cc

use thiserror::Error;

/// Capture subsystem errors
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Device access refused. Surfaced as a disabled-feature state, not a
    /// hard failure of the form.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Every capture strategy was exhausted; message carries user guidance
    #[error("{0}")]
    CaptureFailed(String),

    /// Operation not valid in the current recorder/camera state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Artifact finalization failed
    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Submission errors, display-ready for the sender
#[derive(Debug, Error)]
pub enum SubmitError {
    /// Transport-level failure; the form stays populated for retry
    #[error("Could not reach the gateway: {0}")]
    Network(String),

    /// The gateway rejected the submission (message is its display text)
    #[error("{0}")]
    Rejected(String),

    /// The sender cancelled at the consent step; nothing was transmitted
    #[error("Submission cancelled")]
    Cancelled,
}
