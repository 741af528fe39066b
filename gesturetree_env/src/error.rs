//! Error types for the GestureTree environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
///
/// `Clone` so a classification failure can sit in a [`crate::MailboxSender`] slot
/// next to successful results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    /// The gesture classifier failed for a frame (model error, bad input, etc.)
    #[error("Classifier error: {0}")]
    ClassifierError(String),

    /// The camera / video source is unavailable (permission denied, unplugged)
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The other end of a mailbox has been dropped
    #[error("Mailbox closed")]
    MailboxClosed,

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates a classifier error.
    pub fn classifier(msg: impl Into<String>) -> Self {
        Self::ClassifierError(msg.into())
    }

    /// Creates a camera error.
    pub fn camera(msg: impl Into<String>) -> Self {
        Self::CameraUnavailable(msg.into())
    }
}
