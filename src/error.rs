//! Error types for profile synchronization.
//!
//! Every variant is recoverable: the controller returns it to the caller and
//! surfaces it as a notice, and the panel keeps running.

use thiserror::Error;

use crate::profile::model::{Channel, FieldName};

/// Failures surfaced by the sync controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Malformed local value, rejected before any remote call.
    #[error("invalid {field}: {reason}")]
    Validation { field: FieldName, reason: String },

    /// `requestOtp` failed; the channel stays idle.
    #[error("could not send {channel} code: {reason}")]
    OtpDelivery { channel: Channel, reason: String },

    /// `verifyOtp` reported failure; the channel may be retried.
    #[error("wrong {channel} code")]
    OtpRejected { channel: Channel },

    /// `updateProfileField` failed; the local value is kept.
    #[error("could not save {field}: {reason}")]
    Persistence { field: FieldName, reason: String },

    /// A remote call failed in transport before the service could answer
    /// (profile fetch, code check).
    #[error("could not {action}: {reason}")]
    Unavailable { action: String, reason: String },

    /// A code was submitted while no challenge is outstanding.
    #[error("no {channel} code has been sent")]
    NoPendingChallenge { channel: Channel },

    #[error("{channel} is already verified")]
    AlreadyVerified { channel: Channel },

    /// The panel was closed; commands are no longer accepted.
    #[error("sync session is closed")]
    Closed,
}

impl SyncError {
    pub fn validation(field: FieldName, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the user can act to clear the condition.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SyncError::Closed)
    }
}

/// Failure reported by a remote collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    /// The server refused the request under its own policy.
    #[error("request refused: {0}")]
    Refused(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
