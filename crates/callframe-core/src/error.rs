//! Error types for the Callframe state boundary.
//!
//! [`AdapterError`] is what an adapter action resolves to when the calling SDK
//! rejects it. It is `Clone + PartialEq` because the store keeps the most
//! recent failure per operation inside the snapshot (`latest_errors`), and
//! snapshots are compared structurally by selectors.
//!
//! [`ListenerError`] is returned by state listeners. The notifier logs it and
//! continues delivering to the remaining listeners.

use thiserror::Error;

use crate::state::CallId;

/// Failure reported by an adapter action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The action needs an active call and there is none.
    #[error("no active call")]
    NoActiveCall,

    /// A join was requested while another call is still active.
    #[error("call {0} is already in progress")]
    CallInProgress(CallId),

    /// The requested device is not known to the device manager.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// The user or platform denied access to a capture device.
    #[error("device access denied")]
    PermissionDenied,

    /// The addressed remote participant is not in the call.
    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    /// The addressed video stream is not available for rendering.
    #[error("stream unavailable for {0}")]
    StreamUnavailable(String),

    /// The network dropped while the action was in flight.
    #[error("network failure: {0}")]
    Network(String),

    /// Any other failure reported by the calling SDK.
    #[error("sdk error {code}: {message}")]
    Sdk {
        /// SDK specific error code.
        code: u32,
        /// Human readable description from the SDK.
        message: String,
    },
}

impl AdapterError {
    /// Returns true if retrying the same action may succeed.
    ///
    /// Only network failures are transient. Permission, lookup and state
    /// errors will fail again until something else changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// A state listener failed while handling a snapshot.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("state listener failed: {0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Create a listener error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
