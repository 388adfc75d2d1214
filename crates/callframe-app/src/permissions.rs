//! Device permission planning.
//!
//! A composite asks for device access once per mount. What it asks for
//! comes from the capability descriptor: audio always, video only if the
//! role may publish video.
//!
//! Starting video while the call is still connecting, ringing or waiting in
//! the lobby races the SDK's own media setup for lobby entry, so
//! [`StartVideoGate`] holds such requests back until the call is admitted.

use callframe_core::{CallStatus, Capabilities, PermissionConstraints};

/// Devices to request access for when a composite mounts.
pub fn mount_permission_request(capabilities: &Capabilities) -> PermissionConstraints {
    PermissionConstraints { audio: true, video: capabilities.camera() }
}

/// Outcome of [`StartVideoGate::request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartVideo {
    /// Start the camera now.
    Now,
    /// Held back until the call is admitted.
    Deferred,
}

/// Holds start-video requests back while the call awaits admission.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartVideoGate {
    deferred: bool,
}

impl StartVideoGate {
    /// Ask to start video with the call in `status`.
    pub fn request(&mut self, status: CallStatus) -> StartVideo {
        if status.is_pre_admission() {
            tracing::debug!(?status, "start video deferred until admission");
            self.deferred = true;
            StartVideo::Deferred
        } else {
            StartVideo::Now
        }
    }

    /// Observe the call status of a new snapshot. Returns true exactly once
    /// when a deferred request may start.
    ///
    /// A deferred request is dropped if the call ends before admission.
    pub fn observe(&mut self, status: CallStatus) -> bool {
        if !self.deferred || status.is_pre_admission() {
            return false;
        }
        self.deferred = false;
        if status.is_in_call() {
            tracing::debug!(?status, "deferred start video released");
            true
        } else {
            tracing::debug!(?status, "deferred start video dropped");
            false
        }
    }

    /// Whether a request is being held back.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }
}

#[cfg(test)]
mod tests {
    use callframe_core::{CompositeOptions, RoleHint};

    use super::*;

    #[test]
    fn consumer_role_never_asks_for_video() {
        let options = CompositeOptions { role_hint: Some(RoleHint::Consumer), ..CompositeOptions::default() };
        let request = mount_permission_request(&Capabilities::from_options(&options));
        assert_eq!(request, PermissionConstraints { audio: true, video: false });

        let request = mount_permission_request(&Capabilities::default());
        assert_eq!(request, PermissionConstraints { audio: true, video: true });
    }

    #[test]
    fn lobby_defers_until_connected() {
        let mut gate = StartVideoGate::default();
        assert_eq!(gate.request(CallStatus::InLobby), StartVideo::Deferred);
        assert!(!gate.observe(CallStatus::InLobby));
        assert!(gate.observe(CallStatus::Connected));
        assert!(!gate.observe(CallStatus::Connected));
    }

    #[test]
    fn ended_call_drops_deferred_request() {
        let mut gate = StartVideoGate::default();
        gate.request(CallStatus::Connecting);
        assert!(!gate.observe(CallStatus::None));
        assert!(!gate.is_deferred());
    }

    #[test]
    fn connected_call_starts_immediately() {
        let mut gate = StartVideoGate::default();
        assert_eq!(gate.request(CallStatus::Connected), StartVideo::Now);
        assert!(!gate.is_deferred());
    }
}
