//! Error bar selector.
//!
//! Turns `latest_errors`, denied device access and call diagnostics into the
//! messages of a dismissible error banner.
//!
//! Action failures are filtered by timestamp. Anything recorded before the
//! current call started belongs to an earlier attempt and is hidden, and in
//! "ignore premount errors" mode anything recorded before the composite was
//! mounted is hidden as well.

use std::collections::BTreeMap;

use callframe_core::{
    ActiveError, AdapterError, AdapterState, DeviceAccess, ErrorTarget, Timestamp,
};

use crate::Selector;

/// One banner entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorBarMessage {
    /// An adapter action failed. Dismissing clears this target's entry.
    ActionFailed {
        /// The failed operation.
        target: ErrorTarget,
        /// The failure.
        error: AdapterError,
        /// When it was recorded.
        timestamp: Timestamp,
    },
    /// Microphone access was denied.
    MicrophoneAccessDenied,
    /// Camera access was denied.
    CameraAccessDenied,
    /// The call's network connection is recovering.
    NetworkReconnecting,
    /// Outgoing audio is not reaching the call.
    NoMicrophoneAudio,
}

impl ErrorBarMessage {
    /// Operation whose entry dismissing this message clears. `None` for
    /// messages derived from device or call state.
    pub fn dismiss_target(&self) -> Option<ErrorTarget> {
        match self {
            Self::ActionFailed { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Projects the error bar.
#[derive(Debug, Default)]
pub struct ErrorBarSelector {
    hide_before: Option<Timestamp>,
}

impl ErrorBarSelector {
    /// Selector that hides errors recorded before `mount_time`.
    pub fn ignoring_premount(mount_time: Timestamp) -> Self {
        Self { hide_before: Some(mount_time) }
    }
}

/// Input slice of [`ErrorBarSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorBarSlice {
    errors: BTreeMap<ErrorTarget, ActiveError>,
    access: Option<DeviceAccess>,
    call_start: Option<Timestamp>,
    reconnecting: bool,
    no_microphone_audio: bool,
}

impl Selector for ErrorBarSelector {
    type Input = ErrorBarSlice;
    type Output = Vec<ErrorBarMessage>;

    fn input(&self, state: &AdapterState) -> ErrorBarSlice {
        let call = state.call.as_ref();
        ErrorBarSlice {
            errors: state.latest_errors.clone(),
            access: state.devices.device_access,
            call_start: call.map(|call| call.start_time),
            reconnecting: call.is_some_and(|call| call.diagnostics.network_reconnecting),
            no_microphone_audio: call.is_some_and(|call| call.diagnostics.no_microphone_audio),
        }
    }

    fn compute(&self, slice: &ErrorBarSlice) -> Vec<ErrorBarMessage> {
        let threshold = self.hide_before.max(slice.call_start);
        let mut messages: Vec<_> = slice
            .errors
            .iter()
            .filter(|(_, active)| threshold.is_none_or(|threshold| active.timestamp >= threshold))
            .map(|(target, active)| ErrorBarMessage::ActionFailed {
                target: *target,
                error: active.error.clone(),
                timestamp: active.timestamp,
            })
            .collect();

        if let Some(access) = slice.access {
            if !access.audio {
                messages.push(ErrorBarMessage::MicrophoneAccessDenied);
            }
            if !access.video {
                messages.push(ErrorBarMessage::CameraAccessDenied);
            }
        }
        if slice.reconnecting {
            messages.push(ErrorBarMessage::NetworkReconnecting);
        }
        if slice.no_microphone_audio {
            messages.push(ErrorBarMessage::NoMicrophoneAudio);
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use callframe_core::{CallId, CallState, CallStatus};

    use super::*;

    fn error_at(millis: u64) -> ActiveError {
        ActiveError { error: AdapterError::NoActiveCall, timestamp: Timestamp::from_millis(millis) }
    }

    fn targets(messages: &[ErrorBarMessage]) -> Vec<ErrorTarget> {
        messages.iter().filter_map(ErrorBarMessage::dismiss_target).collect()
    }

    #[test]
    fn premount_errors_are_hidden_when_asked() {
        let mut state = AdapterState::default();
        state.latest_errors.insert(ErrorTarget::Mute, error_at(100));
        state.latest_errors.insert(ErrorTarget::StartCamera, error_at(300));

        let all = ErrorBarSelector::default();
        assert_eq!(targets(&all.compute(&all.input(&state))).len(), 2);

        let fresh = ErrorBarSelector::ignoring_premount(Timestamp::from_millis(200));
        assert_eq!(targets(&fresh.compute(&fresh.input(&state))), vec![ErrorTarget::StartCamera]);
    }

    #[test]
    fn errors_from_before_the_call_are_stale() {
        let mut state = AdapterState::default();
        state.latest_errors.insert(ErrorTarget::JoinCall, error_at(100));
        state.latest_errors.insert(ErrorTarget::Unmute, error_at(600));
        state.call = Some(CallState::new(CallId::new("c2"), CallStatus::Connected, Timestamp::from_millis(500)));

        let selector = ErrorBarSelector::default();
        assert_eq!(targets(&selector.compute(&selector.input(&state))), vec![ErrorTarget::Unmute]);
    }

    #[test]
    fn denied_access_is_reported_without_a_target() {
        let mut state = AdapterState::default();
        state.devices.device_access = Some(DeviceAccess { audio: true, video: false });

        let selector = ErrorBarSelector::default();
        let messages = selector.compute(&selector.input(&state));
        assert_eq!(messages, vec![ErrorBarMessage::CameraAccessDenied]);
        assert_eq!(messages[0].dismiss_target(), None);
    }
}
