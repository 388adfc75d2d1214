//! Device control selectors: microphone and camera buttons, device picker and
//! the configuration screen preview.

use callframe_core::{AdapterState, DeviceAccess, DeviceInfo, LocalVideoStreamState, RoleHint};

use crate::Selector;

/// Microphone toggle button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrophoneButton {
    /// Microphone is live (unmuted in call, enabled on the preview).
    pub checked: bool,
    /// Microphone access was denied.
    pub disabled: bool,
    /// Microphones for the split button menu.
    pub microphones: Vec<DeviceInfo>,
    /// Selected microphone.
    pub selected_microphone: Option<DeviceInfo>,
}

/// Projects [`MicrophoneButton`].
#[derive(Debug, Default)]
pub struct MicrophoneButtonSelector;

/// Input slice of [`MicrophoneButtonSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MicrophoneSlice {
    call_muted: Option<bool>,
    preview_enabled: bool,
    access: Option<DeviceAccess>,
    microphones: Vec<DeviceInfo>,
    selected: Option<DeviceInfo>,
}

impl Selector for MicrophoneButtonSelector {
    type Input = MicrophoneSlice;
    type Output = MicrophoneButton;

    fn input(&self, state: &AdapterState) -> MicrophoneSlice {
        MicrophoneSlice {
            call_muted: state.call.as_ref().map(|call| call.is_muted),
            preview_enabled: state.is_local_preview_microphone_enabled,
            access: state.devices.device_access,
            microphones: state.devices.microphones.clone(),
            selected: state.devices.selected_microphone.clone(),
        }
    }

    fn compute(&self, slice: &MicrophoneSlice) -> MicrophoneButton {
        MicrophoneButton {
            checked: slice.call_muted.map_or(slice.preview_enabled, |muted| !muted),
            disabled: slice.access.is_some_and(|access| !access.audio),
            microphones: slice.microphones.clone(),
            selected_microphone: slice.selected.clone(),
        }
    }
}

/// Camera toggle button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraButton {
    /// Camera is live (in call or as preview).
    pub checked: bool,
    /// Camera access was denied or the role never publishes video.
    pub disabled: bool,
    /// Cameras for the split button menu.
    pub cameras: Vec<DeviceInfo>,
    /// Selected camera.
    pub selected_camera: Option<DeviceInfo>,
}

/// Projects [`CameraButton`].
#[derive(Debug, Default)]
pub struct CameraButtonSelector;

/// Input slice of [`CameraButtonSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSlice {
    call_camera_on: Option<bool>,
    preview_on: bool,
    access: Option<DeviceAccess>,
    role_hint: Option<RoleHint>,
    cameras: Vec<DeviceInfo>,
    selected: Option<DeviceInfo>,
}

impl Selector for CameraButtonSelector {
    type Input = CameraSlice;
    type Output = CameraButton;

    fn input(&self, state: &AdapterState) -> CameraSlice {
        CameraSlice {
            call_camera_on: state.call.as_ref().map(|call| call.is_camera_on()),
            preview_on: !state.devices.unparented_views.is_empty(),
            access: state.devices.device_access,
            role_hint: state.role_hint,
            cameras: state.devices.cameras.clone(),
            selected: state.devices.selected_camera.clone(),
        }
    }

    fn compute(&self, slice: &CameraSlice) -> CameraButton {
        let denied = slice.access.is_some_and(|access| !access.video);
        let forbidden = slice.role_hint.is_some_and(|role| !role.allows_camera());
        CameraButton {
            checked: slice.call_camera_on.unwrap_or(slice.preview_on),
            disabled: denied || forbidden,
            cameras: slice.cameras.clone(),
            selected_camera: slice.selected.clone(),
        }
    }
}

/// Device settings menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePicker {
    /// Available cameras.
    pub cameras: Vec<DeviceInfo>,
    /// Available microphones.
    pub microphones: Vec<DeviceInfo>,
    /// Available speakers. Empty if the platform cannot select speakers.
    pub speakers: Vec<DeviceInfo>,
    /// Selected camera.
    pub selected_camera: Option<DeviceInfo>,
    /// Selected microphone.
    pub selected_microphone: Option<DeviceInfo>,
    /// Selected speaker.
    pub selected_speaker: Option<DeviceInfo>,
}

/// Projects [`DevicePicker`].
#[derive(Debug, Default)]
pub struct DevicePickerSelector;

impl Selector for DevicePickerSelector {
    type Input = DevicePicker;
    type Output = DevicePicker;

    fn input(&self, state: &AdapterState) -> DevicePicker {
        let devices = &state.devices;
        let speakers =
            if devices.is_speaker_selection_available { devices.speakers.clone() } else { Vec::new() };
        DevicePicker {
            cameras: devices.cameras.clone(),
            microphones: devices.microphones.clone(),
            speakers,
            selected_camera: devices.selected_camera.clone(),
            selected_microphone: devices.selected_microphone.clone(),
            selected_speaker: devices.selected_speaker.clone(),
        }
    }

    fn compute(&self, slice: &DevicePicker) -> DevicePicker {
        slice.clone()
    }
}

/// Configuration screen preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPreview {
    /// Microphone enabled for joining.
    pub microphone_enabled: bool,
    /// Preview video, if the camera is on.
    pub video: Option<LocalVideoStreamState>,
    /// Permission state. `None` until asked.
    pub device_access: Option<DeviceAccess>,
}

/// Projects [`LocalPreview`].
#[derive(Debug, Default)]
pub struct LocalPreviewSelector;

impl Selector for LocalPreviewSelector {
    type Input = LocalPreview;
    type Output = LocalPreview;

    fn input(&self, state: &AdapterState) -> LocalPreview {
        LocalPreview {
            microphone_enabled: state.is_local_preview_microphone_enabled,
            video: state.devices.unparented_views.first().cloned(),
            device_access: state.devices.device_access,
        }
    }

    fn compute(&self, slice: &LocalPreview) -> LocalPreview {
        slice.clone()
    }
}

#[cfg(test)]
mod tests {
    use callframe_core::{CallId, CallState, CallStatus, Timestamp};

    use super::*;
    use crate::Memoized;

    fn in_call(muted: bool) -> AdapterState {
        let mut call = CallState::new(CallId::new("c1"), CallStatus::Connected, Timestamp::ZERO);
        call.is_muted = muted;
        AdapterState { call: Some(call), ..AdapterState::default() }
    }

    #[test]
    fn microphone_follows_call_then_preview() {
        let selector = MicrophoneButtonSelector;
        assert!(!selector.compute(&selector.input(&in_call(true))).checked);
        assert!(selector.compute(&selector.input(&in_call(false))).checked);

        let preview = AdapterState { is_local_preview_microphone_enabled: true, ..AdapterState::default() };
        assert!(selector.compute(&selector.input(&preview)).checked);
    }

    #[test]
    fn consumer_role_disables_camera() {
        let selector = CameraButtonSelector;
        let state = AdapterState { role_hint: Some(RoleHint::Consumer), ..AdapterState::default() };
        assert!(selector.compute(&selector.input(&state)).disabled);
    }

    #[test]
    fn remote_participant_changes_do_not_touch_device_buttons() {
        let selector = Memoized::new(MicrophoneButtonSelector);
        let mut state = in_call(false);
        let first = selector.select(&state);

        if let Some(call) = state.call.as_mut() {
            call.remote_participants.insert(
                "8:acs:zeta".into(),
                callframe_core::RemoteParticipantState::connected("8:acs:zeta", None),
            );
        }
        assert!(std::rc::Rc::ptr_eq(&first, &selector.select(&state)));
    }
}
