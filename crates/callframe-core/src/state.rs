//! Adapter state snapshot types.
//!
//! [`AdapterState`] is the read model every selector, handler and the page
//! machine consume. The [`crate::StateStore`] replaces it wholesale on every
//! SDK mutation and hands out shared, immutable `Rc<AdapterState>` values.
//! Nothing outside the store mutates a delivered snapshot.

use std::{collections::BTreeMap, fmt};

use crate::{AdapterError, CompositePage, Timestamp};

/// Identifier of a call, assigned by the calling SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallId(String);

impl CallId {
    /// Wrap an SDK call identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of the local call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CallStatus {
    /// No call object has been created yet.
    #[default]
    None,
    /// Call setup in progress.
    Connecting,
    /// Outgoing call is ringing at the callee.
    Ringing,
    /// Early media is flowing before the call is answered.
    EarlyMedia,
    /// Waiting for admission by a meeting organizer.
    InLobby,
    /// Call is established.
    Connected,
    /// The local user put the call on hold.
    LocalHold,
    /// A remote party put the call on hold.
    RemoteHold,
    /// Teardown in progress.
    Disconnecting,
    /// Call has ended.
    Disconnected,
}

impl CallStatus {
    /// True while the call has not yet been admitted or answered.
    ///
    /// Start-video requests are deferred while this holds so they do not race
    /// the SDK's own lobby media setup.
    pub fn is_pre_admission(self) -> bool {
        matches!(self, Self::Connecting | Self::Ringing | Self::EarlyMedia | Self::InLobby)
    }

    /// True while media is flowing in an established call.
    pub fn is_in_call(self) -> bool {
        matches!(self, Self::Connected | Self::LocalHold | Self::RemoteHold)
    }

    /// True once the call is being torn down or is gone.
    pub fn is_terminated(self) -> bool {
        matches!(self, Self::Disconnecting | Self::Disconnected | Self::None)
    }
}

/// `(code, sub_code)` pair describing why a call ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CallEndReason {
    /// Primary end code.
    pub code: u32,
    /// Detailed sub code.
    pub sub_code: u32,
}

impl CallEndReason {
    /// Create an end reason.
    pub const fn new(code: u32, sub_code: u32) -> Self {
        Self { code, sub_code }
    }
}

/// Kind of media carried by a video stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// Camera video.
    #[default]
    Video,
    /// Screen sharing.
    ScreenSharing,
}

/// How a rendered stream fills its tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScalingMode {
    /// Scale to cover the tile, cropping overflow.
    #[default]
    Crop,
    /// Scale to fit inside the tile, letterboxing.
    Fit,
}

/// A created renderer view for a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StreamView {
    /// Scaling applied by the renderer.
    pub scaling_mode: ScalingMode,
    /// Whether the view is horizontally mirrored.
    pub is_mirrored: bool,
}

/// A remote participant's video stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoStreamState {
    /// SDK stream identifier.
    pub id: u32,
    /// Camera or screen share.
    pub media_kind: MediaKind,
    /// Whether the sender is currently publishing this stream.
    pub is_available: bool,
    /// Renderer view, if one was created.
    pub view: Option<StreamView>,
}

/// The local user's camera or screen share stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVideoStreamState {
    /// Capture device feeding the stream.
    pub source: DeviceInfo,
    /// Camera or screen share.
    pub media_kind: MediaKind,
    /// Renderer view, if one was created.
    pub view: Option<StreamView>,
}

/// Connection state of a remote participant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ParticipantConnectionState {
    /// Known to the call but not connected.
    #[default]
    Idle,
    /// Joining.
    Connecting,
    /// Being dialed.
    Ringing,
    /// Early media before answering.
    EarlyMedia,
    /// In the call.
    Connected,
    /// Holding the call.
    Hold,
    /// Waiting in the lobby.
    InLobby,
    /// Gone.
    Disconnected,
}

impl ParticipantConnectionState {
    /// True if the participant is present in the call (connected or held).
    pub fn is_present(self) -> bool {
        matches!(self, Self::Connected | Self::Hold)
    }
}

/// Per remote participant entry, keyed by flattened identifier.
///
/// The display name may arrive after the participant is created. A name
/// change never changes identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteParticipantState {
    /// Flattened participant identifier.
    pub identifier: String,
    /// Display name, once known.
    pub display_name: Option<String>,
    /// Connection state.
    pub state: ParticipantConnectionState,
    /// Whether the participant's microphone is muted.
    pub is_muted: bool,
    /// Whether the participant is currently speaking.
    pub is_speaking: bool,
    /// Video streams by SDK stream id.
    pub video_streams: BTreeMap<u32, VideoStreamState>,
}

impl RemoteParticipantState {
    /// Connected participant with the given identifier and optional name.
    pub fn connected(identifier: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            identifier: identifier.into(),
            display_name,
            state: ParticipantConnectionState::Connected,
            ..Self::default()
        }
    }
}

/// A call transfer request observed on the local call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferState {
    /// Participant the call is being transferred to.
    pub target: String,
    /// Whether the transfer was accepted by the target.
    pub accepted: bool,
}

/// Breakout room assignment of the local user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakoutRoomState {
    /// Display name of the assigned room.
    pub room_name: String,
    /// Whether the organizer closed the room.
    pub closed: bool,
}

/// Media and network diagnostics reported by the SDK.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Whether the network is currently reported as reconnecting.
    pub network_reconnecting: bool,
    /// Whether outgoing audio is reported as not being sent.
    pub no_microphone_audio: bool,
}

/// Snapshot of the active (or just ended) call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallState {
    /// SDK call identifier.
    pub id: CallId,
    /// Lifecycle status.
    pub status: CallStatus,
    /// Whether the local microphone is muted.
    pub is_muted: bool,
    /// Whether the local user is sharing their screen.
    pub is_screen_sharing_on: bool,
    /// Remote participants by flattened identifier.
    pub remote_participants: BTreeMap<String, RemoteParticipantState>,
    /// Local camera and screen share streams.
    pub local_video_streams: Vec<LocalVideoStreamState>,
    /// Diagnostics.
    pub diagnostics: Diagnostics,
    /// When the call object was created.
    pub start_time: Timestamp,
    /// When the call ended.
    pub end_time: Option<Timestamp>,
    /// Why the call ended.
    pub end_reason: Option<CallEndReason>,
    /// Pending or accepted transfer.
    pub transfer: Option<TransferState>,
    /// Breakout room assignment.
    pub breakout_room: Option<BreakoutRoomState>,
}

impl CallState {
    /// New call in the given status.
    pub fn new(id: CallId, status: CallStatus, start_time: Timestamp) -> Self {
        Self { id, status, start_time, ..Self::default() }
    }

    /// Whether the local camera stream is live.
    pub fn is_camera_on(&self) -> bool {
        self.local_video_streams.iter().any(|s| s.media_kind == MediaKind::Video)
    }
}

/// A capture or render device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DeviceInfo {
    /// Stable device identifier.
    pub id: String,
    /// Human readable device name.
    pub name: String,
}

impl DeviceInfo {
    /// Create a device description.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into() }
    }
}

/// Result of the last device permission check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeviceAccess {
    /// Microphone access granted.
    pub audio: bool,
    /// Camera access granted.
    pub video: bool,
}

/// Device manager slice of the snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceManagerState {
    /// Available cameras.
    pub cameras: Vec<DeviceInfo>,
    /// Available microphones.
    pub microphones: Vec<DeviceInfo>,
    /// Available speakers.
    pub speakers: Vec<DeviceInfo>,
    /// Selected camera.
    pub selected_camera: Option<DeviceInfo>,
    /// Selected microphone.
    pub selected_microphone: Option<DeviceInfo>,
    /// Selected speaker.
    pub selected_speaker: Option<DeviceInfo>,
    /// Whether the platform supports choosing a speaker.
    pub is_speaker_selection_available: bool,
    /// Permission grants. `None` until the first permission check.
    pub device_access: Option<DeviceAccess>,
    /// Camera previews rendered outside of a call (configuration screen).
    pub unparented_views: Vec<LocalVideoStreamState>,
}

/// Adapter operation an error is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorTarget {
    /// `join_call`
    JoinCall,
    /// `leave_call`
    LeaveCall,
    /// `mute`
    Mute,
    /// `unmute`
    Unmute,
    /// `start_camera`
    StartCamera,
    /// `stop_camera`
    StopCamera,
    /// `start_screen_share`
    StartScreenShare,
    /// `stop_screen_share`
    StopScreenShare,
    /// `create_stream_view`
    CreateStreamView,
    /// `dispose_stream_view`
    DisposeStreamView,
    /// `remove_participant`
    RemoveParticipant,
    /// `set_camera`
    SetCamera,
    /// `set_microphone`
    SetMicrophone,
    /// `set_speaker`
    SetSpeaker,
    /// `ask_device_permission`
    AskDevicePermission,
}

impl ErrorTarget {
    /// Operation name as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JoinCall => "joinCall",
            Self::LeaveCall => "leaveCall",
            Self::Mute => "mute",
            Self::Unmute => "unmute",
            Self::StartCamera => "startCamera",
            Self::StopCamera => "stopCamera",
            Self::StartScreenShare => "startScreenShare",
            Self::StopScreenShare => "stopScreenShare",
            Self::CreateStreamView => "createStreamView",
            Self::DisposeStreamView => "disposeStreamView",
            Self::RemoveParticipant => "removeParticipant",
            Self::SetCamera => "setCamera",
            Self::SetMicrophone => "setMicrophone",
            Self::SetSpeaker => "setSpeaker",
            Self::AskDevicePermission => "askDevicePermission",
        }
    }
}

impl fmt::Display for ErrorTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last failure of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveError {
    /// The failure.
    pub error: AdapterError,
    /// When it was recorded.
    pub timestamp: Timestamp,
}

/// Meeting role hint supplied by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleHint {
    /// Can present and use camera and microphone.
    Presenter,
    /// Can use camera and microphone.
    Attendee,
    /// View-only participant, never publishes video.
    Consumer,
}

impl RoleHint {
    /// Whether this role may use the camera at all.
    pub fn allows_camera(self) -> bool {
        !matches!(self, Self::Consumer)
    }
}

/// Root read model owned by the adapter boundary.
///
/// # Invariants
///
/// - `call` is present iff the user has an active or terminating call.
/// - `ended_call`, when present, never has the same id as `call`.
/// - `page` is written only by the [`crate::PageStateMachine`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdapterState {
    /// Current top-level screen.
    pub page: CompositePage,
    /// Flattened identifier of the local user.
    pub user_id: String,
    /// Local user's display name.
    pub display_name: Option<String>,
    /// Whether the call targets a Teams meeting (requires lobby admission).
    pub is_teams_call: bool,
    /// Whether the call targets a room with a waiting room.
    pub is_rooms_call: bool,
    /// Role hint from the host application.
    pub role_hint: Option<RoleHint>,
    /// Whether the microphone is enabled on the configuration screen.
    pub is_local_preview_microphone_enabled: bool,
    /// Active call.
    pub call: Option<CallState>,
    /// Terminal snapshot of the most recently ended call.
    pub ended_call: Option<CallState>,
    /// Device manager slice.
    pub devices: DeviceManagerState,
    /// Most recent failure per operation.
    pub latest_errors: BTreeMap<ErrorTarget, ActiveError>,
}

impl AdapterState {
    /// Empty state for the given local user.
    pub fn new(user_id: impl Into<String>, display_name: Option<String>) -> Self {
        Self { user_id: user_id.into(), display_name, ..Self::default() }
    }

    /// Status of the active call, [`CallStatus::None`] if there is no call.
    pub fn call_status(&self) -> CallStatus {
        self.call.as_ref().map_or(CallStatus::None, |call| call.status)
    }

    /// Whether joining requires admission by an organizer.
    pub fn requires_admission(&self) -> bool {
        self.is_teams_call || self.is_rooms_call
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_call_reads_as_no_status() {
        let state = AdapterState::new("8:acs:me", None);
        assert_eq!(state.call_status(), CallStatus::None);
        assert!(state.call_status().is_terminated());
    }

    #[test]
    fn status_classes_are_disjoint() {
        let all = [
            CallStatus::None,
            CallStatus::Connecting,
            CallStatus::Ringing,
            CallStatus::EarlyMedia,
            CallStatus::InLobby,
            CallStatus::Connected,
            CallStatus::LocalHold,
            CallStatus::RemoteHold,
            CallStatus::Disconnecting,
            CallStatus::Disconnected,
        ];
        for status in all {
            let classes = [status.is_pre_admission(), status.is_in_call(), status.is_terminated()];
            assert_eq!(classes.iter().filter(|c| **c).count(), 1, "{status:?}");
        }
    }

    #[test]
    fn camera_on_tracks_video_streams_only() {
        let mut call = CallState::new(CallId::new("c1"), CallStatus::Connected, Timestamp::ZERO);
        assert!(!call.is_camera_on());

        call.local_video_streams.push(LocalVideoStreamState {
            media_kind: MediaKind::ScreenSharing,
            ..LocalVideoStreamState::default()
        });
        assert!(!call.is_camera_on());

        call.local_video_streams.push(LocalVideoStreamState::default());
        assert!(call.is_camera_on());
    }

    #[test]
    fn consumer_role_forbids_camera() {
        assert!(!RoleHint::Consumer.allows_camera());
        assert!(RoleHint::Attendee.allows_camera());
        assert!(RoleHint::Presenter.allows_camera());
    }
}
