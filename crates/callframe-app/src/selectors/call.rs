//! In-call selectors: status, screen share, participants and video gallery.

use std::{collections::BTreeMap, rc::Rc};

use callframe_core::{
    AdapterState, CallStatus, LocalVideoStreamState, MediaKind, ParticipantConnectionState,
    RemoteParticipantState, VideoStreamState,
};

use crate::{AnnouncedParticipant, Memoized, Selector, Shared};

type RemoteMap = Option<BTreeMap<String, RemoteParticipantState>>;

fn remote_participants(state: &AdapterState) -> RemoteMap {
    state.call.as_ref().map(|call| call.remote_participants.clone())
}

/// Call status banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallStatusView {
    /// Call status, [`CallStatus::None`] without a call.
    pub status: CallStatus,
    /// The local user is sharing their screen.
    pub is_screen_sharing_on: bool,
    /// The network is reconnecting.
    pub is_reconnecting: bool,
}

/// Projects [`CallStatusView`].
#[derive(Debug, Default)]
pub struct CallStatusSelector;

impl Selector for CallStatusSelector {
    type Input = CallStatusView;
    type Output = CallStatusView;

    fn input(&self, state: &AdapterState) -> CallStatusView {
        let call = state.call.as_ref();
        CallStatusView {
            status: state.call_status(),
            is_screen_sharing_on: call.is_some_and(|call| call.is_screen_sharing_on),
            is_reconnecting: call.is_some_and(|call| call.diagnostics.network_reconnecting),
        }
    }

    fn compute(&self, slice: &CallStatusView) -> CallStatusView {
        *slice
    }
}

/// Screen share toggle button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenShareButton {
    /// Sharing is on.
    pub checked: bool,
    /// Sharing needs a connected call.
    pub disabled: bool,
}

/// Projects [`ScreenShareButton`].
#[derive(Debug, Default)]
pub struct ScreenShareButtonSelector;

impl Selector for ScreenShareButtonSelector {
    type Input = (CallStatus, bool);
    type Output = ScreenShareButton;

    fn input(&self, state: &AdapterState) -> (CallStatus, bool) {
        (state.call_status(), state.call.as_ref().is_some_and(|call| call.is_screen_sharing_on))
    }

    fn compute(&self, &(status, sharing): &(CallStatus, bool)) -> ScreenShareButton {
        ScreenShareButton { checked: sharing, disabled: !status.is_in_call() }
    }
}

/// One row of the participant list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantItem {
    /// Flattened identifier.
    pub identifier: String,
    /// Display name, if known.
    pub display_name: Option<String>,
    /// Connection state. The local user is always connected.
    pub state: ParticipantConnectionState,
    /// Microphone muted.
    pub is_muted: bool,
    /// Currently speaking.
    pub is_speaking: bool,
    /// Sharing their screen.
    pub is_screen_sharing: bool,
    /// This row is the local user.
    pub is_local: bool,
}

/// Projects the participant list: the local user first, then every remote
/// participant that has not disconnected, in identifier order.
#[derive(Debug, Default)]
pub struct ParticipantListSelector;

/// Input slice of [`ParticipantListSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantListSlice {
    user_id: String,
    display_name: Option<String>,
    local: Option<(bool, bool)>,
    remote: RemoteMap,
}

impl Selector for ParticipantListSelector {
    type Input = ParticipantListSlice;
    type Output = Vec<ParticipantItem>;

    fn input(&self, state: &AdapterState) -> ParticipantListSlice {
        ParticipantListSlice {
            user_id: state.user_id.clone(),
            display_name: state.display_name.clone(),
            local: state.call.as_ref().map(|call| (call.is_muted, call.is_screen_sharing_on)),
            remote: remote_participants(state),
        }
    }

    fn compute(&self, slice: &ParticipantListSlice) -> Vec<ParticipantItem> {
        let Some((is_muted, is_screen_sharing)) = slice.local else {
            return Vec::new();
        };
        let local = ParticipantItem {
            identifier: slice.user_id.clone(),
            display_name: slice.display_name.clone(),
            state: ParticipantConnectionState::Connected,
            is_muted,
            is_speaking: false,
            is_screen_sharing,
            is_local: true,
        };
        let remote = slice
            .remote
            .iter()
            .flat_map(BTreeMap::values)
            .filter(|participant| participant.state != ParticipantConnectionState::Disconnected)
            .map(|participant| ParticipantItem {
                identifier: participant.identifier.clone(),
                display_name: participant.display_name.clone(),
                state: participant.state,
                is_muted: participant.is_muted,
                is_speaking: participant.is_speaking,
                is_screen_sharing: available_stream(participant, MediaKind::ScreenSharing).is_some(),
                is_local: false,
            });
        std::iter::once(local).chain(remote).collect()
    }
}

/// Projects the remote participants present in the call (connected or on
/// hold), identity and name only. This is the announcer's input.
///
/// Mute, speaking and video changes leave the slice, and so the output,
/// untouched.
#[derive(Debug, Default)]
pub struct ConnectedParticipantsSelector;

impl Selector for ConnectedParticipantsSelector {
    type Input = Vec<AnnouncedParticipant>;
    type Output = Vec<AnnouncedParticipant>;

    fn input(&self, state: &AdapterState) -> Vec<AnnouncedParticipant> {
        state
            .call
            .iter()
            .flat_map(|call| call.remote_participants.values())
            .filter(|participant| participant.state.is_present())
            .map(|participant| AnnouncedParticipant {
                identifier: participant.identifier.clone(),
                display_name: participant.display_name.clone(),
            })
            .collect()
    }

    fn compute(&self, slice: &Vec<AnnouncedParticipant>) -> Vec<AnnouncedParticipant> {
        slice.clone()
    }
}

/// A remote participant's gallery tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteVideoTile {
    /// Flattened identifier.
    pub identifier: String,
    /// Display name, if known.
    pub display_name: Option<String>,
    /// Microphone muted.
    pub is_muted: bool,
    /// Currently speaking.
    pub is_speaking: bool,
    /// Available camera stream.
    pub video: Option<VideoStreamState>,
    /// Available screen share stream.
    pub screen_share: Option<VideoStreamState>,
}

fn available_stream(participant: &RemoteParticipantState, kind: MediaKind) -> Option<&VideoStreamState> {
    participant.video_streams.values().find(|stream| stream.media_kind == kind && stream.is_available)
}

/// Projects [`RemoteVideoTile`]s for present participants.
#[derive(Debug, Default)]
pub struct RemoteVideoTilesSelector;

impl Selector for RemoteVideoTilesSelector {
    type Input = RemoteMap;
    type Output = Vec<RemoteVideoTile>;

    fn input(&self, state: &AdapterState) -> RemoteMap {
        remote_participants(state)
    }

    fn compute(&self, slice: &RemoteMap) -> Vec<RemoteVideoTile> {
        slice
            .iter()
            .flat_map(BTreeMap::values)
            .filter(|participant| participant.state.is_present())
            .map(|participant| RemoteVideoTile {
                identifier: participant.identifier.clone(),
                display_name: participant.display_name.clone(),
                is_muted: participant.is_muted,
                is_speaking: participant.is_speaking,
                video: available_stream(participant, MediaKind::Video).cloned(),
                screen_share: available_stream(participant, MediaKind::ScreenSharing).cloned(),
            })
            .collect()
    }
}

/// The local user's gallery tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTile {
    /// Flattened identifier of the local user.
    pub user_id: String,
    /// Local display name.
    pub display_name: Option<String>,
    /// Microphone muted. True without a call.
    pub is_muted: bool,
    /// The local user is sharing their screen.
    pub is_screen_sharing_on: bool,
    /// Live camera stream.
    pub video: Option<LocalVideoStreamState>,
}

/// Projects [`LocalTile`].
#[derive(Debug, Default)]
pub struct LocalTileSelector;

impl Selector for LocalTileSelector {
    type Input = LocalTile;
    type Output = LocalTile;

    fn input(&self, state: &AdapterState) -> LocalTile {
        let call = state.call.as_ref();
        LocalTile {
            user_id: state.user_id.clone(),
            display_name: state.display_name.clone(),
            is_muted: call.is_none_or(|call| call.is_muted),
            is_screen_sharing_on: call.is_some_and(|call| call.is_screen_sharing_on),
            video: call
                .and_then(|call| call.local_video_streams.iter().find(|s| s.media_kind == MediaKind::Video))
                .cloned(),
        }
    }

    fn compute(&self, slice: &LocalTile) -> LocalTile {
        slice.clone()
    }
}

/// Who is presenting in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenShareOwner {
    /// The local user.
    Local,
    /// A remote participant, by identifier.
    Remote(String),
}

/// Video gallery layout.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoGallery {
    /// Local tile.
    pub local: Rc<LocalTile>,
    /// Remote tiles.
    pub remote: Rc<Vec<RemoteVideoTile>>,
    /// Participant whose screen share takes the stage, if any. The local
    /// share wins over remote shares.
    pub screen_share: Option<ScreenShareOwner>,
}

/// Composes [`LocalTileSelector`] and [`RemoteVideoTilesSelector`].
///
/// Recomputes only when one of the two children produced a new output.
#[derive(Debug)]
pub struct VideoGallerySelector {
    local: Memoized<LocalTileSelector>,
    remote: Memoized<RemoteVideoTilesSelector>,
}

impl Default for VideoGallerySelector {
    fn default() -> Self {
        Self { local: Memoized::new(LocalTileSelector), remote: Memoized::new(RemoteVideoTilesSelector) }
    }
}

impl Selector for VideoGallerySelector {
    type Input = (Shared<LocalTile>, Shared<Vec<RemoteVideoTile>>);
    type Output = VideoGallery;

    fn input(&self, state: &AdapterState) -> Self::Input {
        (Shared(self.local.select(state)), Shared(self.remote.select(state)))
    }

    fn compute(&self, (local, remote): &Self::Input) -> VideoGallery {
        let screen_share = if local.is_screen_sharing_on {
            Some(ScreenShareOwner::Local)
        } else {
            remote
                .iter()
                .find(|tile| tile.screen_share.is_some())
                .map(|tile| ScreenShareOwner::Remote(tile.identifier.clone()))
        };
        VideoGallery { local: Rc::clone(&local.0), remote: Rc::clone(&remote.0), screen_share }
    }
}
