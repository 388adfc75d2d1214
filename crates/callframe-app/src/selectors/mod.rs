//! Selector catalogue.
//!
//! One selector per view component. [`CallSelectors`] bundles a memoized
//! instance of each for a mounted composite.

mod call;
mod devices;
mod errors;

pub use call::{
    CallStatusSelector, CallStatusView, ConnectedParticipantsSelector, LocalTile, LocalTileSelector,
    ParticipantItem, ParticipantListSelector, ParticipantListSlice, RemoteVideoTile,
    RemoteVideoTilesSelector, ScreenShareButton, ScreenShareButtonSelector, ScreenShareOwner,
    VideoGallery, VideoGallerySelector,
};
pub use devices::{
    CameraButton, CameraButtonSelector, CameraSlice, DevicePicker, DevicePickerSelector, LocalPreview,
    LocalPreviewSelector, MicrophoneButton, MicrophoneButtonSelector, MicrophoneSlice,
};
pub use errors::{ErrorBarMessage, ErrorBarSelector, ErrorBarSlice};

use crate::Memoized;

/// Memoized selectors for one composite.
#[derive(Debug)]
pub struct CallSelectors {
    /// Microphone button.
    pub microphone_button: Memoized<MicrophoneButtonSelector>,
    /// Camera button.
    pub camera_button: Memoized<CameraButtonSelector>,
    /// Screen share button.
    pub screen_share_button: Memoized<ScreenShareButtonSelector>,
    /// Device settings menu.
    pub device_picker: Memoized<DevicePickerSelector>,
    /// Configuration screen preview.
    pub local_preview: Memoized<LocalPreviewSelector>,
    /// Call status banner.
    pub call_status: Memoized<CallStatusSelector>,
    /// Participant list.
    pub participant_list: Memoized<ParticipantListSelector>,
    /// Present remote participants.
    pub connected_participants: Memoized<ConnectedParticipantsSelector>,
    /// Video gallery.
    pub video_gallery: Memoized<VideoGallerySelector>,
    /// Error bar.
    pub error_bar: Memoized<ErrorBarSelector>,
}

impl CallSelectors {
    /// Fresh selectors. `error_bar` is the configured error bar selector.
    pub fn new(error_bar: ErrorBarSelector) -> Self {
        Self {
            microphone_button: Memoized::new(MicrophoneButtonSelector),
            camera_button: Memoized::new(CameraButtonSelector),
            screen_share_button: Memoized::new(ScreenShareButtonSelector),
            device_picker: Memoized::new(DevicePickerSelector),
            local_preview: Memoized::new(LocalPreviewSelector),
            call_status: Memoized::new(CallStatusSelector),
            participant_list: Memoized::new(ParticipantListSelector),
            connected_participants: Memoized::new(ConnectedParticipantsSelector),
            video_gallery: Memoized::new(VideoGallerySelector::default()),
            error_bar: Memoized::new(error_bar),
        }
    }
}

impl Default for CallSelectors {
    fn default() -> Self {
        Self::new(ErrorBarSelector::default())
    }
}
