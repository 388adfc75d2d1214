//! Adapter trait for the calling SDK boundary.
//!
//! The [`CallAdapter`] trait decouples composites from a specific calling
//! SDK. An implementation owns a [`crate::StateStore`], translates SDK events
//! into store updates, and exposes the SDK's imperative actions.
//!
//! # Action semantics
//!
//! - Every action is asynchronous and resolves to `Err` when the SDK rejects
//!   it. The implementation records the failure in `latest_errors` before
//!   returning it.
//! - The effect of an action is observed only through a later snapshot
//!   delivered to state listeners. Callers must not assume the snapshot has
//!   changed when the action future resolves.
//! - Actions are never cancelled. A future that settles after its caller
//!   unsubscribed is harmless.
//!
//! # Implementations
//!
//! - **Harness**: `MockCallAdapter` drives an in-memory call for tests and
//!   simulation.
//! - **Production**: wraps a real calling SDK client.

use std::{future::Future, rc::Rc};

use crate::{
    AdapterError, AdapterState, DeviceAccess, DeviceInfo, ErrorTarget, ListenerError, PageTrigger,
    ScalingMode, SubscriptionId,
};

/// Options for [`CallAdapter::join_call`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinCallOptions {
    /// Join with the microphone unmuted.
    pub microphone_on: bool,
    /// Join with the camera on.
    pub camera_on: bool,
}

/// Options for [`CallAdapter::create_stream_view`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewOptions {
    /// Scaling applied by the renderer.
    pub scaling_mode: ScalingMode,
    /// Mirror the rendered view.
    pub is_mirrored: bool,
}

/// Devices to request access for in [`CallAdapter::ask_device_permission`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionConstraints {
    /// Request microphone access.
    pub audio: bool,
    /// Request camera access.
    pub video: bool,
}

/// Imperative action surface and state access of a calling SDK.
///
/// Futures returned by actions are not `Send`: composites run on a single
/// UI thread.
pub trait CallAdapter {
    /// Current snapshot.
    fn get_state(&self) -> Rc<AdapterState>;

    /// Register a listener invoked with every new snapshot.
    fn on_state_change(
        &self,
        listener: impl Fn(&Rc<AdapterState>) -> Result<(), ListenerError> + 'static,
    ) -> SubscriptionId;

    /// Remove a listener. Returns false if it was not subscribed.
    fn off_state_change(&self, id: SubscriptionId) -> bool;

    /// Apply a page navigation trigger.
    fn navigate(&self, trigger: PageTrigger);

    /// Clear one operation's entry in `latest_errors`.
    fn clear_error(&self, target: ErrorTarget);

    /// Join the configured call.
    fn join_call(&self, options: JoinCallOptions) -> impl Future<Output = Result<(), AdapterError>>;

    /// Leave the call, optionally ending it for everyone.
    fn leave_call(&self, for_everyone: bool) -> impl Future<Output = Result<(), AdapterError>>;

    /// Start the local camera (in call, or as a preview before joining).
    fn start_camera(&self) -> impl Future<Output = Result<(), AdapterError>>;

    /// Stop the local camera.
    fn stop_camera(&self) -> impl Future<Output = Result<(), AdapterError>>;

    /// Mute the local microphone.
    fn mute(&self) -> impl Future<Output = Result<(), AdapterError>>;

    /// Unmute the local microphone.
    fn unmute(&self) -> impl Future<Output = Result<(), AdapterError>>;

    /// Start sharing the screen.
    fn start_screen_share(&self) -> impl Future<Output = Result<(), AdapterError>>;

    /// Stop sharing the screen.
    fn stop_screen_share(&self) -> impl Future<Output = Result<(), AdapterError>>;

    /// Create a renderer view for a participant's video, or the local
    /// camera when `participant` is `None`.
    fn create_stream_view(
        &self,
        participant: Option<String>,
        options: ViewOptions,
    ) -> impl Future<Output = Result<(), AdapterError>>;

    /// Dispose a renderer view created with [`Self::create_stream_view`].
    fn dispose_stream_view(
        &self,
        participant: Option<String>,
    ) -> impl Future<Output = Result<(), AdapterError>>;

    /// Remove a remote participant from the call.
    fn remove_participant(&self, participant: String) -> impl Future<Output = Result<(), AdapterError>>;

    /// Select the camera.
    fn set_camera(&self, device: DeviceInfo) -> impl Future<Output = Result<(), AdapterError>>;

    /// Select the microphone.
    fn set_microphone(&self, device: DeviceInfo) -> impl Future<Output = Result<(), AdapterError>>;

    /// Select the speaker.
    fn set_speaker(&self, device: DeviceInfo) -> impl Future<Output = Result<(), AdapterError>>;

    /// Ask the platform for device access.
    fn ask_device_permission(
        &self,
        constraints: PermissionConstraints,
    ) -> impl Future<Output = Result<DeviceAccess, AdapterError>>;
}
