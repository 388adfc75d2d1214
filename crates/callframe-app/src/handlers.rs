//! Stable callbacks bound to an adapter.
//!
//! [`CallHandlers`] wraps one adapter instance. Every callback invokes
//! exactly one adapter action and returns its future without touching the
//! result, so failures reach the caller and `latest_errors` alike.
//!
//! Toggle callbacks decide between their two actions from the snapshot at
//! the moment they are called, never from a value captured at render time.
//!
//! [`HandlerCache`] hands out the same `Rc<CallHandlers>` for as long as it
//! is asked about the same adapter instance.

use std::{cell::RefCell, fmt, future::Future, rc::Rc};

use callframe_core::{
    AdapterError, AdapterState, CallAdapter, DeviceAccess, DeviceInfo, ErrorTarget, JoinCallOptions,
    PageTrigger, PermissionConstraints, ViewOptions,
};

/// Whether the local microphone is currently muted, in call or on the
/// configuration screen.
fn microphone_muted(state: &AdapterState) -> bool {
    state.call.as_ref().map_or(!state.is_local_preview_microphone_enabled, |call| call.is_muted)
}

/// Whether the local camera is currently live, in call or as preview.
fn camera_on(state: &AdapterState) -> bool {
    state.call.as_ref().map_or(!state.devices.unparented_views.is_empty(), |call| call.is_camera_on())
}

fn screen_sharing(state: &AdapterState) -> bool {
    state.call.as_ref().is_some_and(|call| call.is_screen_sharing_on)
}

/// Callbacks bound to one adapter instance.
pub struct CallHandlers<A> {
    adapter: Rc<A>,
}

impl<A> fmt::Debug for CallHandlers<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallHandlers").finish_non_exhaustive()
    }
}

impl<A: CallAdapter> CallHandlers<A> {
    /// Bind callbacks to `adapter`.
    pub fn new(adapter: Rc<A>) -> Self {
        Self { adapter }
    }

    /// The bound adapter.
    pub fn adapter(&self) -> &Rc<A> {
        &self.adapter
    }

    /// Join the call.
    pub fn on_join_call(&self, options: JoinCallOptions) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.join_call(options)
    }

    /// Leave the call.
    pub fn on_leave_call(&self, for_everyone: bool) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.leave_call(for_everyone)
    }

    /// Mute the microphone.
    pub fn on_mute(&self) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.mute()
    }

    /// Unmute the microphone.
    pub fn on_unmute(&self) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.unmute()
    }

    /// Unmute if currently muted, mute otherwise.
    pub fn on_toggle_microphone(&self) -> impl Future<Output = Result<(), AdapterError>> {
        let unmute = microphone_muted(&self.adapter.get_state());
        async move { if unmute { self.adapter.unmute().await } else { self.adapter.mute().await } }
    }

    /// Start the camera.
    pub fn on_start_camera(&self) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.start_camera()
    }

    /// Stop the camera.
    pub fn on_stop_camera(&self) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.stop_camera()
    }

    /// Stop the camera if it is live, start it otherwise.
    pub fn on_toggle_camera(&self) -> impl Future<Output = Result<(), AdapterError>> {
        let stop = camera_on(&self.adapter.get_state());
        async move { if stop { self.adapter.stop_camera().await } else { self.adapter.start_camera().await } }
    }

    /// Stop sharing if sharing, start otherwise.
    pub fn on_toggle_screen_share(&self) -> impl Future<Output = Result<(), AdapterError>> {
        let stop = screen_sharing(&self.adapter.get_state());
        async move {
            if stop { self.adapter.stop_screen_share().await } else { self.adapter.start_screen_share().await }
        }
    }

    /// Create a renderer view for `participant`, or the local camera.
    pub fn on_create_stream_view(
        &self,
        participant: Option<String>,
        options: ViewOptions,
    ) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.create_stream_view(participant, options)
    }

    /// Dispose a renderer view.
    pub fn on_dispose_stream_view(&self, participant: Option<String>) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.dispose_stream_view(participant)
    }

    /// Remove a participant from the call.
    pub fn on_remove_participant(&self, participant: String) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.remove_participant(participant)
    }

    /// Select a camera.
    pub fn on_select_camera(&self, device: DeviceInfo) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.set_camera(device)
    }

    /// Select a microphone.
    pub fn on_select_microphone(&self, device: DeviceInfo) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.set_microphone(device)
    }

    /// Select a speaker.
    pub fn on_select_speaker(&self, device: DeviceInfo) -> impl Future<Output = Result<(), AdapterError>> {
        self.adapter.set_speaker(device)
    }

    /// Ask for device access.
    pub fn on_ask_device_permission(
        &self,
        constraints: PermissionConstraints,
    ) -> impl Future<Output = Result<DeviceAccess, AdapterError>> {
        self.adapter.ask_device_permission(constraints)
    }

    /// Dismiss one error bar entry.
    pub fn on_dismiss_error(&self, target: ErrorTarget) {
        self.adapter.clear_error(target);
    }

    /// Leave an error page.
    pub fn on_acknowledge_error(&self) {
        self.adapter.navigate(PageTrigger::Acknowledge);
    }

    /// Show the dialpad.
    pub fn on_open_dialpad(&self) {
        self.adapter.navigate(PageTrigger::OpenDialpad);
    }

    /// Hide the dialpad.
    pub fn on_close_dialpad(&self) {
        self.adapter.navigate(PageTrigger::CloseDialpad);
    }
}

/// Per-adapter memo of [`CallHandlers`].
pub struct HandlerCache<A> {
    cached: RefCell<Option<Rc<CallHandlers<A>>>>,
}

impl<A> fmt::Debug for HandlerCache<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCache").field("cached", &self.cached.borrow().is_some()).finish()
    }
}

impl<A> Default for HandlerCache<A> {
    fn default() -> Self {
        Self { cached: RefCell::new(None) }
    }
}

impl<A: CallAdapter> HandlerCache<A> {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handlers for `adapter`. Reference-equal to the previous result if
    /// `adapter` is the same instance.
    pub fn handlers(&self, adapter: &Rc<A>) -> Rc<CallHandlers<A>> {
        if let Some(cached) = &*self.cached.borrow()
            && Rc::ptr_eq(cached.adapter(), adapter)
        {
            return Rc::clone(cached);
        }

        let handlers = Rc::new(CallHandlers::new(Rc::clone(adapter)));
        *self.cached.borrow_mut() = Some(Rc::clone(&handlers));
        handlers
    }
}
