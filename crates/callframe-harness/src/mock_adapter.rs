//! In-memory calling SDK.
//!
//! [`MockCallAdapter`] implements [`CallAdapter`] over a [`StateStore`]. It
//! has two faces:
//!
//! - **UI side**: the [`CallAdapter`] actions a composite invokes. Each one is
//!   appended to an action log, may be failed by injection, and otherwise
//!   validates against the current snapshot before mutating it.
//! - **SDK side**: plain methods (`participant_joins`, `connect`, `end_call`,
//!   ...) that stand in for events the calling service pushes.
//!
//! In deferred mode action effects are queued instead of applied, so tests
//! can observe the window between an action resolving and its snapshot
//! arriving. [`MockCallAdapter::flush`] applies the queue.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, VecDeque},
    fmt,
    rc::Rc,
};

use callframe_core::{
    AdapterError, AdapterState, BreakoutRoomState, CallAdapter, CallEndReason, CallId, CallState,
    CallStatus, Capabilities, DeviceAccess, DeviceInfo, DeviceManagerState, ErrorTarget,
    JoinCallOptions, ListenerError, LocalVideoStreamState, MediaKind, PageStateMachine,
    PageTrigger, ParticipantConnectionState, PermissionConstraints, RemoteParticipantState,
    StateStore, StreamView, SubscriptionId, Timestamp, TransferState, VideoStreamState,
    ViewOptions,
};

use crate::ManualClock;

/// An action invoked through [`CallAdapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    /// `join_call`
    JoinCall(JoinCallOptions),
    /// `leave_call`
    LeaveCall {
        /// End the call for everyone.
        for_everyone: bool,
    },
    /// `start_camera`
    StartCamera,
    /// `stop_camera`
    StopCamera,
    /// `mute`
    Mute,
    /// `unmute`
    Unmute,
    /// `start_screen_share`
    StartScreenShare,
    /// `stop_screen_share`
    StopScreenShare,
    /// `create_stream_view`
    CreateStreamView {
        /// Remote participant, `None` for the local camera.
        participant: Option<String>,
    },
    /// `dispose_stream_view`
    DisposeStreamView {
        /// Remote participant, `None` for the local camera.
        participant: Option<String>,
    },
    /// `remove_participant`
    RemoveParticipant(String),
    /// `set_camera`
    SetCamera(String),
    /// `set_microphone`
    SetMicrophone(String),
    /// `set_speaker`
    SetSpeaker(String),
    /// `ask_device_permission`
    AskDevicePermission(PermissionConstraints),
}

/// Number of permission requests issued per device kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionChecks {
    /// Requests that included the microphone.
    pub audio: usize,
    /// Requests that included the camera.
    pub video: usize,
}

type Mutation = Box<dyn FnOnce(&mut AdapterState)>;

fn mutation(apply: impl FnOnce(&mut AdapterState) + 'static) -> Mutation {
    Box::new(apply)
}

/// Device lists of a typical laptop with a USB camera and a headset.
pub fn sample_devices() -> DeviceManagerState {
    let cameras =
        vec![DeviceInfo::new("camera-front", "Front Camera"), DeviceInfo::new("camera-usb", "USB Camera")];
    let microphones = vec![
        DeviceInfo::new("mic-default", "Default Microphone"),
        DeviceInfo::new("mic-headset", "Headset Microphone"),
    ];
    let speakers =
        vec![DeviceInfo::new("speaker-default", "Default Speaker"), DeviceInfo::new("speaker-headset", "Headset")];
    DeviceManagerState {
        selected_camera: cameras.first().cloned(),
        selected_microphone: microphones.first().cloned(),
        selected_speaker: speakers.first().cloned(),
        cameras,
        microphones,
        speakers,
        is_speaker_selection_available: true,
        ..DeviceManagerState::default()
    }
}

/// In-memory [`CallAdapter`].
pub struct MockCallAdapter {
    store: StateStore,
    clock: ManualClock,
    actions: RefCell<Vec<AdapterCall>>,
    failures: RefCell<BTreeMap<ErrorTarget, AdapterError>>,
    deferred: Cell<bool>,
    pending: RefCell<VecDeque<Mutation>>,
    permission_checks: Cell<PermissionChecks>,
    grant: Cell<DeviceAccess>,
    next_call: Cell<u64>,
    next_stream: Cell<u32>,
}

impl fmt::Debug for MockCallAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockCallAdapter")
            .field("store", &self.store)
            .field("actions", &self.actions.borrow().len())
            .field("pending", &self.pending.borrow().len())
            .field("deferred", &self.deferred.get())
            .finish_non_exhaustive()
    }
}

impl MockCallAdapter {
    /// Adapter for a local user with [`sample_devices`] and default
    /// capabilities.
    pub fn local_user(user_id: &str, display_name: Option<&str>) -> Self {
        let state = AdapterState {
            devices: sample_devices(),
            ..AdapterState::new(user_id, display_name.map(str::to_owned))
        };
        Self::new(state, Capabilities::default())
    }

    /// Adapter starting from `initial` on a fresh clock.
    pub fn new(initial: AdapterState, capabilities: Capabilities) -> Self {
        Self::with_page_machine(initial, PageStateMachine::new(capabilities), ManualClock::new())
    }

    /// Adapter driving a preconfigured page machine on the given clock.
    pub fn with_page_machine(initial: AdapterState, pages: PageStateMachine, clock: ManualClock) -> Self {
        let store = StateStore::with_page_machine(initial, pages, Rc::new(clock.clone()));
        Self {
            store,
            clock,
            actions: RefCell::new(Vec::new()),
            failures: RefCell::new(BTreeMap::new()),
            deferred: Cell::new(false),
            pending: RefCell::new(VecDeque::new()),
            permission_checks: Cell::new(PermissionChecks::default()),
            grant: Cell::new(DeviceAccess { audio: true, video: true }),
            next_call: Cell::new(1),
            next_stream: Cell::new(1),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Clock shared with the store.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Actions invoked so far, oldest first.
    pub fn actions(&self) -> Vec<AdapterCall> {
        self.actions.borrow().clone()
    }

    /// Drain the action log.
    pub fn take_actions(&self) -> Vec<AdapterCall> {
        std::mem::take(&mut *self.actions.borrow_mut())
    }

    /// Make the next invocation of `target` fail with `error`.
    pub fn fail_next(&self, target: ErrorTarget, error: AdapterError) {
        self.failures.borrow_mut().insert(target, error);
    }

    /// Queue action effects instead of applying them.
    pub fn set_deferred(&self, deferred: bool) {
        self.deferred.set(deferred);
    }

    /// Number of queued action effects.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Apply queued action effects in order. Returns how many were applied.
    pub fn flush(&self) -> usize {
        let mut applied = 0;
        while let Some(next) = self.pop_pending() {
            self.store.update(next);
            applied += 1;
        }
        applied
    }

    fn pop_pending(&self) -> Option<Mutation> {
        self.pending.borrow_mut().pop_front()
    }

    /// Permission requests issued so far.
    pub fn permission_checks(&self) -> PermissionChecks {
        self.permission_checks.get()
    }

    /// What the platform answers to future permission requests.
    pub fn set_device_grant(&self, grant: DeviceAccess) {
        self.grant.set(grant);
    }

    /// Join synchronously. [`CallAdapter::join_call`] awaits this.
    pub fn join_now(&self, options: JoinCallOptions) -> Result<(), AdapterError> {
        let id = CallId::new(format!("call-{}", self.next_call.get()));
        let requires_admission = self.store.state().requires_admission();
        let effect = self.attempt(ErrorTarget::JoinCall, AdapterCall::JoinCall(options), |state, now| {
            if let Some(call) = state.call.as_ref().filter(|call| !call.status.is_terminated()) {
                return Err(AdapterError::CallInProgress(call.id.clone()));
            }
            let camera = state.devices.selected_camera.clone().filter(|_| options.camera_on);
            Ok(mutation(move |state| {
                let mut call = CallState::new(id, CallStatus::Connecting, now);
                call.is_muted = !options.microphone_on;
                if let Some(source) = camera {
                    call.local_video_streams.push(LocalVideoStreamState {
                        source,
                        media_kind: MediaKind::Video,
                        view: None,
                    });
                }
                state.devices.unparented_views.clear();
                state.call = Some(call);
            }))
        })?;

        self.next_call.set(self.next_call.get() + 1);
        self.store.trigger(PageTrigger::Join { requires_admission });
        self.apply(effect);
        Ok(())
    }

    /// Leave synchronously. [`CallAdapter::leave_call`] awaits this.
    pub fn leave_now(&self, for_everyone: bool) -> Result<(), AdapterError> {
        let effect = self.attempt(ErrorTarget::LeaveCall, AdapterCall::LeaveCall { for_everyone }, |state, now| {
            if state.call.is_none() {
                return Err(AdapterError::NoActiveCall);
            }
            Ok(mutation(move |state| end_active_call(state, CallEndReason::new(0, 0), now)))
        })?;

        self.store.trigger(PageTrigger::End);
        self.apply(effect);
        Ok(())
    }

    /// Mark the configured call as a Teams meeting or a room with a waiting
    /// room. Both require admission.
    pub fn set_call_kind(&self, teams: bool, rooms: bool) {
        self.store.update(|state| {
            state.is_teams_call = teams;
            state.is_rooms_call = rooms;
        });
    }

    /// The call was parked in the lobby.
    pub fn enter_lobby(&self) -> bool {
        self.update_call(|call| call.status = CallStatus::InLobby)
    }

    /// The call connected (or the organizer admitted the user).
    pub fn connect(&self) -> bool {
        self.update_call(|call| call.status = CallStatus::Connected)
    }

    /// The local user put the call on hold.
    pub fn hold(&self) -> bool {
        self.update_call(|call| call.status = CallStatus::LocalHold)
    }

    /// The remote side put the call on hold.
    pub fn remote_hold(&self) -> bool {
        self.update_call(|call| call.status = CallStatus::RemoteHold)
    }

    /// The call resumed from hold.
    pub fn resume(&self) -> bool {
        self.update_call(|call| call.status = CallStatus::Connected)
    }

    /// The SDK started tearing the call down.
    pub fn begin_disconnect(&self) -> bool {
        self.update_call(|call| call.status = CallStatus::Disconnecting)
    }

    /// A transfer to `target` was requested.
    pub fn request_transfer(&self, target: &str) -> bool {
        let target = target.to_owned();
        self.update_call(|call| call.transfer = Some(TransferState { target, accepted: false }))
    }

    /// The pending transfer was accepted.
    pub fn accept_transfer(&self) -> bool {
        self.update_call(|call| {
            let transfer = call.transfer.get_or_insert_with(TransferState::default);
            transfer.accepted = true;
        })
    }

    /// The local user was assigned to a breakout room.
    pub fn assign_breakout_room(&self, room_name: &str) -> bool {
        let room_name = room_name.to_owned();
        self.update_call(|call| call.breakout_room = Some(BreakoutRoomState { room_name, closed: false }))
    }

    /// The organizer closed the breakout room.
    pub fn close_breakout_room(&self) -> bool {
        self.update_call(|call| {
            if let Some(room) = call.breakout_room.as_mut() {
                room.closed = true;
            }
        })
    }

    /// Network diagnostics changed.
    pub fn set_network_reconnecting(&self, reconnecting: bool) -> bool {
        self.update_call(|call| call.diagnostics.network_reconnecting = reconnecting)
    }

    /// The call ended on the service side with `reason`.
    pub fn end_call(&self, reason: CallEndReason) -> bool {
        if self.store.state().call.is_none() {
            return false;
        }
        let now = self.store.now();
        self.store.update(|state| end_active_call(state, reason, now));
        true
    }

    /// A remote participant connected. Returns false without a call or if
    /// the participant is already present.
    pub fn participant_joins(&self, identifier: &str, display_name: Option<&str>) -> bool {
        self.insert_participant(identifier, display_name, ParticipantConnectionState::Connected)
    }

    /// A remote participant is waiting in the lobby.
    pub fn participant_waits_in_lobby(&self, identifier: &str, display_name: Option<&str>) -> bool {
        self.insert_participant(identifier, display_name, ParticipantConnectionState::InLobby)
    }

    /// A remote participant changed connection state.
    pub fn set_participant_state(&self, identifier: &str, connection: ParticipantConnectionState) -> bool {
        self.update_participant(identifier, |participant| participant.state = connection)
    }

    /// A remote participant left the call.
    pub fn participant_leaves(&self, identifier: &str) -> bool {
        let present = self
            .store
            .state()
            .call
            .as_ref()
            .is_some_and(|call| call.remote_participants.contains_key(identifier));
        if present {
            self.store.update(|state| {
                if let Some(call) = state.call.as_mut() {
                    call.remote_participants.remove(identifier);
                }
            });
        }
        present
    }

    /// A remote participant's display name arrived or changed.
    pub fn rename_participant(&self, identifier: &str, display_name: Option<&str>) -> bool {
        let display_name = display_name.map(str::to_owned);
        self.update_participant(identifier, |participant| participant.display_name = display_name)
    }

    /// A remote participant muted or unmuted.
    pub fn set_participant_muted(&self, identifier: &str, muted: bool) -> bool {
        self.update_participant(identifier, |participant| participant.is_muted = muted)
    }

    /// A remote participant started or stopped speaking.
    pub fn set_participant_speaking(&self, identifier: &str, speaking: bool) -> bool {
        self.update_participant(identifier, |participant| participant.is_speaking = speaking)
    }

    /// A remote participant started or stopped sending camera video.
    pub fn set_participant_video(&self, identifier: &str, available: bool) -> bool {
        let next_id = self.next_stream.get();
        let created = self.update_participant(identifier, |participant| {
            let stream = participant
                .video_streams
                .values_mut()
                .find(|stream| stream.media_kind == MediaKind::Video);
            match stream {
                Some(stream) => stream.is_available = available,
                None => {
                    participant.video_streams.insert(next_id, VideoStreamState {
                        id: next_id,
                        media_kind: MediaKind::Video,
                        is_available: available,
                        view: None,
                    });
                },
            }
        });
        if created {
            self.next_stream.set(next_id + 1);
        }
        created
    }

    fn attempt(
        &self,
        target: ErrorTarget,
        call: AdapterCall,
        plan: impl FnOnce(&AdapterState, Timestamp) -> Result<Mutation, AdapterError>,
    ) -> Result<Mutation, AdapterError> {
        tracing::debug!(?call, "adapter action");
        self.actions.borrow_mut().push(call);

        let injected = self.failures.borrow_mut().remove(&target);
        let result = match injected {
            Some(error) => Err(error),
            None => plan(&self.store.state(), self.store.now()),
        };
        self.store.track(target, result)
    }

    fn perform(
        &self,
        target: ErrorTarget,
        call: AdapterCall,
        plan: impl FnOnce(&AdapterState, Timestamp) -> Result<Mutation, AdapterError>,
    ) -> Result<(), AdapterError> {
        let effect = self.attempt(target, call, plan)?;
        self.apply(effect);
        Ok(())
    }

    fn apply(&self, effect: Mutation) {
        if self.deferred.get() {
            self.pending.borrow_mut().push_back(effect);
        } else {
            self.store.update(effect);
        }
    }

    fn update_call(&self, change: impl FnOnce(&mut CallState)) -> bool {
        if self.store.state().call.is_none() {
            tracing::debug!("sdk event without an active call dropped");
            return false;
        }
        self.store.update(|state| {
            if let Some(call) = state.call.as_mut() {
                change(call);
            }
        });
        true
    }

    fn update_participant(&self, identifier: &str, change: impl FnOnce(&mut RemoteParticipantState)) -> bool {
        let known = self
            .store
            .state()
            .call
            .as_ref()
            .is_some_and(|call| call.remote_participants.contains_key(identifier));
        if known {
            self.update_call(|call| {
                if let Some(participant) = call.remote_participants.get_mut(identifier) {
                    change(participant);
                }
            });
        }
        known
    }

    fn insert_participant(
        &self,
        identifier: &str,
        display_name: Option<&str>,
        connection: ParticipantConnectionState,
    ) -> bool {
        let Some(call) = self.store.state().call.clone() else {
            return false;
        };
        if call.remote_participants.contains_key(identifier) {
            return false;
        }
        let mut participant = RemoteParticipantState::connected(identifier, display_name.map(str::to_owned));
        participant.state = connection;
        self.update_call(|call| {
            call.remote_participants.insert(participant.identifier.clone(), participant);
        })
    }

    fn set_muted(&self, target: ErrorTarget, call: AdapterCall, muted: bool) -> Result<(), AdapterError> {
        self.perform(target, call, |state, _| {
            let denied = state.devices.device_access.is_some_and(|access| !access.audio);
            if !muted && denied {
                return Err(AdapterError::PermissionDenied);
            }
            Ok(mutation(move |state| match state.call.as_mut() {
                Some(call) => call.is_muted = muted,
                None => state.is_local_preview_microphone_enabled = !muted,
            }))
        })
    }

    fn set_screen_share(&self, target: ErrorTarget, call: AdapterCall, on: bool) -> Result<(), AdapterError> {
        self.perform(target, call, |state, _| {
            if !state.call_status().is_in_call() {
                return Err(AdapterError::NoActiveCall);
            }
            Ok(mutation(move |state| {
                if let Some(call) = state.call.as_mut() {
                    call.is_screen_sharing_on = on;
                }
            }))
        })
    }

    fn select_device(
        &self,
        target: ErrorTarget,
        device: DeviceInfo,
        known: impl FnOnce(&DeviceManagerState) -> &[DeviceInfo],
        select: impl FnOnce(&mut AdapterState, DeviceInfo) + 'static,
    ) -> Result<(), AdapterError> {
        let call = match target {
            ErrorTarget::SetCamera => AdapterCall::SetCamera(device.id.clone()),
            ErrorTarget::SetMicrophone => AdapterCall::SetMicrophone(device.id.clone()),
            _ => AdapterCall::SetSpeaker(device.id.clone()),
        };
        self.perform(target, call, |state, _| {
            if !known(&state.devices).contains(&device) {
                return Err(AdapterError::DeviceNotFound(device.id));
            }
            Ok(mutation(move |state| select(state, device)))
        })
    }
}

fn end_active_call(state: &mut AdapterState, reason: CallEndReason, now: Timestamp) {
    if let Some(mut call) = state.call.take() {
        call.status = CallStatus::Disconnected;
        call.end_reason = Some(reason);
        call.end_time = Some(now);
        call.local_video_streams.clear();
        state.ended_call = Some(call);
    }
}

fn set_local_views(state: &mut AdapterState, view: Option<StreamView>) {
    let streams = state
        .call
        .iter_mut()
        .flat_map(|call| call.local_video_streams.iter_mut())
        .chain(state.devices.unparented_views.iter_mut())
        .filter(|stream| stream.media_kind == MediaKind::Video);
    for stream in streams {
        stream.view = view;
    }
}

fn set_remote_view(state: &mut AdapterState, participant: &str, view: Option<StreamView>) {
    let stream = state
        .call
        .as_mut()
        .and_then(|call| call.remote_participants.get_mut(participant))
        .and_then(|participant| {
            participant.video_streams.values_mut().find(|stream| stream.media_kind == MediaKind::Video)
        });
    if let Some(stream) = stream {
        stream.view = view;
    }
}

impl CallAdapter for MockCallAdapter {
    fn get_state(&self) -> Rc<AdapterState> {
        self.store.state()
    }

    fn on_state_change(
        &self,
        listener: impl Fn(&Rc<AdapterState>) -> Result<(), ListenerError> + 'static,
    ) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    fn off_state_change(&self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    fn navigate(&self, trigger: PageTrigger) {
        self.store.trigger(trigger);
    }

    fn clear_error(&self, target: ErrorTarget) {
        self.store.clear_error(target);
    }

    async fn join_call(&self, options: JoinCallOptions) -> Result<(), AdapterError> {
        self.join_now(options)
    }

    async fn leave_call(&self, for_everyone: bool) -> Result<(), AdapterError> {
        self.leave_now(for_everyone)
    }

    async fn start_camera(&self) -> Result<(), AdapterError> {
        self.perform(ErrorTarget::StartCamera, AdapterCall::StartCamera, |state, _| {
            if state.devices.device_access.is_some_and(|access| !access.video) {
                return Err(AdapterError::PermissionDenied);
            }
            let source = state
                .devices
                .selected_camera
                .clone()
                .ok_or_else(|| AdapterError::DeviceNotFound("camera".into()))?;
            Ok(mutation(move |state| {
                let stream = LocalVideoStreamState { source, media_kind: MediaKind::Video, view: None };
                match state.call.as_mut() {
                    Some(call) => {
                        if !call.is_camera_on() {
                            call.local_video_streams.push(stream);
                        }
                    },
                    None => {
                        if state.devices.unparented_views.is_empty() {
                            state.devices.unparented_views.push(stream);
                        }
                    },
                }
            }))
        })
    }

    async fn stop_camera(&self) -> Result<(), AdapterError> {
        self.perform(ErrorTarget::StopCamera, AdapterCall::StopCamera, |_, _| {
            Ok(mutation(|state| {
                if let Some(call) = state.call.as_mut() {
                    call.local_video_streams.retain(|stream| stream.media_kind != MediaKind::Video);
                }
                state.devices.unparented_views.clear();
            }))
        })
    }

    async fn mute(&self) -> Result<(), AdapterError> {
        self.set_muted(ErrorTarget::Mute, AdapterCall::Mute, true)
    }

    async fn unmute(&self) -> Result<(), AdapterError> {
        self.set_muted(ErrorTarget::Unmute, AdapterCall::Unmute, false)
    }

    async fn start_screen_share(&self) -> Result<(), AdapterError> {
        self.set_screen_share(ErrorTarget::StartScreenShare, AdapterCall::StartScreenShare, true)
    }

    async fn stop_screen_share(&self) -> Result<(), AdapterError> {
        self.set_screen_share(ErrorTarget::StopScreenShare, AdapterCall::StopScreenShare, false)
    }

    async fn create_stream_view(&self, participant: Option<String>, options: ViewOptions) -> Result<(), AdapterError> {
        let view = StreamView { scaling_mode: options.scaling_mode, is_mirrored: options.is_mirrored };
        let call = AdapterCall::CreateStreamView { participant: participant.clone() };
        self.perform(ErrorTarget::CreateStreamView, call, |state, _| match participant {
            None => {
                let in_call = state.call.as_ref().is_some_and(CallState::is_camera_on);
                if !in_call && state.devices.unparented_views.is_empty() {
                    return Err(AdapterError::StreamUnavailable("local camera".into()));
                }
                Ok(mutation(move |state| set_local_views(state, Some(view))))
            },
            Some(identifier) => {
                let call = state.call.as_ref().ok_or(AdapterError::NoActiveCall)?;
                let remote = call
                    .remote_participants
                    .get(&identifier)
                    .ok_or_else(|| AdapterError::ParticipantNotFound(identifier.clone()))?;
                let available = remote
                    .video_streams
                    .values()
                    .any(|stream| stream.media_kind == MediaKind::Video && stream.is_available);
                if !available {
                    return Err(AdapterError::StreamUnavailable(identifier));
                }
                Ok(mutation(move |state| set_remote_view(state, &identifier, Some(view))))
            },
        })
    }

    async fn dispose_stream_view(&self, participant: Option<String>) -> Result<(), AdapterError> {
        let call = AdapterCall::DisposeStreamView { participant: participant.clone() };
        self.perform(ErrorTarget::DisposeStreamView, call, |_, _| {
            Ok(mutation(move |state| match participant {
                None => set_local_views(state, None),
                Some(identifier) => set_remote_view(state, &identifier, None),
            }))
        })
    }

    async fn remove_participant(&self, participant: String) -> Result<(), AdapterError> {
        let call = AdapterCall::RemoveParticipant(participant.clone());
        self.perform(ErrorTarget::RemoveParticipant, call, |state, _| {
            let call = state.call.as_ref().ok_or(AdapterError::NoActiveCall)?;
            if !call.remote_participants.contains_key(&participant) {
                return Err(AdapterError::ParticipantNotFound(participant));
            }
            Ok(mutation(move |state| {
                if let Some(call) = state.call.as_mut() {
                    call.remote_participants.remove(&participant);
                }
            }))
        })
    }

    async fn set_camera(&self, device: DeviceInfo) -> Result<(), AdapterError> {
        self.select_device(ErrorTarget::SetCamera, device, |devices| &devices.cameras, |state, device| {
            let streams = state
                .call
                .iter_mut()
                .flat_map(|call| call.local_video_streams.iter_mut())
                .chain(state.devices.unparented_views.iter_mut())
                .filter(|stream| stream.media_kind == MediaKind::Video);
            for stream in streams {
                stream.source = device.clone();
            }
            state.devices.selected_camera = Some(device);
        })
    }

    async fn set_microphone(&self, device: DeviceInfo) -> Result<(), AdapterError> {
        self.select_device(ErrorTarget::SetMicrophone, device, |devices| &devices.microphones, |state, device| {
            state.devices.selected_microphone = Some(device);
        })
    }

    async fn set_speaker(&self, device: DeviceInfo) -> Result<(), AdapterError> {
        self.select_device(ErrorTarget::SetSpeaker, device, |devices| &devices.speakers, |state, device| {
            state.devices.selected_speaker = Some(device);
        })
    }

    async fn ask_device_permission(&self, constraints: PermissionConstraints) -> Result<DeviceAccess, AdapterError> {
        let mut checks = self.permission_checks.get();
        checks.audio += usize::from(constraints.audio);
        checks.video += usize::from(constraints.video);
        self.permission_checks.set(checks);

        let grant = self.grant.get();
        let access = DeviceAccess {
            audio: constraints.audio && grant.audio,
            video: constraints.video && grant.video,
        };
        let call = AdapterCall::AskDevicePermission(constraints);
        self.perform(ErrorTarget::AskDevicePermission, call, |_, _| {
            Ok(mutation(move |state| {
                let previous = state.devices.device_access.unwrap_or_default();
                state.devices.device_access = Some(DeviceAccess {
                    audio: if constraints.audio { access.audio } else { previous.audio },
                    video: if constraints.video { access.video } else { previous.video },
                });
            }))
        })?;
        Ok(access)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use callframe_core::CompositePage;

    use super::*;

    fn adapter() -> MockCallAdapter {
        MockCallAdapter::local_user("8:acs:me", Some("Me"))
    }

    #[tokio::test]
    async fn join_then_connect_shows_call_page() {
        let adapter = adapter();
        adapter.join_call(JoinCallOptions { microphone_on: true, camera_on: true }).await.unwrap();
        assert_eq!(adapter.get_state().page, CompositePage::Call);

        adapter.connect();
        let state = adapter.get_state();
        let call = state.call.as_ref().unwrap();
        assert_eq!(call.status, CallStatus::Connected);
        assert!(!call.is_muted);
        assert!(call.is_camera_on());
    }

    #[tokio::test]
    async fn teams_join_waits_in_lobby_until_admitted() {
        let adapter = adapter();
        adapter.set_call_kind(true, false);
        adapter.join_call(JoinCallOptions::default()).await.unwrap();
        assert_eq!(adapter.get_state().page, CompositePage::Lobby);

        adapter.enter_lobby();
        assert_eq!(adapter.get_state().page, CompositePage::Lobby);

        adapter.connect();
        assert_eq!(adapter.get_state().page, CompositePage::Call);
    }

    #[tokio::test]
    async fn second_join_is_rejected_and_recorded() {
        let adapter = adapter();
        adapter.join_call(JoinCallOptions::default()).await.unwrap();
        let err = adapter.join_call(JoinCallOptions::default()).await.unwrap_err();

        assert_eq!(err, AdapterError::CallInProgress(CallId::new("call-1")));
        assert!(adapter.get_state().latest_errors.contains_key(&ErrorTarget::JoinCall));
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let adapter = adapter();
        adapter.fail_next(ErrorTarget::Mute, AdapterError::Network("timeout".into()));

        assert_eq!(adapter.mute().await, Err(AdapterError::Network("timeout".into())));
        assert_eq!(adapter.mute().await, Ok(()));
        assert_eq!(adapter.actions(), vec![AdapterCall::Mute, AdapterCall::Mute]);
    }

    #[tokio::test]
    async fn deferred_effects_wait_for_flush() {
        let adapter = adapter();
        adapter.join_call(JoinCallOptions::default()).await.unwrap();
        adapter.connect();
        adapter.set_deferred(true);

        adapter.mute().await.unwrap();
        assert!(!adapter.get_state().call.as_ref().unwrap().is_muted);
        assert_eq!(adapter.pending_count(), 1);

        assert_eq!(adapter.flush(), 1);
        assert!(adapter.get_state().call.as_ref().unwrap().is_muted);
    }

    #[tokio::test]
    async fn mute_without_call_toggles_preview_microphone() {
        let adapter = adapter();
        adapter.unmute().await.unwrap();
        assert!(adapter.get_state().is_local_preview_microphone_enabled);
        adapter.mute().await.unwrap();
        assert!(!adapter.get_state().is_local_preview_microphone_enabled);
    }

    #[tokio::test]
    async fn permission_requests_are_counted_per_device() {
        let adapter = adapter();
        adapter.set_device_grant(DeviceAccess { audio: true, video: false });

        let access = adapter
            .ask_device_permission(PermissionConstraints { audio: true, video: true })
            .await
            .unwrap();
        assert_eq!(access, DeviceAccess { audio: true, video: false });
        assert_eq!(adapter.permission_checks(), PermissionChecks { audio: 1, video: 1 });
        assert_eq!(adapter.start_camera().await, Err(AdapterError::PermissionDenied));
    }

    #[tokio::test]
    async fn leaving_goes_to_configuration() {
        let adapter = adapter();
        adapter.join_call(JoinCallOptions::default()).await.unwrap();
        adapter.connect();
        adapter.leave_call(false).await.unwrap();

        let state = adapter.get_state();
        assert!(state.call.is_none());
        assert_eq!(state.page, CompositePage::Configuration);
        assert_eq!(state.ended_call.as_ref().map(|call| call.id.as_str()), Some("call-1"));
    }

    #[tokio::test]
    async fn removal_by_service_routes_to_removed_page() {
        let adapter = adapter();
        adapter.join_call(JoinCallOptions::default()).await.unwrap();
        adapter.connect();
        adapter.end_call(CallEndReason::new(0, 5300));
        assert_eq!(adapter.get_state().page, CompositePage::RemovedFromCall);
    }

    #[tokio::test]
    async fn remote_view_needs_available_stream() {
        let adapter = adapter();
        adapter.join_call(JoinCallOptions::default()).await.unwrap();
        adapter.connect();
        adapter.participant_joins("8:acs:zeta", Some("zeta"));

        let err = adapter.create_stream_view(Some("8:acs:zeta".into()), ViewOptions::default()).await;
        assert_eq!(err, Err(AdapterError::StreamUnavailable("8:acs:zeta".into())));

        adapter.set_participant_video("8:acs:zeta", true);
        adapter.create_stream_view(Some("8:acs:zeta".into()), ViewOptions::default()).await.unwrap();
        let state = adapter.get_state();
        let zeta = &state.call.as_ref().unwrap().remote_participants["8:acs:zeta"];
        assert!(zeta.video_streams.values().all(|stream| stream.view.is_some()));
    }

    #[test]
    fn sdk_events_without_call_are_dropped() {
        let adapter = adapter();
        assert!(!adapter.participant_joins("8:acs:a", None));
        assert!(!adapter.connect());
        assert!(!adapter.end_call(CallEndReason::new(0, 0)));
    }
}
