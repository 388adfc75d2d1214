//! Composite runtime.
//!
//! [`CallComposite`] wires one adapter to everything a call screen needs:
//! page tracking, memoized selectors, stable handlers, participant
//! announcements and the device permission flow.
//!
//! # Lifecycle
//!
//! 1. [`CallComposite::mount`] claims the session's [`CompositeContext`],
//!    subscribes to the adapter and queues the mount permission request.
//! 2. Every delivered snapshot updates the page, the announcer and the
//!    start-video gate. Resulting side effects are queued as
//!    [`CompositeAction`]s.
//! 3. [`CallComposite::process_pending`] runs queued actions against the
//!    adapter, logging failures.
//! 4. Unmounting (explicitly or by drop) unsubscribes and releases the
//!    context. Action futures still outstanding may settle afterwards; their
//!    snapshots reach nobody.

use std::{cell::RefCell, collections::VecDeque, fmt, rc::Rc};

use callframe_core::{
    AdapterState, CallAdapter, Capabilities, Clock, CompositeOptions, CompositePage, ListenerError,
    PageTransition, PermissionConstraints, SubscriptionId,
};

use crate::{
    AnnouncedParticipant, CallHandlers, CallSelectors, CompositeError, ErrorBarSelector, HandlerCache,
    ParticipantAnnouncer, StartVideo, StartVideoGate, mount_permission_request,
};

/// Holds the adapter of the active call session.
///
/// Independent view code reaches the adapter through this context. At most
/// one composite may be mounted on it at a time.
pub struct CompositeContext<A> {
    slot: RefCell<Option<Rc<A>>>,
}

impl<A> fmt::Debug for CompositeContext<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeContext").field("claimed", &self.is_claimed()).finish()
    }
}

impl<A> Default for CompositeContext<A> {
    fn default() -> Self {
        Self { slot: RefCell::new(None) }
    }
}

impl<A> CompositeContext<A> {
    /// Empty context.
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Adapter of the mounted composite.
    pub fn adapter(&self) -> Option<Rc<A>> {
        self.slot.borrow().clone()
    }

    /// Whether a composite is mounted.
    pub fn is_claimed(&self) -> bool {
        self.slot.borrow().is_some()
    }

    fn claim(&self, adapter: &Rc<A>) -> Result<(), CompositeError> {
        let mut slot = self.slot.borrow_mut();
        if slot.is_some() {
            return Err(CompositeError::SessionActive);
        }
        *slot = Some(Rc::clone(adapter));
        Ok(())
    }

    fn release(&self, adapter: &Rc<A>) {
        let mut slot = self.slot.borrow_mut();
        if slot.as_ref().is_some_and(|held| Rc::ptr_eq(held, adapter)) {
            *slot = None;
        }
    }
}

/// Side effect queued by the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeAction {
    /// Ask the platform for device access.
    AskDevicePermission(PermissionConstraints),
    /// Start the local camera.
    StartCamera,
}

/// State updated by the snapshot listener.
#[derive(Debug)]
struct Observed {
    page: CompositePage,
    transitions: Vec<PageTransition>,
    announcer: ParticipantAnnouncer,
    announcements: Vec<String>,
    start_video: StartVideoGate,
    pending: VecDeque<CompositeAction>,
}

impl Observed {
    fn observe(&mut self, snapshot: &AdapterState, present: &[AnnouncedParticipant]) {
        if snapshot.page != self.page {
            let transition = PageTransition { from: self.page, to: snapshot.page };
            tracing::info!(from = transition.from.as_str(), to = transition.to.as_str(), "page changed");
            self.transitions.push(transition);
            self.page = snapshot.page;
        }

        // Leaving the call is not a mass departure.
        if snapshot.call.is_none() {
            self.announcer.seed(&[]);
        } else {
            let text = self.announcer.update(present);
            if !text.is_empty() {
                self.announcements.push(text);
            }
        }

        if self.start_video.observe(snapshot.call_status()) {
            self.pending.push_back(CompositeAction::StartCamera);
        }
    }
}

/// A mounted call composite.
pub struct CallComposite<A: CallAdapter> {
    context: Rc<CompositeContext<A>>,
    adapter: Rc<A>,
    capabilities: Capabilities,
    selectors: Rc<CallSelectors>,
    handlers: HandlerCache<A>,
    observed: Rc<RefCell<Observed>>,
    subscription: Option<SubscriptionId>,
}

impl<A: CallAdapter> fmt::Debug for CallComposite<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallComposite")
            .field("capabilities", &self.capabilities)
            .field("subscription", &self.subscription)
            .finish_non_exhaustive()
    }
}

impl<A: CallAdapter> CallComposite<A> {
    /// Mount a composite for `adapter` on `context`.
    ///
    /// Participants already present are remembered without being announced.
    /// Device access is requested once, when pending actions are next
    /// processed.
    ///
    /// # Errors
    ///
    /// - `CompositeError::SessionActive` if another composite is mounted on
    ///   `context`
    pub fn mount(
        context: &Rc<CompositeContext<A>>,
        adapter: Rc<A>,
        options: &CompositeOptions,
        clock: &dyn Clock,
    ) -> Result<Self, CompositeError> {
        context.claim(&adapter)?;

        let capabilities = Capabilities::from_options(options);
        let error_bar = if capabilities.ignore_premount_errors() {
            ErrorBarSelector::ignoring_premount(clock.now())
        } else {
            ErrorBarSelector::default()
        };
        let selectors = Rc::new(CallSelectors::new(error_bar));

        let initial = adapter.get_state();
        let mut announcer = ParticipantAnnouncer::default();
        announcer.seed(&selectors.connected_participants.select(&initial));

        let mut pending = VecDeque::new();
        pending.push_back(CompositeAction::AskDevicePermission(mount_permission_request(&capabilities)));

        let observed = Rc::new(RefCell::new(Observed {
            page: initial.page,
            transitions: Vec::new(),
            announcer,
            announcements: Vec::new(),
            start_video: StartVideoGate::default(),
            pending,
        }));

        let listener_state = Rc::clone(&observed);
        let listener_selectors = Rc::clone(&selectors);
        let subscription = adapter.on_state_change(move |snapshot| {
            let mut observed = listener_state
                .try_borrow_mut()
                .map_err(|_| ListenerError::new("composite state is already borrowed"))?;
            let present = listener_selectors.connected_participants.select(snapshot);
            observed.observe(snapshot, &present);
            Ok(())
        });

        tracing::debug!(page = initial.page.as_str(), ?capabilities, "composite mounted");
        Ok(Self {
            context: Rc::clone(context),
            adapter,
            capabilities,
            selectors,
            handlers: HandlerCache::new(),
            observed,
            subscription: Some(subscription),
        })
    }

    /// The bound adapter.
    pub fn adapter(&self) -> &Rc<A> {
        &self.adapter
    }

    /// Page as of the last delivered snapshot.
    pub fn page(&self) -> CompositePage {
        self.observed.borrow().page
    }

    /// Capabilities computed at mount.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Memoized selectors.
    pub fn selectors(&self) -> &CallSelectors {
        &self.selectors
    }

    /// Handlers bound to the adapter. Reference-stable for the lifetime of
    /// the composite.
    pub fn handlers(&self) -> Rc<CallHandlers<A>> {
        self.handlers.handlers(&self.adapter)
    }

    /// Drain announcements produced since the last call, oldest first.
    pub fn take_announcements(&self) -> Vec<String> {
        std::mem::take(&mut self.observed.borrow_mut().announcements)
    }

    /// Drain page transitions observed since the last call, oldest first.
    pub fn take_page_transitions(&self) -> Vec<PageTransition> {
        std::mem::take(&mut self.observed.borrow_mut().transitions)
    }

    /// Start video now, or once the call is admitted if it is still
    /// connecting, ringing or waiting in the lobby.
    pub fn request_start_video(&self) -> StartVideo {
        let status = self.adapter.get_state().call_status();
        let mut observed = self.observed.borrow_mut();
        let decision = observed.start_video.request(status);
        if decision == StartVideo::Now {
            observed.pending.push_back(CompositeAction::StartCamera);
        }
        decision
    }

    /// Queued actions, oldest first.
    pub fn pending_actions(&self) -> Vec<CompositeAction> {
        self.observed.borrow().pending.iter().copied().collect()
    }

    /// Run queued actions in order, including any queued while running.
    /// Returns how many ran. Failures are logged; the adapter has already
    /// recorded them in `latest_errors`.
    pub async fn process_pending(&self) -> usize {
        let mut executed = 0;
        while let Some(action) = self.pop_pending() {
            let result = match action {
                CompositeAction::AskDevicePermission(constraints) => {
                    self.adapter.ask_device_permission(constraints).await.map(|_| ())
                },
                CompositeAction::StartCamera => self.adapter.start_camera().await,
            };
            if let Err(error) = result {
                tracing::warn!(?action, %error, "composite action failed");
            }
            executed += 1;
        }
        executed
    }

    fn pop_pending(&self) -> Option<CompositeAction> {
        self.observed.borrow_mut().pending.pop_front()
    }

    /// Unsubscribe and release the session.
    pub fn unmount(self) {
        drop(self);
    }

    fn teardown(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.adapter.off_state_change(id);
            self.context.release(&self.adapter);
            tracing::debug!("composite unmounted");
        }
    }
}

impl<A: CallAdapter> Drop for CallComposite<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use callframe_core::{CallStatus, RoleHint};
    use callframe_harness::{ManualClock, MockCallAdapter};

    use super::*;

    fn mount(context: &Rc<CompositeContext<MockCallAdapter>>) -> CallComposite<MockCallAdapter> {
        let adapter = Rc::new(MockCallAdapter::local_user("8:acs:me", Some("Me")));
        CallComposite::mount(context, adapter, &CompositeOptions::default(), &ManualClock::new())
            .unwrap()
    }

    #[test]
    fn mount_queues_one_permission_request() {
        let context = CompositeContext::new();
        let composite = mount(&context);
        assert_eq!(
            composite.pending_actions(),
            vec![CompositeAction::AskDevicePermission(PermissionConstraints { audio: true, video: true })]
        );
    }

    #[test]
    fn consumer_mount_skips_video() {
        let context = CompositeContext::new();
        let adapter = Rc::new(MockCallAdapter::local_user("8:acs:me", None));
        let options = CompositeOptions { role_hint: Some(RoleHint::Consumer), ..CompositeOptions::default() };
        let composite = CallComposite::mount(&context, adapter, &options, &ManualClock::new()).unwrap();
        assert_eq!(
            composite.pending_actions(),
            vec![CompositeAction::AskDevicePermission(PermissionConstraints { audio: true, video: false })]
        );
    }

    #[test]
    fn second_mount_fails_until_first_is_gone() {
        let context = CompositeContext::new();
        let first = mount(&context);

        let other = Rc::new(MockCallAdapter::local_user("8:acs:other", None));
        let result = CallComposite::mount(&context, other, &CompositeOptions::default(), &ManualClock::new());
        assert_eq!(result.err(), Some(CompositeError::SessionActive));

        first.unmount();
        assert!(!context.is_claimed());
        let _second = mount(&context);
        assert!(context.is_claimed());
    }

    #[test]
    fn drop_unsubscribes() {
        let context = CompositeContext::new();
        let composite = mount(&context);
        let adapter = Rc::clone(composite.adapter());
        assert_eq!(adapter.store().listener_count(), 1);
        drop(composite);
        assert_eq!(adapter.store().listener_count(), 0);
    }

    #[test]
    fn start_video_in_lobby_waits_for_admission() {
        let context = CompositeContext::new();
        let composite = mount(&context);
        let adapter = Rc::clone(composite.adapter());
        adapter.set_call_kind(true, false);
        adapter.join_now(callframe_core::JoinCallOptions::default()).unwrap();
        adapter.enter_lobby();
        assert_eq!(adapter.get_state().call_status(), CallStatus::InLobby);

        let _ = composite.take_page_transitions();
        assert_eq!(composite.request_start_video(), StartVideo::Deferred);
        assert_eq!(composite.pending_actions().len(), 1);

        adapter.connect();
        assert_eq!(composite.pending_actions().last(), Some(&CompositeAction::StartCamera));
    }
}
