//! Single-writer state boundary.
//!
//! [`StateStore`] owns the current [`AdapterState`], the
//! [`PageStateMachine`] and the [`ChangeNotifier`]. Every mutation goes
//! through [`StateStore::update`], which:
//!
//! 1. clones the current snapshot and applies the mutation to the copy,
//! 2. retires a call that disappeared into `ended_call`,
//! 3. derives the page,
//! 4. swaps in the new snapshot and notifies listeners.
//!
//! Delivered snapshots are never mutated afterwards.

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    ActiveError, AdapterError, AdapterState, CallState, CallStatus, Capabilities, ChangeNotifier,
    Clock, CompositePage, DeliveryReport, ErrorTarget, ListenerError, PageStateMachine,
    PageTransition, PageTrigger, SubscriptionId, Timestamp,
};

/// Owner and single writer of the adapter state.
pub struct StateStore {
    state: RefCell<Rc<AdapterState>>,
    pages: RefCell<PageStateMachine>,
    notifier: ChangeNotifier<AdapterState>,
    clock: Rc<dyn Clock>,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("page", &self.page())
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Store with a fresh page machine for the given capabilities.
    pub fn new(initial: AdapterState, capabilities: Capabilities, clock: Rc<dyn Clock>) -> Self {
        Self::with_page_machine(initial, PageStateMachine::new(capabilities), clock)
    }

    /// Store driving a preconfigured page machine.
    pub fn with_page_machine(
        initial: AdapterState,
        mut pages: PageStateMachine,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let mut initial = initial;
        pages.derive(&initial);
        initial.page = pages.page();
        Self {
            state: RefCell::new(Rc::new(initial)),
            pages: RefCell::new(pages),
            notifier: ChangeNotifier::new(),
            clock,
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> Rc<AdapterState> {
        Rc::clone(&self.state.borrow())
    }

    /// Current page.
    pub fn page(&self) -> CompositePage {
        self.pages.borrow().page()
    }

    /// Capabilities the page machine was built with.
    pub fn capabilities(&self) -> Capabilities {
        self.pages.borrow().capabilities()
    }

    /// Current time from the store's clock.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Register a listener for every future snapshot.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Rc<AdapterState>) -> Result<(), ListenerError> + 'static,
    ) -> SubscriptionId {
        self.notifier.subscribe(listener)
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.notifier.listener_count()
    }

    /// Apply a mutation and publish the resulting snapshot.
    pub fn update(&self, mutate: impl FnOnce(&mut AdapterState)) -> Rc<AdapterState> {
        let previous = self.state();
        let mut next = AdapterState::clone(&previous);
        mutate(&mut next);
        self.retire_ended_call(&previous, &mut next);

        let transition = self.pages.borrow_mut().derive(&next);
        next.page = self.page();
        if let Some(transition) = transition {
            tracing::debug!(?transition, "page derived from snapshot");
        }
        self.publish(next).0
    }

    /// Apply a navigation trigger, publishing a snapshot if the page changed.
    pub fn trigger(&self, trigger: PageTrigger) -> Option<PageTransition> {
        let transition = self.pages.borrow_mut().trigger(trigger)?;
        let mut next = AdapterState::clone(&self.state());
        next.page = transition.to;
        self.publish(next);
        Some(transition)
    }

    /// Record the failure of an operation in `latest_errors`.
    pub fn record_error(&self, target: ErrorTarget, error: AdapterError) {
        tracing::warn!(%target, %error, "adapter action failed");
        let timestamp = self.now();
        self.update(|state| {
            state.latest_errors.insert(target, ActiveError { error, timestamp });
        });
    }

    /// Clear one operation's error entry. Returns false if there was none.
    pub fn clear_error(&self, target: ErrorTarget) -> bool {
        if !self.state().latest_errors.contains_key(&target) {
            return false;
        }
        self.update(|state| {
            state.latest_errors.remove(&target);
        });
        true
    }

    /// Record `result` against `target` if it failed, and hand it back
    /// unchanged.
    pub fn track<T>(&self, target: ErrorTarget, result: Result<T, AdapterError>) -> Result<T, AdapterError> {
        if let Err(error) = &result {
            self.record_error(target, error.clone());
        }
        result
    }

    fn retire_ended_call(&self, previous: &AdapterState, next: &mut AdapterState) {
        let Some(old) = previous.call.as_ref() else {
            // A new call supersedes whatever ended before it.
            if next.call.is_some() {
                next.ended_call = None;
            }
            return;
        };
        match next.call.as_ref() {
            Some(current) if current.id == old.id => {},
            Some(_) => {
                // A different call replaced the old one without a gap.
                next.ended_call = Some(self.terminal_snapshot(old));
            },
            None => {
                let already_retired =
                    next.ended_call.as_ref().is_some_and(|ended| ended.id == old.id);
                if !already_retired {
                    next.ended_call = Some(self.terminal_snapshot(old));
                }
            },
        }
    }

    fn terminal_snapshot(&self, call: &CallState) -> CallState {
        let mut ended = call.clone();
        ended.status = CallStatus::Disconnected;
        ended.end_time.get_or_insert_with(|| self.clock.now());
        ended
    }

    fn publish(&self, next: AdapterState) -> (Rc<AdapterState>, DeliveryReport) {
        let snapshot = Rc::new(next);
        *self.state.borrow_mut() = Rc::clone(&snapshot);
        let report = self.notifier.notify(Rc::clone(&snapshot));
        tracing::trace!(
            page = snapshot.page.as_str(),
            delivered = report.delivered,
            failed = report.failed,
            "snapshot published"
        );
        (snapshot, report)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{CallEndReason, CallId, SystemClock};

    fn store() -> StateStore {
        StateStore::new(AdapterState::new("8:acs:me", None), Capabilities::default(), Rc::new(SystemClock::new()))
    }

    fn start_call(store: &StateStore, id: &str, status: CallStatus) {
        let now = store.now();
        store.update(|state| state.call = Some(CallState::new(CallId::new(id), status, now)));
    }

    #[test]
    fn update_replaces_snapshot_wholesale() {
        let store = store();
        let before = store.state();
        store.update(|state| state.display_name = Some("Ada".into()));
        let after = store.state();

        assert!(!Rc::ptr_eq(&before, &after));
        assert_eq!(before.display_name, None);
        assert_eq!(after.display_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn page_is_written_into_snapshot() {
        let store = store();
        start_call(&store, "c1", CallStatus::Connected);
        assert_eq!(store.state().page, CompositePage::Call);
    }

    #[test]
    fn removed_call_is_retired_into_ended_call() {
        let store = store();
        start_call(&store, "c1", CallStatus::Connected);
        store.update(|state| {
            if let Some(call) = state.call.as_mut() {
                call.end_reason = Some(CallEndReason::new(0, 5300));
            }
        });
        store.update(|state| state.call = None);

        let state = store.state();
        let ended = state.ended_call.as_ref().map(|c| (c.id.as_str(), c.status, c.end_reason));
        assert_eq!(ended, Some(("c1", CallStatus::Disconnected, Some(CallEndReason::new(0, 5300)))));
        assert_eq!(state.page, CompositePage::RemovedFromCall);
    }

    #[test]
    fn listeners_see_every_snapshot_in_order() {
        let store = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |state| {
            sink.borrow_mut().push(state.display_name.clone());
            Ok(())
        });

        store.update(|state| state.display_name = Some("a".into()));
        store.update(|state| state.display_name = Some("b".into()));

        assert_eq!(*seen.borrow(), vec![Some("a".to_string()), Some("b".to_string())]);
    }

    #[test]
    fn record_and_clear_error_touch_one_entry() {
        let store = store();
        store.record_error(ErrorTarget::Mute, AdapterError::NoActiveCall);
        store.record_error(ErrorTarget::StartCamera, AdapterError::PermissionDenied);

        assert!(store.clear_error(ErrorTarget::Mute));
        assert!(!store.clear_error(ErrorTarget::Mute));

        let state = store.state();
        assert_eq!(state.latest_errors.len(), 1);
        assert!(state.latest_errors.contains_key(&ErrorTarget::StartCamera));
    }

    #[test]
    fn track_passes_result_through() {
        let store = store();
        let ok: Result<u8, AdapterError> = store.track(ErrorTarget::Unmute, Ok(3));
        assert_eq!(ok, Ok(3));
        assert!(store.state().latest_errors.is_empty());

        let err = store.track::<()>(ErrorTarget::Unmute, Err(AdapterError::NoActiveCall));
        assert_eq!(err, Err(AdapterError::NoActiveCall));
        assert!(store.state().latest_errors.contains_key(&ErrorTarget::Unmute));
    }

    #[test]
    fn trigger_publishes_only_on_change() {
        let store = store();
        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        store.subscribe(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        });

        assert_eq!(store.trigger(PageTrigger::Acknowledge), None);
        assert_eq!(count.get(), 0);

        store.trigger(PageTrigger::Error(CompositePage::UnsupportedEnvironment));
        assert_eq!(count.get(), 1);
        assert_eq!(store.state().page, CompositePage::UnsupportedEnvironment);
    }

    #[test]
    fn listener_mutation_is_delivered_after_current_snapshot() {
        let store = Rc::new(store());
        let seen = Rc::new(RefCell::new(Vec::new()));

        let writer = Rc::clone(&store);
        store.subscribe(move |state| {
            if state.display_name.as_deref() == Some("first") {
                writer.update(|s| s.display_name = Some("second".into()));
            }
            Ok(())
        });
        let sink = Rc::clone(&seen);
        store.subscribe(move |state| {
            sink.borrow_mut().push(state.display_name.clone().unwrap_or_default());
            Ok(())
        });

        store.update(|s| s.display_name = Some("first".into()));
        assert_eq!(*seen.borrow(), vec!["first".to_string(), "second".to_string()]);
        assert_eq!(store.state().display_name.as_deref(), Some("second"));
    }
}
