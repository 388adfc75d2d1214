//! Snapshot change notification.
//!
//! [`ChangeNotifier`] delivers every published snapshot to every subscribed
//! listener. It does no diffing or filtering; that is left to selectors.
//!
//! # Delivery guarantees
//!
//! - Each snapshot reaches each listener subscribed at delivery time exactly
//!   once, in publish order.
//! - Deliveries never interleave. A listener that publishes (directly or by
//!   triggering a store mutation) has its snapshot queued until the current
//!   delivery has reached every listener.
//! - A failing listener is logged and skipped; the remaining listeners still
//!   receive the snapshot.
//! - Unsubscribing takes effect immediately, including for listeners that
//!   have not yet been reached in the current delivery.

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    fmt,
    rc::Rc,
};

use crate::ListenerError;

/// Handle returned by [`ChangeNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener<T> = Rc<dyn Fn(&Rc<T>) -> Result<(), ListenerError>>;

/// Outcome of draining the delivery queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Snapshots delivered.
    pub snapshots: usize,
    /// Successful listener invocations.
    pub delivered: usize,
    /// Listener invocations that returned an error.
    pub failed: usize,
}

/// Marks a delivery in progress. Cleared on drop, so a listener that
/// unwinds does not leave the notifier stuck queueing forever.
struct DeliveryGuard<'a>(&'a Cell<bool>);

impl<'a> DeliveryGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self(flag)
    }
}

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Ordered pub/sub of shared snapshots.
pub struct ChangeNotifier<T> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(SubscriptionId, Listener<T>)>>,
    queue: RefCell<VecDeque<Rc<T>>>,
    delivering: Cell<bool>,
}

impl<T> Default for ChangeNotifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ChangeNotifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.borrow().len())
            .field("queued", &self.queue.borrow().len())
            .field("delivering", &self.delivering.get())
            .finish()
    }
}

impl<T> ChangeNotifier<T> {
    /// Notifier with no listeners.
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            delivering: Cell::new(false),
        }
    }

    /// Register a listener for every future snapshot.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Rc<T>) -> Result<(), ListenerError> + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Whether the listener is currently subscribed.
    pub fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.listeners.borrow().iter().any(|(existing, _)| *existing == id)
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Publish a snapshot.
    ///
    /// If called from inside a listener the snapshot is queued and the
    /// returned report is empty; the outer call delivers it and reports it.
    pub fn notify(&self, snapshot: Rc<T>) -> DeliveryReport {
        self.queue.borrow_mut().push_back(snapshot);
        if self.delivering.get() {
            return DeliveryReport::default();
        }

        let _delivering = DeliveryGuard::enter(&self.delivering);
        let mut report = DeliveryReport::default();
        while let Some(next) = self.pop_queued() {
            self.deliver(&next, &mut report);
        }
        report
    }

    fn pop_queued(&self) -> Option<Rc<T>> {
        self.queue.borrow_mut().pop_front()
    }

    fn deliver(&self, snapshot: &Rc<T>, report: &mut DeliveryReport) {
        report.snapshots += 1;

        // Listeners may subscribe or unsubscribe while running, so iterate a
        // copy and re-check membership before each call.
        let listeners: Vec<_> = self.listeners.borrow().clone();
        for (id, listener) in listeners {
            if !self.is_subscribed(id) {
                continue;
            }
            match listener(snapshot) {
                Ok(()) => report.delivered += 1,
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(subscription = id.0, %err, "state listener failed");
                },
            }
        }
    }
}
