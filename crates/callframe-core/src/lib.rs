//! Core state boundary for Callframe call composites.
//!
//! Sans-IO building blocks shared by every composite: the immutable
//! per-tick [`AdapterState`] snapshot, the [`ChangeNotifier`] that delivers
//! snapshots to listeners, the [`PageStateMachine`] that decides which
//! top-level screen is shown, and the [`StateStore`] that is the single
//! writer of all of the above.
//!
//! # Components
//!
//! - [`StateStore`]: Single-writer boundary (replace snapshot, derive page,
//!   notify)
//! - [`ChangeNotifier`]: Ordered, re-entrancy safe pub/sub of snapshots
//! - [`PageStateMachine`]: Page derivation and explicit navigation triggers
//! - [`CallAdapter`]: Trait for the imperative action surface of a calling
//!   SDK
//! - [`Clock`]: Time source for error and call timestamps

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod adapter;
mod capabilities;
mod clock;
mod error;
mod notifier;
pub mod page;
pub mod state;
mod store;

pub use adapter::{CallAdapter, JoinCallOptions, PermissionConstraints, ViewOptions};
pub use capabilities::{Capabilities, CompositeOptions};
pub use clock::{Clock, SystemClock, Timestamp};
pub use error::{AdapterError, ListenerError};
pub use notifier::{ChangeNotifier, DeliveryReport, SubscriptionId};
pub use page::{CompositePage, EndReasonRoute, PageStateMachine, PageTransition, PageTrigger};
pub use state::{
    ActiveError, AdapterState, BreakoutRoomState, CallEndReason, CallId, CallState, CallStatus,
    DeviceAccess, DeviceInfo, DeviceManagerState, Diagnostics, ErrorTarget,
    LocalVideoStreamState, MediaKind, ParticipantConnectionState, RemoteParticipantState,
    RoleHint, ScalingMode, StreamView, TransferState, VideoStreamState,
};
pub use store::StateStore;
