//! View derivation for Callframe call composites.
//!
//! Everything here reads [`callframe_core::AdapterState`] snapshots and never
//! writes them. Writes go through the adapter's action methods.
//!
//! # Components
//!
//! - [`Selector`] / [`Memoized`]: Pure snapshot projections with a size-one
//!   cache keyed by their input slice
//! - [`selectors`]: Selector catalogue, one per view component
//! - [`CallHandlers`]: Callbacks bound to an adapter, stable per adapter
//!   instance
//! - [`announce`] / [`ParticipantAnnouncer`]: Screen reader text for
//!   participants joining and leaving
//! - [`StartVideoGate`]: Device permission planning and deferred video start
//! - [`CallComposite`]: Runtime that wires an adapter to all of the above

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod announcer;
mod composite;
mod error;
mod handlers;
mod permissions;
mod selector;
pub mod selectors;

pub use announcer::{AnnouncedParticipant, AnnouncerStrings, ParticipantAnnouncer, announce};
pub use composite::{CallComposite, CompositeAction, CompositeContext};
pub use error::CompositeError;
pub use handlers::{CallHandlers, HandlerCache};
pub use permissions::{StartVideo, StartVideoGate, mount_permission_request};
pub use selector::{Memoized, Selector, Shared};
pub use selectors::{CallSelectors, ErrorBarMessage, ErrorBarSelector};
