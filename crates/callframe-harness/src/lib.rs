//! Deterministic test harness for Callframe composites.
//!
//! In-memory implementations of the core traits for deterministic,
//! reproducible testing of composites without a calling SDK.
//!
//! # Components
//!
//! - [`MockCallAdapter`]: [`callframe_core::CallAdapter`] over an in-memory
//!   call. Records every action, injects failures, and exposes the SDK side
//!   (participants joining, lobby admission, call ending) as plain methods.
//! - [`ManualClock`]: Clock that only moves when told to.
//! - [`ChurnGenerator`]: Seeded stream of participant churn operations.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! page and call bookkeeping invariants.
//!
//! # Model-Based Testing
//!
//! The `model` module provides an [`Operation`] alphabet that fuzzers and
//! proptest generate, and applies it to a [`MockCallAdapter`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod churn;
pub mod clock;
pub mod invariants;
pub mod mock_adapter;
pub mod model;

pub use churn::ChurnGenerator;
pub use clock::ManualClock;
pub use invariants::{
    CallPageRequiresCall, EndedCallDistinct, Invariant, InvariantKind, InvariantRegistry,
    InvariantResult, LobbyMatchesStatus, Violation,
};
pub use mock_adapter::{AdapterCall, MockCallAdapter, PermissionChecks, sample_devices};
pub use model::{EndChoice, Operation, participant_id};
