//! Invariant checking for composite state.
//!
//! Invariants are properties that must always hold during system execution.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible execution paths.
//!
//! # Architecture
//!
//! Every check runs against a published [`AdapterState`] snapshot. Register
//! checks in an [`InvariantRegistry`] and run them after each operation,
//! typically from a state listener so that every delivered snapshot is
//! covered.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! registry.check_all(&adapter.get_state())?;
//! ```

mod checks;

use std::fmt;

use callframe_core::AdapterState;
pub use checks::{CallPageRequiresCall, EndedCallDistinct, LobbyMatchesStatus};

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Identifies an invariant in violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// In-call pages are only shown while a call exists.
    CallPageRequiresCall,
    /// `ended_call` never carries the id of the active call.
    EndedCallDistinct,
    /// The lobby page is only shown for calls waiting for admission.
    LobbyMatchesStatus,
}

impl fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CallPageRequiresCall => "call_page_requires_call",
            Self::EndedCallDistinct => "ended_call_distinct",
            Self::LobbyMatchesStatus => "lobby_matches_status",
        };
        f.write_str(name)
    }
}

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// The violated invariant.
    pub invariant: InvariantKind,
    /// Description of what went wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against a snapshot.
pub trait Invariant {
    /// Invariant identity for error reporting.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant against a snapshot.
    ///
    /// Returns `Ok(())` if the invariant holds, or a [`Violation`]
    /// describing what went wrong.
    fn check(&self, state: &AdapterState) -> InvariantResult;
}

/// Registry of invariants to check.
///
/// Collects multiple invariants and runs them all against a snapshot.
/// Use [`InvariantRegistry::standard()`] for the common page invariants.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl fmt::Debug for InvariantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<_> = self.invariants.iter().map(|inv| inv.kind()).collect();
        f.debug_struct("InvariantRegistry").field("invariants", &kinds).finish()
    }
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard page invariants.
    ///
    /// Includes:
    /// - [`CallPageRequiresCall`]: no in-call page without a call
    /// - [`EndedCallDistinct`]: `ended_call` never shadows `call`
    /// - [`LobbyMatchesStatus`]: lobby only while waiting for admission
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(CallPageRequiresCall);
        registry.add(EndedCallDistinct);
        registry.add(LobbyMatchesStatus);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given snapshot.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &AdapterState) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking on the first violation.
    ///
    /// Use this in tests where you want immediate failure with context.
    pub fn assert_all(&self, state: &AdapterState, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
