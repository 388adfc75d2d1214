//! Model-based testing support.
//!
//! [`Operation`] is the alphabet of things that can happen to a composite:
//! SDK side events (participants coming and going, the call connecting or
//! ending) and UI side actions (join, leave, navigation). Proptest and the
//! fuzzers generate sequences of operations and apply them to a
//! [`crate::MockCallAdapter`], checking invariants after every step.

mod operation;

pub use operation::{EndChoice, Operation, participant_id};
