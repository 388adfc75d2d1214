//! Fuzz target for page navigation under arbitrary SDK event sequences
//!
//! # Strategy
//!
//! - Arbitrary [`Operation`] sequences against the in-memory adapter with
//!   every optional page enabled
//! - A mounted composite observes every snapshot
//!
//! # Invariants
//!
//! - Standard snapshot invariants hold after every operation
//! - The composite's page always matches the snapshot's page
//! - No page requiring a call is shown without one

#![no_main]

use std::rc::Rc;

use callframe_app::{CallComposite, CompositeContext};
use callframe_core::{AdapterState, CallAdapter, Capabilities, CompositeOptions, PageStateMachine};
use callframe_harness::{sample_devices, InvariantRegistry, ManualClock, MockCallAdapter, Operation};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|ops: Vec<Operation>| {
    let options = CompositeOptions {
        pstn_dialing: true,
        breakout_rooms: true,
        ..CompositeOptions::default()
    };
    let initial = AdapterState {
        devices: sample_devices(),
        ..AdapterState::new("8:acs:fuzz", None)
    };
    let clock = ManualClock::new();
    let pages = PageStateMachine::new(Capabilities::from_options(&options));
    let adapter = Rc::new(MockCallAdapter::with_page_machine(initial, pages, clock.clone()));

    let context = CompositeContext::new();
    let Ok(composite) = CallComposite::mount(&context, Rc::clone(&adapter), &options, &clock) else {
        panic!("fresh context rejected mount");
    };

    let invariants = InvariantRegistry::standard();
    for (index, op) in ops.iter().enumerate() {
        op.apply(&adapter);

        let state = adapter.get_state();
        invariants.assert_all(&state, &format!("after op {index}: {op:?}"));
        assert_eq!(composite.page(), state.page);
        assert!(state.call.is_some() || !state.page.requires_call());
    }
});
