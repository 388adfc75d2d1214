//! Callframe call simulation.
//!
//! Mounts a call composite on the in-memory adapter, joins (through the
//! lobby for Teams meetings), runs seeded participant churn and ends the
//! call, logging every page transition and announcement.
//!
//! # Usage
//!
//! ```bash
//! # Plain group call, default seed
//! callframe-sim
//!
//! # Teams meeting through the lobby, reproducible churn
//! callframe-sim --teams --seed 42 --operations 200 --participants 8
//! ```

use std::rc::Rc;

use callframe_app::{CallComposite, CompositeContext};
use callframe_core::{
    AdapterState, CallAdapter, Capabilities, CompositeOptions, JoinCallOptions, PageStateMachine, RoleHint,
};
use callframe_harness::{ChurnGenerator, ManualClock, MockCallAdapter, sample_devices};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Callframe call simulation
#[derive(Parser, Debug)]
#[command(name = "callframe-sim")]
#[command(about = "Seeded call composite simulation")]
#[command(version)]
struct Args {
    /// Seed for participant churn
    #[arg(short, long, default_value = "0")]
    seed: u64,

    /// Remote participant slots
    #[arg(short, long, default_value = "6")]
    participants: u8,

    /// Churn operations before the call ends
    #[arg(short, long, default_value = "40")]
    operations: usize,

    /// Join a Teams meeting (waits in the lobby until admitted)
    #[arg(long)]
    teams: bool,

    /// Enable the PSTN dialpad page
    #[arg(long)]
    pstn: bool,

    /// Enable the breakout room closed page
    #[arg(long)]
    breakout: bool,

    /// Join as a view-only consumer
    #[arg(long)]
    consumer: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn options(&self) -> CompositeOptions {
        CompositeOptions {
            pstn_dialing: self.pstn,
            breakout_rooms: self.breakout,
            role_hint: self.consumer.then_some(RoleHint::Consumer),
            ignore_premount_errors: true,
            ..CompositeOptions::default()
        }
    }
}

fn report(composite: &CallComposite<MockCallAdapter>) {
    for transition in composite.take_page_transitions() {
        tracing::info!(from = transition.from.as_str(), to = transition.to.as_str(), "page");
    }
    for announcement in composite.take_announcements() {
        tracing::info!(%announcement, "announce");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let options = args.options();
    let clock = ManualClock::new();
    let initial = AdapterState {
        devices: sample_devices(),
        role_hint: options.role_hint,
        ..AdapterState::new("8:acs:local", Some("Local".into()))
    };
    let pages = PageStateMachine::new(Capabilities::from_options(&options));
    let adapter = Rc::new(MockCallAdapter::with_page_machine(initial, pages, clock.clone()));

    let context = CompositeContext::new();
    let composite = CallComposite::mount(&context, Rc::clone(&adapter), &options, &clock)?;
    composite.process_pending().await;
    tracing::info!(seed = args.seed, teams = args.teams, "simulation starting");

    let handlers = composite.handlers();
    adapter.set_call_kind(args.teams, false);
    handlers.on_join_call(JoinCallOptions { microphone_on: true, camera_on: false }).await?;
    if args.teams {
        adapter.enter_lobby();
    }
    let start_video = composite.request_start_video();
    tracing::debug!(?start_video, "start video requested");
    report(&composite);

    clock.advance(1_500);
    adapter.connect();
    composite.process_pending().await;
    report(&composite);

    let mut churn = ChurnGenerator::new(args.seed, args.participants);
    let mut applied = 0;
    for _ in 0..args.operations {
        let operation = churn.next_operation();
        if operation.apply(&adapter) {
            applied += 1;
        } else {
            tracing::debug!(?operation, "operation did not apply");
        }
        report(&composite);
    }

    churn.ending().apply(&adapter);
    report(&composite);
    if composite.page().is_terminal() {
        handlers.on_acknowledge_error();
        report(&composite);
    }

    let state = adapter.get_state();
    tracing::info!(
        applied,
        page = composite.page().as_str(),
        end_reason = ?state.ended_call.as_ref().and_then(|call| call.end_reason),
        "simulation finished"
    );

    composite.unmount();
    Ok(())
}
