//! Composite lifecycle against the in-memory adapter.

use std::rc::Rc;

use callframe_app::{
    CallComposite, CompositeAction, CompositeContext, CompositeError, ErrorBarMessage, StartVideo,
};
use callframe_core::{
    AdapterError, CallAdapter, CallEndReason, CompositeOptions, CompositePage, ErrorTarget, JoinCallOptions,
    PageTransition, RoleHint,
};
use callframe_harness::{AdapterCall, ManualClock, MockCallAdapter, PermissionChecks};

fn adapter() -> Rc<MockCallAdapter> {
    Rc::new(MockCallAdapter::local_user("8:acs:me", Some("Me")))
}

fn mount_with(adapter: &Rc<MockCallAdapter>, options: &CompositeOptions) -> CallComposite<MockCallAdapter> {
    let context = CompositeContext::new();
    CallComposite::mount(&context, Rc::clone(adapter), options, adapter.clock()).unwrap()
}

fn mount(adapter: &Rc<MockCallAdapter>) -> CallComposite<MockCallAdapter> {
    mount_with(adapter, &CompositeOptions::default())
}

#[tokio::test]
async fn permission_is_requested_once_per_mount() {
    let adapter = adapter();
    let composite = mount(&adapter);

    assert_eq!(composite.process_pending().await, 1);
    assert_eq!(composite.process_pending().await, 0);
    assert_eq!(adapter.permission_checks(), PermissionChecks { audio: 1, video: 1 });
}

#[tokio::test]
async fn camera_forbidding_role_skips_video_check() {
    let adapter = adapter();
    let options = CompositeOptions { role_hint: Some(RoleHint::Consumer), ..CompositeOptions::default() };
    let composite = mount_with(&adapter, &options);

    composite.process_pending().await;
    assert_eq!(adapter.permission_checks(), PermissionChecks { audio: 1, video: 0 });
}

#[tokio::test]
async fn toggle_alternates_with_state() {
    let adapter = adapter();
    let composite = mount(&adapter);
    let handlers = composite.handlers();
    assert!(Rc::ptr_eq(&handlers, &composite.handlers()));

    handlers.on_join_call(JoinCallOptions { microphone_on: false, camera_on: false }).await.unwrap();
    adapter.connect();
    adapter.take_actions();

    for _ in 0..3 {
        handlers.on_toggle_microphone().await.unwrap();
    }
    assert_eq!(adapter.take_actions(), vec![AdapterCall::Unmute, AdapterCall::Mute, AdapterCall::Unmute]);
}

#[tokio::test]
async fn deferred_start_video_fires_after_admission() {
    let adapter = adapter();
    let composite = mount(&adapter);
    composite.process_pending().await;

    adapter.set_call_kind(true, false);
    composite.handlers().on_join_call(JoinCallOptions::default()).await.unwrap();
    adapter.enter_lobby();
    assert_eq!(composite.page(), CompositePage::Lobby);

    assert_eq!(composite.request_start_video(), StartVideo::Deferred);
    assert!(composite.pending_actions().is_empty());

    adapter.connect();
    assert_eq!(composite.pending_actions(), vec![CompositeAction::StartCamera]);
    assert_eq!(composite.process_pending().await, 1);
    assert!(adapter.get_state().call.as_ref().is_some_and(|call| call.is_camera_on()));
}

#[tokio::test]
async fn deferred_start_video_is_dropped_when_lobby_is_refused() {
    let adapter = adapter();
    let composite = mount(&adapter);
    composite.process_pending().await;

    adapter.set_call_kind(true, false);
    adapter.join_now(JoinCallOptions::default()).unwrap();
    adapter.enter_lobby();
    composite.request_start_video();

    adapter.end_call(CallEndReason::new(403, 5854));
    assert_eq!(composite.page(), CompositePage::AccessDeniedTeamsMeeting);
    assert!(composite.pending_actions().is_empty());
}

#[tokio::test]
async fn second_mount_on_a_live_session_fails_fast() {
    let context = CompositeContext::new();
    let first = adapter();
    let _composite =
        CallComposite::mount(&context, Rc::clone(&first), &CompositeOptions::default(), first.clock()).unwrap();

    let second = adapter();
    let result = CallComposite::mount(&context, second, &CompositeOptions::default(), first.clock());
    assert_eq!(result.err(), Some(CompositeError::SessionActive));
    assert!(context.adapter().is_some_and(|held| Rc::ptr_eq(&held, &first)));
}

#[tokio::test]
async fn action_settling_after_unmount_is_harmless() {
    let adapter = adapter();
    let composite = mount(&adapter);
    adapter.join_now(JoinCallOptions { microphone_on: true, camera_on: false }).unwrap();
    adapter.connect();

    adapter.set_deferred(true);
    let handlers = composite.handlers();
    let mute = handlers.on_mute();
    composite.unmount();

    assert_eq!(mute.await, Ok(()));
    assert!(!adapter.get_state().call.as_ref().is_some_and(|call| call.is_muted));
    assert_eq!(adapter.store().listener_count(), 0);

    assert_eq!(adapter.flush(), 1);
    assert!(adapter.get_state().call.as_ref().is_some_and(|call| call.is_muted));
}

#[tokio::test]
async fn dismissing_clears_one_error() {
    let adapter = adapter();
    let composite = mount(&adapter);
    let handlers = composite.handlers();
    adapter.join_now(JoinCallOptions::default()).unwrap();
    adapter.connect();

    adapter.fail_next(ErrorTarget::Mute, AdapterError::Network("timeout".into()));
    adapter.fail_next(ErrorTarget::StartScreenShare, AdapterError::Sdk { code: 7, message: "busy".into() });
    assert!(handlers.on_mute().await.is_err());
    assert!(handlers.on_toggle_screen_share().await.is_err());

    let bar = composite.selectors().error_bar.select(&adapter.get_state());
    assert_eq!(bar.len(), 2);

    handlers.on_dismiss_error(ErrorTarget::Mute);
    let bar = composite.selectors().error_bar.select(&adapter.get_state());
    assert_eq!(bar.iter().filter_map(ErrorBarMessage::dismiss_target).collect::<Vec<_>>(), vec![
        ErrorTarget::StartScreenShare
    ]);
}

#[tokio::test]
async fn premount_errors_can_be_ignored() {
    let adapter = adapter();
    adapter.fail_next(ErrorTarget::StartCamera, AdapterError::PermissionDenied);
    assert!(adapter.start_camera().await.is_err());
    adapter.clock().advance(1_000);

    let options = CompositeOptions { ignore_premount_errors: true, ..CompositeOptions::default() };
    let composite = mount_with(&adapter, &options);
    assert!(composite.selectors().error_bar.select(&adapter.get_state()).is_empty());

    adapter.fail_next(ErrorTarget::SetCamera, AdapterError::DeviceNotFound("cam-9".into()));
    assert!(composite.handlers().on_select_camera(callframe_core::DeviceInfo::new("cam-9", "Nine")).await.is_err());
    assert_eq!(composite.selectors().error_bar.select(&adapter.get_state()).len(), 1);
}

#[tokio::test]
async fn page_flow_through_lobby_removal_and_acknowledge() {
    let adapter = adapter();
    let composite = mount(&adapter);
    let handlers = composite.handlers();

    adapter.set_call_kind(true, false);
    handlers.on_join_call(JoinCallOptions::default()).await.unwrap();
    adapter.enter_lobby();
    adapter.connect();
    adapter.end_call(CallEndReason::new(0, 5300));
    assert_eq!(composite.page(), CompositePage::RemovedFromCall);

    handlers.on_acknowledge_error();
    let pages: Vec<_> = composite.take_page_transitions().into_iter().map(|PageTransition { to, .. }| to).collect();
    assert_eq!(pages, vec![
        CompositePage::Lobby,
        CompositePage::Call,
        CompositePage::RemovedFromCall,
        CompositePage::Configuration,
    ]);
}

#[tokio::test]
async fn leaving_returns_to_configuration() {
    let adapter = adapter();
    let composite = mount(&adapter);
    let handlers = composite.handlers();

    handlers.on_join_call(JoinCallOptions::default()).await.unwrap();
    adapter.connect();
    assert_eq!(composite.page(), CompositePage::Call);

    handlers.on_leave_call(false).await.unwrap();
    assert_eq!(composite.page(), CompositePage::Configuration);
    assert!(adapter.get_state().call.is_none());
}

#[tokio::test]
async fn reconnecting_network_shows_until_recovered() {
    let adapter = adapter();
    let composite = mount(&adapter);
    adapter.join_now(JoinCallOptions::default()).unwrap();
    adapter.connect();

    assert!(adapter.set_network_reconnecting(true));
    let bar = composite.selectors().error_bar.select(&adapter.get_state());
    assert!(bar.contains(&ErrorBarMessage::NetworkReconnecting));

    assert!(adapter.set_network_reconnecting(false));
    let bar = composite.selectors().error_bar.select(&adapter.get_state());
    assert!(!bar.contains(&ErrorBarMessage::NetworkReconnecting));
}

#[tokio::test]
async fn hold_and_disconnecting_stay_on_call_page() {
    let adapter = adapter();
    let composite = mount(&adapter);
    adapter.join_now(JoinCallOptions::default()).unwrap();
    adapter.connect();

    assert!(adapter.remote_hold());
    assert_eq!(composite.page(), CompositePage::Call);
    assert!(adapter.begin_disconnect());
    assert_eq!(composite.page(), CompositePage::Call);

    adapter.end_call(CallEndReason::new(0, 0));
    assert_eq!(composite.page(), CompositePage::Configuration);
}
