//! Top-level page navigation.
//!
//! [`PageStateMachine`] decides which screen a composite shows. It is driven
//! two ways:
//!
//! - [`PageStateMachine::derive`] on every new snapshot, which maps call
//!   status, lobby flags and end reasons to a page.
//! - [`PageStateMachine::trigger`] for explicit transitions (join, error,
//!   end, acknowledge, dialpad).
//!
//! ```text
//! configuration -> {lobby | call} -> {hold | transfer | dialpad | breakoutRoomClosed | call}
//!               -> configuration
//! any -> error page -> (acknowledge) -> configuration
//! ```
//!
//! The machine is owned by [`crate::StateStore`], which writes the resulting
//! page into each snapshot before it is delivered.

use crate::{AdapterState, CallEndReason, CallId, CallState, CallStatus, Capabilities};

/// Top-level screen of a composite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CompositePage {
    /// Device setup before joining.
    #[default]
    Configuration,
    /// Waiting for admission or for the call to connect.
    Lobby,
    /// In the call.
    Call,
    /// Call is on local hold.
    Hold,
    /// Call is being transferred.
    Transfer,
    /// PSTN dialpad.
    Dialpad,
    /// The assigned breakout room was closed.
    BreakoutRoomClosed,
    /// Admission to a Teams meeting was denied.
    AccessDeniedTeamsMeeting,
    /// The local user was removed by the host.
    RemovedFromCall,
    /// Join failed because the network is unavailable.
    JoinCallFailedDueToNoNetwork,
    /// The platform cannot run calls.
    UnsupportedEnvironment,
}

impl CompositePage {
    /// Error pages only leave through [`PageTrigger::Acknowledge`].
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::AccessDeniedTeamsMeeting
                | Self::RemovedFromCall
                | Self::JoinCallFailedDueToNoNetwork
                | Self::UnsupportedEnvironment
        )
    }

    /// Pages that only make sense with a call object present.
    pub fn requires_call(self) -> bool {
        matches!(
            self,
            Self::Lobby | Self::Call | Self::Hold | Self::Transfer | Self::Dialpad
        )
    }

    /// Page name as used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::Lobby => "lobby",
            Self::Call => "call",
            Self::Hold => "hold",
            Self::Transfer => "transfer",
            Self::Dialpad => "dialpad",
            Self::BreakoutRoomClosed => "breakoutRoomClosed",
            Self::AccessDeniedTeamsMeeting => "accessDeniedTeamsMeeting",
            Self::RemovedFromCall => "removedFromCall",
            Self::JoinCallFailedDueToNoNetwork => "joinCallFailedDueToNoNetwork",
            Self::UnsupportedEnvironment => "unsupportedEnvironment",
        }
    }
}

/// Maps one end-reason pair to the page shown after the call ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndReasonRoute {
    /// End code to match.
    pub code: u32,
    /// End sub code to match.
    pub sub_code: u32,
    /// Page to show on a match. Must be terminal.
    pub page: CompositePage,
}

impl EndReasonRoute {
    /// Meeting organizer denied admission.
    pub const ACCESS_DENIED: Self =
        Self { code: 403, sub_code: 5854, page: CompositePage::AccessDeniedTeamsMeeting };

    /// Host removed the local user.
    pub const REMOVED_FROM_CALL: Self =
        Self { code: 0, sub_code: 5300, page: CompositePage::RemovedFromCall };

    /// Routes used unless replaced with [`PageStateMachine::with_routes`].
    pub const DEFAULTS: [Self; 2] = [Self::ACCESS_DENIED, Self::REMOVED_FROM_CALL];

    /// Whether this route applies to the given reason.
    pub fn matches(&self, reason: CallEndReason) -> bool {
        self.code == reason.code && self.sub_code == reason.sub_code
    }
}

/// Explicit navigation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTrigger {
    /// A join was requested. The page follows once the call object appears.
    Join {
        /// Whether the join goes through a lobby or waiting room.
        requires_admission: bool,
    },
    /// Show an error page.
    Error(CompositePage),
    /// The local user ended the call.
    End,
    /// The user acknowledged an error page.
    Acknowledge,
    /// Show the dialpad over the call.
    OpenDialpad,
    /// Return from the dialpad to the call.
    CloseDialpad,
}

/// A page change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTransition {
    /// Page before the change.
    pub from: CompositePage,
    /// Page after the change.
    pub to: CompositePage,
}

/// Page navigation state machine.
#[derive(Debug, Clone)]
pub struct PageStateMachine {
    /// Current page.
    page: CompositePage,
    /// Enabled optional pages.
    capabilities: Capabilities,
    /// End-reason routing table.
    routes: Vec<EndReasonRoute>,
    /// Id of the last call seen in a snapshot. `None` once its end was handled.
    tracked_call: Option<CallId>,
    /// Call the local user ended. Its end reason is never routed.
    ending_call: Option<CallId>,
    /// Admission hint from the last join trigger.
    join_requires_admission: bool,
    /// Dialpad is shown over the call.
    dialpad_open: bool,
}

impl PageStateMachine {
    /// New machine on the configuration page with the default routes.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            page: CompositePage::Configuration,
            capabilities,
            routes: EndReasonRoute::DEFAULTS.to_vec(),
            tracked_call: None,
            ending_call: None,
            join_requires_admission: false,
            dialpad_open: false,
        }
    }

    /// Replace the end-reason routing table. Routes to non-terminal pages
    /// are dropped.
    #[must_use]
    pub fn with_routes(mut self, routes: impl IntoIterator<Item = EndReasonRoute>) -> Self {
        self.routes = routes.into_iter().filter(|route| route.page.is_terminal()).collect();
        self
    }

    /// Current page.
    pub fn page(&self) -> CompositePage {
        self.page
    }

    /// Capabilities this machine was built with.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Id of the call whose end reason will be inspected when it ends.
    pub fn tracked_call(&self) -> Option<&CallId> {
        self.tracked_call.as_ref()
    }

    /// Derive the page from a new snapshot.
    pub fn derive(&mut self, state: &AdapterState) -> Option<PageTransition> {
        let next = match &state.call {
            Some(call) => self.page_with_call(call, state.requires_admission()),
            None => self.page_without_call(state.ended_call.as_ref()),
        };
        self.navigate(next)
    }

    /// Apply an explicit navigation trigger.
    pub fn trigger(&mut self, trigger: PageTrigger) -> Option<PageTransition> {
        match trigger {
            PageTrigger::Join { requires_admission } => {
                self.join_requires_admission = requires_admission;
                self.ending_call = None;
                None
            },
            PageTrigger::Error(page) => {
                if !page.is_terminal() {
                    tracing::warn!(page = page.as_str(), "ignoring error trigger for non-error page");
                    return None;
                }
                self.dialpad_open = false;
                self.navigate(page)
            },
            PageTrigger::End => {
                self.ending_call = self.tracked_call.clone();
                self.dialpad_open = false;
                if self.page.is_terminal() {
                    return None;
                }
                self.navigate(CompositePage::Configuration)
            },
            PageTrigger::Acknowledge => {
                if self.page.is_terminal() {
                    self.navigate(CompositePage::Configuration)
                } else {
                    None
                }
            },
            PageTrigger::OpenDialpad => {
                if self.capabilities.pstn_dialing() && self.page == CompositePage::Call {
                    self.dialpad_open = true;
                    self.navigate(CompositePage::Dialpad)
                } else {
                    None
                }
            },
            PageTrigger::CloseDialpad => {
                if self.page == CompositePage::Dialpad {
                    self.dialpad_open = false;
                    self.navigate(CompositePage::Call)
                } else {
                    None
                }
            },
        }
    }

    fn page_with_call(&mut self, call: &CallState, requires_admission: bool) -> CompositePage {
        if self.tracked_call.as_ref() != Some(&call.id) {
            self.dialpad_open = false;
        }
        self.tracked_call = Some(call.id.clone());

        if self.page.is_terminal() {
            return self.page;
        }
        if self.ending_call.as_ref() == Some(&call.id) {
            return CompositePage::Configuration;
        }

        let caps = self.capabilities;
        match call.status {
            CallStatus::InLobby => CompositePage::Lobby,
            CallStatus::Connecting | CallStatus::Ringing | CallStatus::EarlyMedia => {
                if requires_admission || self.join_requires_admission {
                    CompositePage::Lobby
                } else {
                    CompositePage::Call
                }
            },
            CallStatus::LocalHold if caps.hold() => CompositePage::Hold,
            CallStatus::Connected | CallStatus::RemoteHold | CallStatus::LocalHold => {
                let transferred = call.transfer.as_ref().is_some_and(|t| t.accepted);
                let room_closed = call.breakout_room.as_ref().is_some_and(|room| room.closed);
                if caps.call_transfer() && transferred {
                    CompositePage::Transfer
                } else if caps.breakout_rooms() && room_closed {
                    CompositePage::BreakoutRoomClosed
                } else if caps.pstn_dialing() && self.dialpad_open {
                    CompositePage::Dialpad
                } else {
                    CompositePage::Call
                }
            },
            // Teardown keeps whatever the call was showing until the call
            // object is gone.
            CallStatus::Disconnecting | CallStatus::Disconnected | CallStatus::None => self.page,
        }
    }

    fn page_without_call(&mut self, ended_call: Option<&CallState>) -> CompositePage {
        self.dialpad_open = false;
        let tracked = self.tracked_call.take();
        let ended_by_user = self.ending_call.take();

        if self.page.is_terminal() {
            return self.page;
        }

        // Only the call we were tracking may route. An `ended_call` left over
        // from an earlier call must not.
        let route = ended_call
            .filter(|ended| tracked.as_ref() == Some(&ended.id))
            .filter(|ended| ended_by_user.as_ref() != Some(&ended.id))
            .and_then(|ended| ended.end_reason)
            .and_then(|reason| self.routes.iter().find(|route| route.matches(reason)));

        match route {
            Some(route) => route.page,
            None => CompositePage::Configuration,
        }
    }

    fn navigate(&mut self, next: CompositePage) -> Option<PageTransition> {
        if next == self.page {
            return None;
        }
        let transition = PageTransition { from: self.page, to: next };
        tracing::info!(from = transition.from.as_str(), to = transition.to.as_str(), "page transition");
        self.page = next;
        Some(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Timestamp, state::TransferState};

    fn call(id: &str, status: CallStatus) -> CallState {
        CallState::new(CallId::new(id), status, Timestamp::ZERO)
    }

    fn with_call(call: CallState) -> AdapterState {
        AdapterState { call: Some(call), ..AdapterState::default() }
    }

    fn ended(call: CallState, reason: CallEndReason) -> AdapterState {
        let ended = CallState { status: CallStatus::Disconnected, end_reason: Some(reason), ..call };
        AdapterState { ended_call: Some(ended), ..AdapterState::default() }
    }

    #[test]
    fn no_call_stays_on_configuration() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        assert_eq!(machine.derive(&AdapterState::default()), None);
        assert_eq!(machine.page(), CompositePage::Configuration);
    }

    #[test]
    fn connecting_without_admission_goes_to_call() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c1", CallStatus::Connecting)));
        assert_eq!(machine.page(), CompositePage::Call);
    }

    #[test]
    fn connecting_teams_meeting_goes_to_lobby() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        let mut state = with_call(call("c1", CallStatus::Connecting));
        state.is_teams_call = true;
        machine.derive(&state);
        assert_eq!(machine.page(), CompositePage::Lobby);

        state.call = Some(call("c1", CallStatus::Connected));
        machine.derive(&state);
        assert_eq!(machine.page(), CompositePage::Call);
    }

    #[test]
    fn join_trigger_admission_hint_routes_connecting_to_lobby() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        assert_eq!(machine.trigger(PageTrigger::Join { requires_admission: true }), None);
        machine.derive(&with_call(call("c1", CallStatus::Ringing)));
        assert_eq!(machine.page(), CompositePage::Lobby);
    }

    #[test]
    fn removed_from_call_routes_to_error_page_until_acknowledged() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c1", CallStatus::Connected)));

        let transition = machine.derive(&ended(call("c1", CallStatus::Connected), CallEndReason::new(0, 5300)));
        assert_eq!(
            transition,
            Some(PageTransition { from: CompositePage::Call, to: CompositePage::RemovedFromCall })
        );

        // Further snapshots do not leave the error page.
        machine.derive(&AdapterState::default());
        assert_eq!(machine.page(), CompositePage::RemovedFromCall);

        machine.trigger(PageTrigger::Acknowledge);
        assert_eq!(machine.page(), CompositePage::Configuration);
    }

    #[test]
    fn access_denied_routes_to_access_denied_page() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c1", CallStatus::InLobby)));
        machine.derive(&ended(call("c1", CallStatus::InLobby), CallEndReason::new(403, 5854)));
        assert_eq!(machine.page(), CompositePage::AccessDeniedTeamsMeeting);
    }

    #[test]
    fn unknown_end_reason_returns_to_configuration() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c1", CallStatus::Connected)));
        machine.derive(&ended(call("c1", CallStatus::Connected), CallEndReason::new(487, 1)));
        assert_eq!(machine.page(), CompositePage::Configuration);
    }

    #[test]
    fn stale_ended_call_from_previous_call_is_ignored() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c2", CallStatus::Connected)));

        // Snapshot without a call still carries the end of an older call.
        machine.derive(&ended(call("c1", CallStatus::Connected), CallEndReason::new(0, 5300)));
        assert_eq!(machine.page(), CompositePage::Configuration);
    }

    #[test]
    fn ended_call_routes_only_once() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c1", CallStatus::Connected)));
        let removed = ended(call("c1", CallStatus::Connected), CallEndReason::new(0, 5300));
        machine.derive(&removed);
        machine.trigger(PageTrigger::Acknowledge);

        // The same leftover snapshot arrives again after acknowledging.
        machine.derive(&removed);
        assert_eq!(machine.page(), CompositePage::Configuration);
    }

    #[test]
    fn user_ended_call_never_routes_to_error_page() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c1", CallStatus::Connected)));

        machine.trigger(PageTrigger::End);
        assert_eq!(machine.page(), CompositePage::Configuration);

        // Teardown snapshot still has the call.
        machine.derive(&with_call(call("c1", CallStatus::Disconnecting)));
        assert_eq!(machine.page(), CompositePage::Configuration);

        machine.derive(&ended(call("c1", CallStatus::Connected), CallEndReason::new(0, 5300)));
        assert_eq!(machine.page(), CompositePage::Configuration);
    }

    #[test]
    fn hold_page_requires_capability() {
        let mut machine = PageStateMachine::new(Capabilities::minimal());
        machine.derive(&with_call(call("c1", CallStatus::LocalHold)));
        assert_eq!(machine.page(), CompositePage::Call);

        let mut machine = PageStateMachine::new(Capabilities::extended());
        machine.derive(&with_call(call("c1", CallStatus::LocalHold)));
        assert_eq!(machine.page(), CompositePage::Hold);
    }

    #[test]
    fn accepted_transfer_shows_transfer_page() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        let mut transferred = call("c1", CallStatus::Connected);
        transferred.transfer = Some(TransferState { target: "8:acs:bob".into(), accepted: true });
        machine.derive(&with_call(transferred));
        assert_eq!(machine.page(), CompositePage::Transfer);
    }

    #[test]
    fn dialpad_requires_pstn_and_call_page() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        machine.derive(&with_call(call("c1", CallStatus::Connected)));
        assert_eq!(machine.trigger(PageTrigger::OpenDialpad), None);

        let mut machine = PageStateMachine::new(Capabilities::extended());
        assert_eq!(machine.trigger(PageTrigger::OpenDialpad), None);
        machine.derive(&with_call(call("c1", CallStatus::Connected)));
        machine.trigger(PageTrigger::OpenDialpad);
        assert_eq!(machine.page(), CompositePage::Dialpad);

        // New snapshots keep the dialpad open.
        machine.derive(&with_call(call("c1", CallStatus::Connected)));
        assert_eq!(machine.page(), CompositePage::Dialpad);

        machine.trigger(PageTrigger::CloseDialpad);
        assert_eq!(machine.page(), CompositePage::Call);
    }

    #[test]
    fn error_trigger_rejects_non_error_pages() {
        let mut machine = PageStateMachine::new(Capabilities::default());
        assert_eq!(machine.trigger(PageTrigger::Error(CompositePage::Call)), None);
        assert_eq!(machine.page(), CompositePage::Configuration);

        machine.trigger(PageTrigger::Error(CompositePage::JoinCallFailedDueToNoNetwork));
        assert_eq!(machine.page(), CompositePage::JoinCallFailedDueToNoNetwork);
    }

    #[test]
    fn custom_routes_drop_non_terminal_pages() {
        let machine = PageStateMachine::new(Capabilities::default()).with_routes([
            EndReasonRoute { code: 1, sub_code: 1, page: CompositePage::Call },
            EndReasonRoute::ACCESS_DENIED,
        ]);
        assert_eq!(machine.routes, vec![EndReasonRoute::ACCESS_DENIED]);
    }
}
