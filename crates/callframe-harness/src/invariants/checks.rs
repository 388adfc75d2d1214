//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use callframe_core::{AdapterState, CallStatus, CompositePage};

use super::{Invariant, InvariantKind, InvariantResult, Violation};

/// In-call pages require a call.
///
/// Lobby, call, hold, transfer and dialpad all render call state. Showing
/// one with `call` absent would render an empty call.
pub struct CallPageRequiresCall;

impl Invariant for CallPageRequiresCall {
    fn kind(&self) -> InvariantKind {
        InvariantKind::CallPageRequiresCall
    }

    fn check(&self, state: &AdapterState) -> InvariantResult {
        if state.call.is_none() && state.page.requires_call() {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("page {} shown without a call", state.page.as_str()),
            });
        }
        Ok(())
    }
}

/// The retired call is never the active call.
pub struct EndedCallDistinct;

impl Invariant for EndedCallDistinct {
    fn kind(&self) -> InvariantKind {
        InvariantKind::EndedCallDistinct
    }

    fn check(&self, state: &AdapterState) -> InvariantResult {
        if let (Some(call), Some(ended)) = (&state.call, &state.ended_call)
            && call.id == ended.id
        {
            return Err(Violation {
                invariant: self.kind(),
                message: format!("call {} is both active and ended", call.id),
            });
        }
        Ok(())
    }
}

/// The lobby page is only shown while the call waits for admission.
///
/// A call that is being torn down keeps its page until the call object is
/// gone, so disconnecting statuses are accepted too.
pub struct LobbyMatchesStatus;

impl Invariant for LobbyMatchesStatus {
    fn kind(&self) -> InvariantKind {
        InvariantKind::LobbyMatchesStatus
    }

    fn check(&self, state: &AdapterState) -> InvariantResult {
        if state.page != CompositePage::Lobby {
            return Ok(());
        }
        let status = state.call_status();
        if status.is_pre_admission() || matches!(status, CallStatus::Disconnecting | CallStatus::Disconnected) {
            return Ok(());
        }
        Err(Violation {
            invariant: self.kind(),
            message: format!("lobby page shown for call in status {status:?}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use callframe_core::{CallId, CallState, Timestamp};

    use super::*;

    fn with_call(page: CompositePage, status: CallStatus) -> AdapterState {
        AdapterState {
            page,
            call: Some(CallState::new(CallId::new("c1"), status, Timestamp::ZERO)),
            ..AdapterState::default()
        }
    }

    #[test]
    fn call_page_without_call_is_flagged() {
        let state = AdapterState { page: CompositePage::Hold, ..AdapterState::default() };
        let violation = CallPageRequiresCall.check(&state).unwrap_err();
        assert_eq!(violation.invariant, InvariantKind::CallPageRequiresCall);
    }

    #[test]
    fn error_pages_do_not_need_a_call() {
        let state = AdapterState { page: CompositePage::RemovedFromCall, ..AdapterState::default() };
        assert!(CallPageRequiresCall.check(&state).is_ok());
    }

    #[test]
    fn shadowed_ended_call_is_flagged() {
        let mut state = with_call(CompositePage::Call, CallStatus::Connected);
        state.ended_call = state.call.clone();
        assert!(EndedCallDistinct.check(&state).is_err());
    }

    #[test]
    fn lobby_with_connected_call_is_flagged() {
        assert!(LobbyMatchesStatus.check(&with_call(CompositePage::Lobby, CallStatus::InLobby)).is_ok());
        assert!(LobbyMatchesStatus.check(&with_call(CompositePage::Lobby, CallStatus::Disconnecting)).is_ok());
        assert!(LobbyMatchesStatus.check(&with_call(CompositePage::Lobby, CallStatus::Connected)).is_err());
    }
}
