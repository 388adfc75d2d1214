//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to a composite. They are
//! generated randomly by proptest or the fuzzers and applied to a
//! [`MockCallAdapter`].

use arbitrary::Arbitrary;
use callframe_core::{CallEndReason, JoinCallOptions, PageTrigger};

use crate::MockCallAdapter;

/// Number of distinct remote participant slots.
///
/// Kept small so generated sequences revisit the same participants.
const PARTICIPANT_SLOTS: u8 = 8;

/// Flattened identifier of the participant in `slot`.
pub fn participant_id(slot: u8) -> String {
    format!("8:acs:participant-{}", slot % PARTICIPANT_SLOTS)
}

fn participant_name(slot: u8, named: bool) -> Option<String> {
    named.then(|| format!("Participant {}", slot % PARTICIPANT_SLOTS))
}

/// How the service ends the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum EndChoice {
    /// Ordinary hang up.
    Normal,
    /// Removed by an organizer.
    Removed,
    /// Denied access to a Teams meeting.
    AccessDenied,
    /// Any other code pair.
    Other {
        /// Call end code.
        code: u16,
        /// Call end sub code.
        sub_code: u16,
    },
}

impl EndChoice {
    /// End reason reported by the service.
    pub fn reason(self) -> CallEndReason {
        match self {
            Self::Normal => CallEndReason::new(0, 0),
            Self::Removed => CallEndReason::new(0, 5300),
            Self::AccessDenied => CallEndReason::new(403, 5854),
            Self::Other { code, sub_code } => CallEndReason::new(code.into(), sub_code.into()),
        }
    }
}

/// Operations that can be applied to a composite.
///
/// Operations are designed to be small and composable so proptest can
/// explore interesting combinations. Operations that do not apply to the
/// current state (a participant leaving when there is no call) are no-ops.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// The local user joins.
    Join {
        /// Target is a Teams meeting that requires lobby admission.
        teams: bool,
        /// Join with the camera on.
        camera_on: bool,
    },

    /// The call is parked in the lobby.
    EnterLobby,

    /// The call connects or the user is admitted.
    Connect,

    /// A remote participant connects.
    ParticipantJoins {
        /// Participant slot.
        slot: u8,
        /// Whether the display name is known immediately.
        named: bool,
    },

    /// A remote participant leaves.
    ParticipantLeaves {
        /// Participant slot.
        slot: u8,
    },

    /// A remote participant's display name arrives.
    Rename {
        /// Participant slot.
        slot: u8,
    },

    /// A remote participant mutes or unmutes.
    MuteParticipant {
        /// Participant slot.
        slot: u8,
        /// New mute state.
        muted: bool,
    },

    /// The local user holds the call.
    Hold,

    /// The call resumes from hold.
    Resume,

    /// A transfer is requested and accepted.
    AcceptTransfer,

    /// The local user is moved to a breakout room which is then closed.
    CloseBreakoutRoom,

    /// The service ends the call.
    EndCall {
        /// End reason.
        reason: EndChoice,
    },

    /// The local user leaves.
    Leave,

    /// The user dismisses an error page.
    Acknowledge,

    /// The dialpad is opened or closed.
    Dialpad {
        /// Open rather than close.
        open: bool,
    },

    /// Advance simulation time.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
}

impl Operation {
    /// Apply to the adapter. Returns false if the operation did not apply.
    pub fn apply(&self, adapter: &MockCallAdapter) -> bool {
        match *self {
            Self::Join { teams, camera_on } => {
                adapter.set_call_kind(teams, false);
                adapter.join_now(JoinCallOptions { microphone_on: true, camera_on }).is_ok()
            },
            Self::EnterLobby => adapter.enter_lobby(),
            Self::Connect => adapter.connect(),
            Self::ParticipantJoins { slot, named } => {
                let name = participant_name(slot, named);
                adapter.participant_joins(&participant_id(slot), name.as_deref())
            },
            Self::ParticipantLeaves { slot } => adapter.participant_leaves(&participant_id(slot)),
            Self::Rename { slot } => {
                let name = participant_name(slot, true);
                adapter.rename_participant(&participant_id(slot), name.as_deref())
            },
            Self::MuteParticipant { slot, muted } => adapter.set_participant_muted(&participant_id(slot), muted),
            Self::Hold => adapter.hold(),
            Self::Resume => adapter.resume(),
            Self::AcceptTransfer => adapter.request_transfer("8:acs:transfer-target") && adapter.accept_transfer(),
            Self::CloseBreakoutRoom => adapter.assign_breakout_room("Room 1") && adapter.close_breakout_room(),
            Self::EndCall { reason } => adapter.end_call(reason.reason()),
            Self::Leave => adapter.leave_now(false).is_ok(),
            Self::Acknowledge => adapter.store().trigger(PageTrigger::Acknowledge).is_some(),
            Self::Dialpad { open } => {
                let trigger = if open { PageTrigger::OpenDialpad } else { PageTrigger::CloseDialpad };
                adapter.store().trigger(trigger).is_some()
            },
            Self::AdvanceTime { millis } => {
                adapter.clock().advance(millis.into());
                true
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use callframe_core::CompositePage;

    use super::*;

    #[test]
    fn participant_slots_wrap() {
        assert_eq!(participant_id(3), participant_id(3 + PARTICIPANT_SLOTS));
    }

    #[test]
    fn removal_sequence_lands_on_removed_page() {
        let adapter = MockCallAdapter::local_user("8:acs:me", None);
        let ops = [
            Operation::Join { teams: false, camera_on: false },
            Operation::Connect,
            Operation::ParticipantJoins { slot: 1, named: true },
            Operation::EndCall { reason: EndChoice::Removed },
        ];
        for op in &ops {
            assert!(op.apply(&adapter), "{op:?} did not apply");
        }
        assert_eq!(adapter.store().page(), CompositePage::RemovedFromCall);

        assert!(Operation::Acknowledge.apply(&adapter));
        assert_eq!(adapter.store().page(), CompositePage::Configuration);
    }

    #[test]
    fn operations_without_call_are_noops() {
        let adapter = MockCallAdapter::local_user("8:acs:me", None);
        assert!(!Operation::ParticipantLeaves { slot: 0 }.apply(&adapter));
        assert!(!Operation::Leave.apply(&adapter));
        assert!(!Operation::Hold.apply(&adapter));
    }
}
