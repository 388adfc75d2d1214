//! Seeded participant churn.
//!
//! [`ChurnGenerator`] produces a reproducible stream of [`Operation`]s for a
//! connected call: participants joining, leaving, getting their names, and
//! muting. The same seed always yields the same stream.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{EndChoice, Operation};

/// Deterministic stream of in-call operations.
#[derive(Debug, Clone)]
pub struct ChurnGenerator {
    rng: ChaCha8Rng,
    max_participants: u8,
}

impl ChurnGenerator {
    /// Generator seeded with `seed`, drawing participants from
    /// `max_participants` slots.
    pub fn new(seed: u64, max_participants: u8) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed), max_participants: max_participants.max(1) }
    }

    /// Next churn operation.
    pub fn next_operation(&mut self) -> Operation {
        let slot = self.rng.gen_range(0..self.max_participants);
        match self.rng.gen_range(0..10u8) {
            0..=3 => Operation::ParticipantJoins { slot, named: self.rng.gen_bool(0.75) },
            4..=5 => Operation::ParticipantLeaves { slot },
            6 => Operation::Rename { slot },
            7 => Operation::MuteParticipant { slot, muted: self.rng.gen_bool(0.5) },
            _ => Operation::AdvanceTime { millis: self.rng.gen_range(100..2_000) },
        }
    }

    /// Operation that ends the call, drawn from the same stream.
    pub fn ending(&mut self) -> Operation {
        let reason = match self.rng.gen_range(0..4u8) {
            0 => EndChoice::Removed,
            1 => EndChoice::AccessDenied,
            _ => EndChoice::Normal,
        };
        Operation::EndCall { reason }
    }
}

impl Iterator for ChurnGenerator {
    type Item = Operation;

    fn next(&mut self) -> Option<Operation> {
        Some(self.next_operation())
    }
}
