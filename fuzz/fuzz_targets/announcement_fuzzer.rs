//! Fuzz target for the participant announcer
//!
//! # Strategy
//!
//! - Participant lists drawn from a small identifier pool so joins, leaves
//!   and renames all collide often
//! - Names: absent, empty, or arbitrary text including template
//!   placeholders like `{displayName}`
//!
//! # Invariants
//!
//! - Never panics
//! - Same (previous, current) pair always yields the same text
//! - Text is empty iff the identifier sets are equal
//! - Renaming without an identity change announces nothing
//! - Up to three joined names appear verbatim, placeholders included

#![no_main]

use std::collections::BTreeSet;

use arbitrary::Arbitrary;
use callframe_app::{announce, AnnouncedParticipant, AnnouncerStrings, ParticipantAnnouncer};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
struct Entry {
    slot: u8,
    name: Option<String>,
}

#[derive(Debug, Arbitrary)]
struct Input {
    previous: Vec<Entry>,
    current: Vec<Entry>,
}

fn participants(entries: &[Entry]) -> Vec<AnnouncedParticipant> {
    let mut seen = BTreeSet::new();
    entries
        .iter()
        .filter(|entry| seen.insert(entry.slot % 16))
        .map(|entry| AnnouncedParticipant::new(format!("8:acs:{}", entry.slot % 16), entry.name.as_deref()))
        .collect()
}

fn identifiers(list: &[AnnouncedParticipant]) -> BTreeSet<&str> {
    list.iter().map(|participant| participant.identifier.as_str()).collect()
}

fuzz_target!(|input: Input| {
    let strings = AnnouncerStrings::default();
    let previous = participants(&input.previous);
    let current = participants(&input.current);

    let first = announce(&strings, &previous, &current);
    let second = announce(&strings, &previous, &current);
    assert_eq!(first, second, "announcement not deterministic");
    assert_eq!(first.is_empty(), identifiers(&previous) == identifiers(&current));

    let before = identifiers(&previous);
    let joined: Vec<_> = current.iter().filter(|p| !before.contains(p.identifier.as_str())).collect();
    if joined.len() <= 3 {
        for name in joined.iter().filter_map(|p| p.display_name.as_deref()) {
            assert!(first.contains(name), "joined name {name:?} missing from {first:?}");
        }
    }

    let renamed: Vec<_> = current
        .iter()
        .map(|participant| AnnouncedParticipant::new(participant.identifier.clone(), Some("renamed")))
        .collect();
    assert!(announce(&strings, &current, &renamed).is_empty(), "rename announced");

    let mut announcer = ParticipantAnnouncer::new(strings);
    announcer.seed(&previous);
    assert_eq!(announcer.update(&current), first);
    assert!(announcer.update(&current).is_empty());
});
