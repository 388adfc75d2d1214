//! Participant join/leave announcements for screen readers.
//!
//! [`announce`] is a pure function of the previous and current lists of
//! present remote participants. Participants are matched by identifier only,
//! so a display name arriving late or changing never reads as a join.
//!
//! # Template selection
//!
//! Within the joined (or left) group, named participants are listed before
//! unnamed ones. Then, by group size:
//!
//! - several participants, none named: `unnamed_*`, counting everyone but
//!   the first as "others"
//! - one, two or three: the matching single/dual/triple template, with the
//!   unnamed placeholder standing in for missing names
//! - four or more: the first three names and the remaining count
//!
//! If both a join and a leave happened in the same transition, the join
//! text comes first.

use std::collections::BTreeSet;

/// Identity and name of a present remote participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnouncedParticipant {
    /// Flattened identifier.
    pub identifier: String,
    /// Display name, if known.
    pub display_name: Option<String>,
}

impl AnnouncedParticipant {
    /// Participant with the given identifier and optional name.
    pub fn new(identifier: impl Into<String>, display_name: Option<&str>) -> Self {
        Self { identifier: identifier.into(), display_name: display_name.map(str::to_owned) }
    }
}

/// Announcement templates.
///
/// Placeholders: `{displayName}`, `{displayName1}`..`{displayName3}` and
/// `{numOfParticipants}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncerStrings {
    /// One participant joined.
    pub participant_joined: String,
    /// Two participants joined.
    pub two_participants_joined: String,
    /// Three participants joined.
    pub three_participants_joined: String,
    /// Four or more participants joined.
    pub many_participants_joined: String,
    /// Several participants without names joined.
    pub unnamed_participants_joined: String,
    /// One participant left.
    pub participant_left: String,
    /// Two participants left.
    pub two_participants_left: String,
    /// Three participants left.
    pub three_participants_left: String,
    /// Four or more participants left.
    pub many_participants_left: String,
    /// Several participants without names left.
    pub unnamed_participants_left: String,
    /// Stands in for a participant without a display name.
    pub unnamed_participant: String,
}

impl Default for AnnouncerStrings {
    fn default() -> Self {
        Self {
            participant_joined: "{displayName} joined".into(),
            two_participants_joined: "{displayName1} and {displayName2} have joined".into(),
            three_participants_joined: "{displayName1}, {displayName2} and {displayName3} have joined"
                .into(),
            many_participants_joined:
                "{displayName1}, {displayName2}, {displayName3} and {numOfParticipants} other participants joined"
                    .into(),
            unnamed_participants_joined: "{displayName} and {numOfParticipants} other participants joined"
                .into(),
            participant_left: "{displayName} left".into(),
            two_participants_left: "{displayName1} and {displayName2} have left".into(),
            three_participants_left: "{displayName1}, {displayName2} and {displayName3} have left".into(),
            many_participants_left:
                "{displayName1}, {displayName2}, {displayName3} and {numOfParticipants} other participants left"
                    .into(),
            unnamed_participants_left: "{displayName} and {numOfParticipants} other participants left".into(),
            unnamed_participant: "unnamed participant".into(),
        }
    }
}

/// The five templates of one direction.
struct Templates<'a> {
    one: &'a str,
    two: &'a str,
    three: &'a str,
    many: &'a str,
    unnamed: &'a str,
}

impl AnnouncerStrings {
    fn joined(&self) -> Templates<'_> {
        Templates {
            one: &self.participant_joined,
            two: &self.two_participants_joined,
            three: &self.three_participants_joined,
            many: &self.many_participants_joined,
            unnamed: &self.unnamed_participants_joined,
        }
    }

    fn left(&self) -> Templates<'_> {
        Templates {
            one: &self.participant_left,
            two: &self.two_participants_left,
            three: &self.three_participants_left,
            many: &self.many_participants_left,
            unnamed: &self.unnamed_participants_left,
        }
    }
}

/// Announcement for the transition from `previous` to `current`. Empty if
/// nobody joined or left.
pub fn announce(
    strings: &AnnouncerStrings,
    previous: &[AnnouncedParticipant],
    current: &[AnnouncedParticipant],
) -> String {
    let joined = difference(current, previous);
    let left = difference(previous, current);

    let parts = [describe(strings, &strings.joined(), &joined), describe(strings, &strings.left(), &left)];
    parts.into_iter().filter(|part| !part.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Entries of `from` whose identifier is absent from `without`, in `from`
/// order.
fn difference<'a>(
    from: &'a [AnnouncedParticipant],
    without: &[AnnouncedParticipant],
) -> Vec<&'a AnnouncedParticipant> {
    let excluded: BTreeSet<&str> = without.iter().map(|p| p.identifier.as_str()).collect();
    from.iter().filter(|p| !excluded.contains(p.identifier.as_str())).collect()
}

fn describe(strings: &AnnouncerStrings, templates: &Templates<'_>, group: &[&AnnouncedParticipant]) -> String {
    if group.is_empty() {
        return String::new();
    }

    // Named first; stable, so each partition keeps its input order.
    let mut ordered = group.to_vec();
    ordered.sort_by_key(|p| p.display_name.is_none());
    let names: Vec<&str> = ordered
        .iter()
        .map(|p| p.display_name.as_deref().unwrap_or(&strings.unnamed_participant))
        .collect();

    let all_unnamed = ordered.iter().all(|p| p.display_name.is_none());
    let count = names.len();
    if all_unnamed && count > 1 {
        let others = (count - 1).to_string();
        return fill(templates.unnamed, &[("displayName", names[0]), ("numOfParticipants", others.as_str())]);
    }

    match *names.as_slice() {
        [one] => fill(templates.one, &[("displayName", one)]),
        [first, second] => fill(templates.two, &[("displayName1", first), ("displayName2", second)]),
        [first, second, third] => fill(
            templates.three,
            &[("displayName1", first), ("displayName2", second), ("displayName3", third)],
        ),
        [first, second, third, ..] => {
            let others = (count - 3).to_string();
            fill(
                templates.many,
                &[
                    ("displayName1", first),
                    ("displayName2", second),
                    ("displayName3", third),
                    ("numOfParticipants", others.as_str()),
                ],
            )
        },
        [] => String::new(),
    }
}

/// Substitute `{key}` placeholders in one pass. Inserted values are never
/// rescanned, so a name that looks like a placeholder stays verbatim.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let found = after.find('}').and_then(|close| {
            let key = &after[..close];
            values.iter().find(|(name, _)| *name == key).map(|(_, value)| (*value, close))
        });
        match found {
            Some((value, close)) => {
                text.push_str(value);
                rest = &after[close + 1..];
            },
            None => {
                text.push('{');
                rest = after;
            },
        }
    }
    text.push_str(rest);
    text
}

/// Stateful announcer that remembers the last participant list.
#[derive(Debug, Clone, Default)]
pub struct ParticipantAnnouncer {
    strings: AnnouncerStrings,
    previous: Vec<AnnouncedParticipant>,
}

impl ParticipantAnnouncer {
    /// Announcer with the given templates and nobody present.
    pub fn new(strings: AnnouncerStrings) -> Self {
        Self { strings, previous: Vec::new() }
    }

    /// Remember `current` without announcing anything.
    pub fn seed(&mut self, current: &[AnnouncedParticipant]) {
        self.previous = current.to_vec();
    }

    /// Announce the change from the remembered list to `current`, and
    /// remember `current`.
    pub fn update(&mut self, current: &[AnnouncedParticipant]) -> String {
        if self.previous.as_slice() == current {
            return String::new();
        }
        let text = announce(&self.strings, &self.previous, current);
        self.previous = current.to_vec();
        if !text.is_empty() {
            tracing::debug!(announcement = %text, "participant announcement");
        }
        text
    }

    /// The remembered list.
    pub fn previous(&self) -> &[AnnouncedParticipant] {
        &self.previous
    }
}
