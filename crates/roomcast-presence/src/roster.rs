//! The live roster: who is in the room right now.

use std::collections::{BTreeSet, HashMap};

use roomcast_protocol::{Event, EventKind, EventRecord, ParticipantId, RoomId};

use crate::Reconstruction;

/// What a single [`Roster::apply`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterChange {
    /// The participant was absent and is now present.
    Added(ParticipantId),
    /// The participant was present and is now absent.
    Removed(ParticipantId),
    /// Valid for this room, but membership did not change (already present,
    /// already absent, or a stale/duplicate record).
    Unchanged,
    /// Not a membership event for this room.
    Ignored,
}

impl RosterChange {
    /// Returns `true` if membership changed.
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Added(_) | Self::Removed(_))
    }
}

/// Set of present participants for one room, kept up to date from live
/// events.
///
/// The roster remembers the highest `seq` applied per participant and drops
/// anything at or below it, so duplicate delivery and overlap between replay
/// and the live buffer cannot flip membership backwards.
#[derive(Debug, Clone)]
pub struct Roster {
    room_id: RoomId,
    present: BTreeSet<ParticipantId>,
    last_seq: HashMap<ParticipantId, u64>,
}

impl Roster {
    /// An empty roster for `room_id`.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            present: BTreeSet::new(),
            last_seq: HashMap::new(),
        }
    }

    /// A roster starting from a reconstruction.
    pub fn seeded(room_id: RoomId, reconstruction: Reconstruction) -> Self {
        Self {
            room_id,
            present: reconstruction.present,
            last_seq: reconstruction.last_seq,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Applies a delivered record.
    pub fn apply(&mut self, record: &EventRecord) -> RosterChange {
        let event = &record.event;
        if event.room_id != self.room_id || !event.is_membership() {
            return RosterChange::Ignored;
        }
        if let Some(&seen) = self.last_seq.get(&event.participant_id) {
            if record.seq <= seen {
                tracing::trace!(
                    room_id = %self.room_id,
                    participant_id = %event.participant_id,
                    seq = record.seq,
                    seen,
                    "stale membership record"
                );
                return RosterChange::Unchanged;
            }
        }
        self.last_seq
            .insert(event.participant_id.clone(), record.seq);
        self.set(event)
    }

    /// Applies a locally originated event that has no `seq` yet. Used for
    /// the session's own JOIN; bypasses the staleness check.
    pub fn apply_local(&mut self, event: &Event) -> RosterChange {
        if event.room_id != self.room_id || !event.is_membership() {
            return RosterChange::Ignored;
        }
        self.set(event)
    }

    fn set(&mut self, event: &Event) -> RosterChange {
        let participant = &event.participant_id;
        match event.kind {
            EventKind::Join if self.present.insert(participant.clone()) => {
                RosterChange::Added(participant.clone())
            }
            EventKind::Leave if self.present.remove(participant) => {
                RosterChange::Removed(participant.clone())
            }
            EventKind::Join | EventKind::Leave => RosterChange::Unchanged,
            EventKind::Reaction => RosterChange::Ignored,
        }
    }

    pub fn contains(&self, participant: &ParticipantId) -> bool {
        self.present.contains(participant)
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Present participants in sorted order.
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.present.iter()
    }

    /// Owned, sorted copy of the present set.
    pub fn snapshot(&self) -> Vec<ParticipantId> {
        self.present.iter().cloned().collect()
    }
}
