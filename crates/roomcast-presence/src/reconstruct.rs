//! Presence reconstruction from historical replay.
//!
//! The channel log is the only source of truth for who is in a room. On
//! entry a session replays every event since the room was created and
//! reduces it here: for each participant only the last JOIN/LEAVE by `seq`
//! counts, and they are present iff that last event is a JOIN.

use std::collections::{BTreeSet, HashMap};

use roomcast_protocol::{EventKind, EventRecord, ParticipantId, RoomId};

/// Collects replayed records for one room, dropping everything that cannot
/// affect membership (other rooms, reactions).
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    room_id: RoomId,
    records: Vec<EventRecord>,
}

impl ReplayBuffer {
    /// Creates an empty buffer for `room_id`.
    pub fn new(room_id: RoomId) -> Self {
        Self {
            room_id,
            records: Vec::new(),
        }
    }

    /// Adds a record. Returns `false` if it was filtered out.
    pub fn push(&mut self, record: EventRecord) -> bool {
        if record.event.room_id != self.room_id || !record.event.is_membership() {
            return false;
        }
        self.records.push(record);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The accepted records, in arrival order.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }
}

impl Extend<EventRecord> for ReplayBuffer {
    fn extend<I: IntoIterator<Item = EventRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}

/// The canonical starting state for a room session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconstruction {
    /// Participants whose last membership event is JOIN.
    pub present: BTreeSet<ParticipantId>,
    /// Whether the local participant's own last event is JOIN.
    pub self_has_prior_join: bool,
    /// Highest membership `seq` seen per participant.
    pub last_seq: HashMap<ParticipantId, u64>,
}

/// Reduces a history slice to the set of present participants.
///
/// Records are compared by `seq` only; wall-clock timestamps never decide
/// order. The result does not depend on the order of `history`, and a
/// record delivered twice (same `seq`) counts once.
pub fn reconstruct(
    room_id: &RoomId,
    self_id: &ParticipantId,
    history: &[EventRecord],
) -> Reconstruction {
    let mut last: HashMap<&ParticipantId, (u64, EventKind)> = HashMap::new();

    for record in history {
        let event = &record.event;
        if event.room_id != *room_id || !event.is_membership() {
            continue;
        }
        last.entry(&event.participant_id)
            .and_modify(|(seq, kind)| {
                if record.seq > *seq {
                    *seq = record.seq;
                    *kind = event.kind;
                }
            })
            .or_insert((record.seq, event.kind));
    }

    let mut reconstruction = Reconstruction::default();
    for (participant, (seq, kind)) in last {
        if kind == EventKind::Join {
            reconstruction.present.insert(participant.clone());
        }
        reconstruction.last_seq.insert(participant.clone(), seq);
    }
    reconstruction.self_has_prior_join = reconstruction.present.contains(self_id);

    tracing::debug!(
        %room_id,
        records = history.len(),
        present = reconstruction.present.len(),
        self_has_prior_join = reconstruction.self_has_prior_join,
        "presence reconstructed"
    );
    reconstruction
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomcast_protocol::{Event, Glyph};

    fn room() -> RoomId {
        RoomId::new("space-1")
    }

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn join(seq: u64, who: &str) -> EventRecord {
        EventRecord::new(seq, seq * 10, Event::join(room(), p(who)))
    }

    fn leave(seq: u64, who: &str) -> EventRecord {
        EventRecord::new(seq, seq * 10, Event::leave(room(), p(who)))
    }

    #[test]
    fn test_reconstruct_empty_history_is_empty() {
        let r = reconstruct(&room(), &p("bob"), &[]);
        assert!(r.present.is_empty());
        assert!(!r.self_has_prior_join);
    }

    #[test]
    fn test_reconstruct_last_event_join_is_present() {
        let r = reconstruct(&room(), &p("bob"), &[join(1, "alice"), leave(2, "alice"), join(3, "alice")]);
        assert_eq!(r.present, BTreeSet::from([p("alice")]));
        assert_eq!(r.last_seq[&p("alice")], 3);
    }

    #[test]
    fn test_reconstruct_last_event_leave_is_absent() {
        let r = reconstruct(&room(), &p("bob"), &[join(1, "alice"), leave(2, "alice")]);
        assert!(r.present.is_empty());
        assert_eq!(r.last_seq[&p("alice")], 2);
    }

    #[test]
    fn test_reconstruct_orders_by_seq_not_timestamp() {
        // LEAVE has the later seq but an earlier timestamp.
        let history = [
            EventRecord::new(1, 500, Event::join(room(), p("alice"))),
            EventRecord::new(2, 100, Event::leave(room(), p("alice"))),
        ];
        let r = reconstruct(&room(), &p("bob"), &history);
        assert!(r.present.is_empty());
    }

    #[test]
    fn test_reconstruct_is_order_independent() {
        let r = reconstruct(&room(), &p("bob"), &[join(3, "alice"), leave(2, "alice"), join(1, "alice")]);
        assert!(r.present.contains(&p("alice")));
    }

    #[test]
    fn test_reconstruct_duplicate_delivery_counts_once() {
        let once = reconstruct(&room(), &p("bob"), &[join(1, "alice"), leave(2, "carol")]);
        let twice = reconstruct(
            &room(),
            &p("bob"),
            &[join(1, "alice"), join(1, "alice"), leave(2, "carol"), leave(2, "carol")],
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn test_reconstruct_ignores_other_rooms_and_reactions() {
        let history = [
            EventRecord::new(1, 0, Event::join(RoomId::new("elsewhere"), p("alice"))),
            EventRecord::new(2, 0, Event::reaction(room(), p("carol"), Glyph::Fire)),
        ];
        let r = reconstruct(&room(), &p("bob"), &history);
        assert!(r.present.is_empty());
        assert!(r.last_seq.is_empty());
    }

    #[test]
    fn test_reconstruct_detects_prior_self_join() {
        let r = reconstruct(&room(), &p("alice"), &[join(1, "alice")]);
        assert!(r.self_has_prior_join);

        let r = reconstruct(&room(), &p("alice"), &[join(1, "alice"), leave(2, "alice")]);
        assert!(!r.self_has_prior_join);
    }

    #[test]
    fn test_replay_buffer_filters_on_push() {
        let mut buffer = ReplayBuffer::new(room());
        assert!(buffer.push(join(1, "alice")));
        assert!(!buffer.push(EventRecord::new(2, 0, Event::reaction(room(), p("a"), Glyph::Star))));
        assert!(!buffer.push(EventRecord::new(3, 0, Event::join(RoomId::new("x"), p("a")))));
        buffer.extend([leave(4, "alice")]);
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.records()[1].seq, 4);
    }
}
