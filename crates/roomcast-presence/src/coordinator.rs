//! Join/leave coordination for one room session.
//!
//! [`Coordinator`] is a synchronous state machine. It never touches the
//! network: each call returns the [`Effect`]s the caller must carry out
//! (subscribe, publish, register...) and the caller reports results back
//! through [`Coordinator::on_resend_complete`], [`Coordinator::on_live`] and
//! [`Coordinator::on_entry_failed`]. That keeps every ordering rule testable
//! without a runtime.
//!
//! ```text
//! enter()                → [Subscribe, RequestResend{from: created_at}]
//! on_live(..)            → buffered while Resolving, applied once Active
//! on_resend_complete(..) → [Publish(JOIN)?, RegisterMembership?, LogImpression]
//! leave()                → [Publish(LEAVE), Unsubscribe] or
//!                          [CancelResend, Unsubscribe] while Resolving
//! ```

use tokio::time::Instant;
use tracing::{debug, info};

use roomcast_protocol::{Event, EventKind, EventRecord, Glyph, Impression, ParticipantId, RoomId};

use crate::{
    Phase, PresenceConfig, PresenceError, ReactionBoard, Reconstruction, ReplayBuffer, Roster,
    RosterChange, reconstruct,
};

/// External room metadata, supplied by whoever lists rooms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub id: RoomId,
    /// Creation time in milliseconds; replay starts here.
    pub created_at: u64,
    /// Scheduled end in milliseconds.
    pub end_at: u64,
    /// Membership group backing the room, if it has one.
    pub group_id: Option<String>,
}

impl Room {
    pub fn new(id: RoomId, created_at: u64, end_at: u64) -> Self {
        Self {
            id,
            created_at,
            end_at,
            group_id: None,
        }
    }

    pub fn with_group_id(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    /// Returns `true` if the room's scheduled end is at or before `now_ms`.
    pub fn has_ended(&self, now_ms: u64) -> bool {
        now_ms >= self.end_at
    }
}

/// A side effect the runtime must perform on the coordinator's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open the live subscription.
    Subscribe,
    /// Request historical replay from `from` (milliseconds).
    RequestResend { from: u64 },
    /// Publish an event on the live channel. Best effort.
    Publish(Event),
    /// Register the participant with the room's membership group.
    RegisterMembership,
    /// Hand an impression to analytics. Fire and forget.
    LogImpression(Impression),
    /// Abandon an outstanding replay.
    CancelResend,
    /// Close the live subscription.
    Unsubscribe,
}

/// What a live event did to session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveUpdate {
    /// Held until replay completes.
    Buffered,
    /// A membership event reached the roster.
    Roster(RosterChange),
    /// A reaction was shown.
    Reaction {
        participant_id: ParticipantId,
        glyph: Glyph,
    },
    /// Not for this room.
    Ignored,
}

/// Drives entry and exit for a single participant in a single room.
#[derive(Debug)]
pub struct Coordinator {
    room: Room,
    self_id: ParticipantId,
    phase: Phase,
    live_buffer: Vec<EventRecord>,
    roster: Roster,
    reactions: ReactionBoard,
    self_joined: bool,
}

impl Coordinator {
    pub fn new(room: Room, self_id: ParticipantId, config: &PresenceConfig) -> Self {
        let roster = Roster::new(room.id.clone());
        Self {
            room,
            self_id,
            phase: Phase::NotEntered,
            live_buffer: Vec::new(),
            roster,
            reactions: ReactionBoard::new(config.reaction_ttl),
            self_joined: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    pub fn self_id(&self) -> &ParticipantId {
        &self.self_id
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn reactions(&self) -> &ReactionBoard {
        &self.reactions
    }

    /// Starts entry: subscribe first, then ask for replay.
    ///
    /// # Errors
    /// [`PresenceError::InvalidPhase`] unless the session is `NotEntered`.
    pub fn enter(&mut self) -> Result<Vec<Effect>, PresenceError> {
        self.require(Phase::NotEntered, "enter")?;
        self.live_buffer.clear();
        self.transition(Phase::Resolving);
        Ok(vec![
            Effect::Subscribe,
            Effect::RequestResend {
                from: self.room.created_at,
            },
        ])
    }

    /// Feeds one live record.
    ///
    /// Membership events are buffered while `Resolving` and applied in
    /// arrival order after the replay. Reactions never wait on the roster.
    ///
    /// # Errors
    /// [`PresenceError::InvalidPhase`] when not subscribed.
    pub fn on_live(&mut self, record: EventRecord, now: Instant) -> Result<LiveUpdate, PresenceError> {
        if !self.phase.is_live() {
            return Err(self.invalid("apply live event"));
        }
        if record.event.room_id != self.room.id {
            return Ok(LiveUpdate::Ignored);
        }

        let kind = record.event.kind;
        match kind {
            EventKind::Reaction => {
                let Some(glyph) = record.event.glyph else {
                    return Ok(LiveUpdate::Ignored);
                };
                let participant_id = record.event.participant_id;
                self.reactions.upsert(participant_id.clone(), glyph, now);
                Ok(LiveUpdate::Reaction {
                    participant_id,
                    glyph,
                })
            }
            EventKind::Join | EventKind::Leave if self.phase == Phase::Resolving => {
                self.live_buffer.push(record);
                Ok(LiveUpdate::Buffered)
            }
            EventKind::Join | EventKind::Leave => {
                let change = self.roster.apply(&record);
                if let RosterChange::Added(p) | RosterChange::Removed(p) = &change {
                    debug!(
                        room_id = %self.room.id,
                        participant_id = %p,
                        seq = record.seq,
                        kind = %record.event.kind,
                        "roster changed"
                    );
                }
                Ok(LiveUpdate::Roster(change))
            }
        }
    }

    /// Completes entry with the replayed history.
    ///
    /// Reconstructs the roster, applies buffered live events, then publishes
    /// the own JOIN and requests membership registration unless history
    /// already shows this participant as joined. Results that arrive after
    /// the session left are discarded.
    ///
    /// # Errors
    /// [`PresenceError::InvalidPhase`] unless `Resolving` (or `Left`).
    pub fn on_resend_complete(
        &mut self,
        history: Vec<EventRecord>,
        now: Instant,
    ) -> Result<Vec<Effect>, PresenceError> {
        if self.phase == Phase::Left {
            debug!(room_id = %self.room.id, "discarding replay after leave");
            return Ok(Vec::new());
        }
        self.require(Phase::Resolving, "complete replay")?;

        let mut replay = ReplayBuffer::new(self.room.id.clone());
        replay.extend(history);
        let reconstruction = reconstruct(&self.room.id, &self.self_id, replay.records());
        self.reconcile(reconstruction, now);
        Ok(self.self_join())
    }

    fn reconcile(&mut self, reconstruction: Reconstruction, now: Instant) {
        let self_has_prior_join = reconstruction.self_has_prior_join;
        self.roster = Roster::seeded(self.room.id.clone(), reconstruction);
        let buffered = std::mem::take(&mut self.live_buffer);
        let buffered_len = buffered.len();
        for record in buffered {
            self.roster.apply(&record);
        }
        // Reactions during replay were already shown; expire what is stale.
        self.reactions.expire(now);
        self.self_joined = self_has_prior_join;
        self.transition(Phase::Reconciled);
        debug!(
            room_id = %self.room.id,
            present = self.roster.len(),
            buffered = buffered_len,
            self_has_prior_join,
            "reconciled"
        );
    }

    fn self_join(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.self_joined {
            info!(
                room_id = %self.room.id,
                participant_id = %self.self_id,
                "already joined in history, skipping JOIN"
            );
        } else {
            let join = Event::join(self.room.id.clone(), self.self_id.clone());
            self.roster.apply_local(&join);
            effects.push(Effect::Publish(join));
            effects.push(Effect::RegisterMembership);
            self.self_joined = true;
        }
        self.transition(Phase::SelfJoined);

        let impression = Impression::join(self.room.id.clone(), self.self_id.clone())
            .with_group_id(self.room.group_id.clone());
        effects.push(Effect::LogImpression(impression));
        self.transition(Phase::Active);
        effects
    }

    /// Entry failed while `Resolving`: the connection, the subscription or
    /// the replay did not come through (or the replay timed out). Back to
    /// `NotEntered` so `enter` can be retried with the same room.
    ///
    /// # Errors
    /// [`PresenceError::InvalidPhase`] unless `Resolving` (or `Left`).
    pub fn on_entry_failed(&mut self) -> Result<Vec<Effect>, PresenceError> {
        if self.phase == Phase::Left {
            return Ok(Vec::new());
        }
        self.require(Phase::Resolving, "abort entry")?;
        self.live_buffer.clear();
        self.transition(Phase::NotEntered);
        Ok(vec![Effect::Unsubscribe])
    }

    /// Broadcasts a reaction from this participant and shows it locally.
    ///
    /// # Errors
    /// [`PresenceError::InvalidPhase`] unless `Active`.
    pub fn publish_reaction(&mut self, glyph: Glyph, now: Instant) -> Result<Vec<Effect>, PresenceError> {
        self.require(Phase::Active, "publish reaction")?;
        self.reactions.upsert(self.self_id.clone(), glyph, now);
        Ok(vec![Effect::Publish(Event::reaction(
            self.room.id.clone(),
            self.self_id.clone(),
            glyph,
        ))])
    }

    /// Exits the room.
    ///
    /// # Errors
    /// [`PresenceError::InvalidPhase`] if already `Left`.
    pub fn leave(&mut self) -> Result<Vec<Effect>, PresenceError> {
        let effects = match self.phase {
            Phase::Left => return Err(self.invalid("leave")),
            Phase::NotEntered => Vec::new(),
            Phase::Resolving => vec![Effect::CancelResend, Effect::Unsubscribe],
            Phase::Reconciled | Phase::SelfJoined | Phase::Active => vec![
                Effect::Publish(Event::leave(self.room.id.clone(), self.self_id.clone())),
                Effect::Unsubscribe,
            ],
        };
        self.live_buffer.clear();
        self.transition(Phase::Left);
        Ok(effects)
    }

    /// Drops reactions whose deadline has passed.
    pub fn expire_reactions(&mut self, now: Instant) -> Vec<ParticipantId> {
        self.reactions.expire(now)
    }

    /// When the next reaction expires, if any.
    pub fn next_reaction_deadline(&self) -> Option<Instant> {
        self.reactions.next_deadline()
    }

    fn require(&self, phase: Phase, operation: &'static str) -> Result<(), PresenceError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> PresenceError {
        PresenceError::InvalidPhase {
            phase: self.phase,
            operation,
        }
    }

    fn transition(&mut self, target: Phase) {
        debug_assert!(
            self.phase.can_transition_to(target),
            "illegal transition {} -> {}",
            self.phase,
            target
        );
        debug!(room_id = %self.room.id, from = %self.phase, to = %target, "phase transition");
        self.phase = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room::new(RoomId::new("space-1"), 1_000, 9_000)
    }

    fn p(id: &str) -> ParticipantId {
        ParticipantId::new(id)
    }

    fn coordinator(self_id: &str) -> Coordinator {
        Coordinator::new(room(), p(self_id), &PresenceConfig::default())
    }

    #[test]
    fn test_enter_subscribes_before_resend() {
        let mut c = coordinator("bob");
        let effects = c.enter().unwrap();
        assert_eq!(effects, vec![Effect::Subscribe, Effect::RequestResend { from: 1_000 }]);
        assert_eq!(c.phase(), Phase::Resolving);
    }

    #[test]
    fn test_enter_twice_is_invalid_phase() {
        let mut c = coordinator("bob");
        c.enter().unwrap();
        assert_eq!(
            c.enter(),
            Err(PresenceError::InvalidPhase {
                phase: Phase::Resolving,
                operation: "enter"
            })
        );
    }

    #[test]
    fn test_publish_reaction_before_active_is_rejected() {
        let mut c = coordinator("bob");
        assert!(c.publish_reaction(Glyph::Fire, Instant::now()).is_err());
        c.enter().unwrap();
        assert!(c.publish_reaction(Glyph::Fire, Instant::now()).is_err());
    }

    #[test]
    fn test_on_live_before_enter_is_rejected() {
        let mut c = coordinator("bob");
        let record = EventRecord::new(1, 0, Event::join(room().id, p("alice")));
        assert!(c.on_live(record, Instant::now()).is_err());
    }

    #[test]
    fn test_on_entry_failed_returns_to_not_entered() {
        let mut c = coordinator("bob");
        c.enter().unwrap();
        assert_eq!(c.on_entry_failed().unwrap(), vec![Effect::Unsubscribe]);
        assert_eq!(c.phase(), Phase::NotEntered);
        // Retry with the same room is allowed.
        assert!(c.enter().is_ok());
    }

    #[test]
    fn test_leave_before_enter_has_no_effects() {
        let mut c = coordinator("bob");
        assert_eq!(c.leave().unwrap(), Vec::new());
        assert_eq!(c.phase(), Phase::Left);
        assert!(c.leave().is_err());
    }

    #[test]
    fn test_on_resend_complete_impression_carries_group_id() {
        let room = room().with_group_id("0x2a");
        let mut c = Coordinator::new(room, p("bob"), &PresenceConfig::default());
        c.enter().unwrap();

        let effects = c.on_resend_complete(Vec::new(), Instant::now()).unwrap();

        let impression = effects.iter().find_map(|e| match e {
            Effect::LogImpression(i) => Some(i),
            _ => None,
        });
        assert_eq!(
            impression.and_then(|i| i.group_id.as_deref()),
            Some("0x2a")
        );
    }

    #[test]
    fn test_room_has_ended() {
        assert!(!room().has_ended(8_999));
        assert!(room().has_ended(9_000));
    }
}
