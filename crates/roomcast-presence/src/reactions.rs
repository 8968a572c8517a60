//! Ephemeral per-participant reactions.
//!
//! Each participant shows at most one reaction at a time. A new one replaces
//! the old one and restarts its timer; timers of different participants are
//! independent. Nothing is queued.

use std::collections::HashMap;
use std::time::Duration;

use roomcast_protocol::{Glyph, ParticipantId};
use tokio::time::Instant;

/// A visible reaction and the instant it disappears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaction {
    pub glyph: Glyph,
    pub expires_at: Instant,
}

impl Reaction {
    /// Visible strictly before `expires_at`.
    pub fn is_visible(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Reaction state for one room session.
///
/// Uses `tokio::time::Instant` so expiry follows the runtime clock, which
/// tests can pause and advance.
#[derive(Debug, Clone)]
pub struct ReactionBoard {
    ttl: Duration,
    entries: HashMap<ParticipantId, Reaction>,
}

impl ReactionBoard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Shows `glyph` for `participant` until `now + ttl`, replacing whatever
    /// they showed before. Returns the new deadline.
    pub fn upsert(&mut self, participant: ParticipantId, glyph: Glyph, now: Instant) -> Instant {
        let expires_at = now + self.ttl;
        self.entries.insert(participant, Reaction { glyph, expires_at });
        expires_at
    }

    /// The glyph `participant` is showing at `now`, if any.
    pub fn get(&self, participant: &ParticipantId, now: Instant) -> Option<Glyph> {
        self.entries
            .get(participant)
            .filter(|r| r.is_visible(now))
            .map(|r| r.glyph)
    }

    /// All reactions visible at `now`, sorted by participant.
    pub fn visible(&self, now: Instant) -> Vec<(ParticipantId, Glyph)> {
        let mut visible: Vec<_> = self
            .entries
            .iter()
            .filter(|(_, r)| r.is_visible(now))
            .map(|(p, r)| (p.clone(), r.glyph))
            .collect();
        visible.sort_by(|a, b| a.0.cmp(&b.0));
        visible
    }

    /// Drops every entry whose deadline is at or before `now` and returns
    /// whose reactions went away.
    pub fn expire(&mut self, now: Instant) -> Vec<ParticipantId> {
        let expired: Vec<ParticipantId> = self
            .entries
            .iter()
            .filter(|(_, r)| !r.is_visible(now))
            .map(|(p, _)| p.clone())
            .collect();
        for participant in &expired {
            self.entries.remove(participant);
        }
        expired
    }

    /// Earliest pending deadline, for scheduling the next [`expire`](Self::expire).
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.values().map(|r| r.expires_at).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_millis(2000);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn alice() -> ParticipantId {
        ParticipantId::new("alice")
    }

    fn bob() -> ParticipantId {
        ParticipantId::new("bob")
    }

    #[test]
    fn test_get_visible_until_just_before_deadline() {
        let t = Instant::now();
        let mut board = ReactionBoard::new(TTL);
        board.upsert(alice(), Glyph::Clap, t);

        assert_eq!(board.get(&alice(), t + ms(1999)), Some(Glyph::Clap));
        assert_eq!(board.get(&alice(), t + ms(2000)), None);
        assert_eq!(board.get(&alice(), t + ms(2001)), None);
    }

    #[test]
    fn test_upsert_replaces_and_resets_timer() {
        let t = Instant::now();
        let mut board = ReactionBoard::new(TTL);
        board.upsert(alice(), Glyph::Clap, t);
        let deadline = board.upsert(alice(), Glyph::Rocket, t + ms(500));

        assert_eq!(deadline, t + ms(2500));
        assert_eq!(board.get(&alice(), t + ms(2100)), Some(Glyph::Rocket));
        assert_eq!(board.get(&alice(), t + ms(2500)), None);
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_expire_removes_only_due_entries() {
        let t = Instant::now();
        let mut board = ReactionBoard::new(TTL);
        board.upsert(alice(), Glyph::Fire, t);
        board.upsert(bob(), Glyph::Star, t + ms(1000));

        let expired = board.expire(t + ms(2000));

        assert_eq!(expired, vec![alice()]);
        assert_eq!(board.visible(t + ms(2000)), vec![(bob(), Glyph::Star)]);
        assert_eq!(board.next_deadline(), Some(t + ms(3000)));
    }

    #[test]
    fn test_next_deadline_empty_is_none() {
        let board = ReactionBoard::new(TTL);
        assert_eq!(board.next_deadline(), None);
        assert!(board.is_empty());
    }

    #[test]
    fn test_visible_sorted_by_participant() {
        let t = Instant::now();
        let mut board = ReactionBoard::new(TTL);
        board.upsert(bob(), Glyph::Money, t);
        board.upsert(alice(), Glyph::Party, t);

        assert_eq!(
            board.visible(t),
            vec![(alice(), Glyph::Party), (bob(), Glyph::Money)]
        );
    }
}
