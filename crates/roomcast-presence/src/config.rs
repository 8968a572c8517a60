//! Presence configuration and the session phase machine.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// PresenceConfig
// ---------------------------------------------------------------------------

/// Timing knobs for one room session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// How long a reaction stays visible after it is received.
    pub reaction_ttl: Duration,

    /// Upper bound on each wait during entry: the subscribe acknowledgment,
    /// then historical replay.
    pub resend_timeout: Duration,
}

impl PresenceConfig {
    pub const MIN_REACTION_TTL: Duration = Duration::from_millis(100);
    pub const MAX_REACTION_TTL: Duration = Duration::from_secs(60);
    pub const MIN_RESEND_TIMEOUT: Duration = Duration::from_millis(100);
    pub const MAX_RESEND_TIMEOUT: Duration = Duration::from_secs(300);

    /// Clamps every field into its supported range.
    pub fn validated(mut self) -> Self {
        let ttl = self
            .reaction_ttl
            .clamp(Self::MIN_REACTION_TTL, Self::MAX_REACTION_TTL);
        if ttl != self.reaction_ttl {
            warn!(
                requested_ms = self.reaction_ttl.as_millis() as u64,
                clamped_ms = ttl.as_millis() as u64,
                "reaction_ttl out of range, clamping"
            );
            self.reaction_ttl = ttl;
        }

        let timeout = self
            .resend_timeout
            .clamp(Self::MIN_RESEND_TIMEOUT, Self::MAX_RESEND_TIMEOUT);
        if timeout != self.resend_timeout {
            warn!(
                requested_ms = self.resend_timeout.as_millis() as u64,
                clamped_ms = timeout.as_millis() as u64,
                "resend_timeout out of range, clamping"
            );
            self.resend_timeout = timeout;
        }
        self
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            reaction_ttl: Duration::from_millis(2000),
            resend_timeout: Duration::from_secs(10),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Where a room session is in its join/leave lifecycle.
///
/// The forward path is strictly ordered:
///
/// ```text
/// NotEntered → Resolving → Reconciled → SelfJoined → Active → Left
/// ```
///
/// - **NotEntered**: nothing subscribed yet.
/// - **Resolving**: subscribed, waiting on historical replay. Live events
///   are buffered.
/// - **Reconciled**: replay reduced to a roster, buffered events applied.
/// - **SelfJoined**: own JOIN published (or found in history).
/// - **Active**: steady state; live events and reactions flow.
/// - **Left**: exited. Terminal.
///
/// Two side exits exist: a failed replay drops `Resolving` back to
/// `NotEntered` so entry can be retried, and leaving is allowed from any
/// phase except `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    NotEntered,
    Resolving,
    Reconciled,
    SelfJoined,
    Active,
    Left,
}

impl Phase {
    /// The next phase on the forward path, or `None` from `Left`.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::NotEntered => Some(Self::Resolving),
            Self::Resolving => Some(Self::Reconciled),
            Self::Reconciled => Some(Self::SelfJoined),
            Self::SelfJoined => Some(Self::Active),
            Self::Active => Some(Self::Left),
            Self::Left => None,
        }
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        if self.next() == Some(target) {
            return true;
        }
        match target {
            Self::NotEntered => self == Self::Resolving,
            Self::Left => self != Self::Left,
            _ => false,
        }
    }

    /// Returns `true` once entry has completed.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` while subscribed and not yet left.
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Resolving | Self::Reconciled | Self::SelfJoined | Self::Active
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotEntered => "NotEntered",
            Self::Resolving => "Resolving",
            Self::Reconciled => "Reconciled",
            Self::SelfJoined => "SelfJoined",
            Self::Active => "Active",
            Self::Left => "Left",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_next_follows_strict_order() {
        assert_eq!(Phase::NotEntered.next(), Some(Phase::Resolving));
        assert_eq!(Phase::Resolving.next(), Some(Phase::Reconciled));
        assert_eq!(Phase::Reconciled.next(), Some(Phase::SelfJoined));
        assert_eq!(Phase::SelfJoined.next(), Some(Phase::Active));
        assert_eq!(Phase::Active.next(), Some(Phase::Left));
        assert_eq!(Phase::Left.next(), None);
    }

    #[test]
    fn test_phase_can_transition_to_side_exits() {
        assert!(Phase::Resolving.can_transition_to(Phase::NotEntered));
        assert!(Phase::Resolving.can_transition_to(Phase::Left));
        assert!(Phase::NotEntered.can_transition_to(Phase::Left));
        assert!(!Phase::Active.can_transition_to(Phase::NotEntered));
        assert!(!Phase::NotEntered.can_transition_to(Phase::Active));
        assert!(!Phase::Left.can_transition_to(Phase::Left));
    }

    #[test]
    fn test_phase_is_live() {
        assert!(!Phase::NotEntered.is_live());
        assert!(Phase::Resolving.is_live());
        assert!(Phase::Active.is_live());
        assert!(!Phase::Left.is_live());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::NotEntered.to_string(), "NotEntered");
        assert_eq!(Phase::SelfJoined.to_string(), "SelfJoined");
    }

    #[test]
    fn test_presence_config_default() {
        let config = PresenceConfig::default();
        assert_eq!(config.reaction_ttl, Duration::from_millis(2000));
        assert_eq!(config.resend_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_presence_config_validated_clamps_out_of_range() {
        let config = PresenceConfig {
            reaction_ttl: Duration::ZERO,
            resend_timeout: Duration::from_secs(3600),
        }
        .validated();
        assert_eq!(config.reaction_ttl, PresenceConfig::MIN_REACTION_TTL);
        assert_eq!(config.resend_timeout, PresenceConfig::MAX_RESEND_TIMEOUT);
    }

    #[test]
    fn test_presence_config_validated_keeps_defaults() {
        assert_eq!(
            PresenceConfig::default().validated(),
            PresenceConfig::default()
        );
    }

    #[test]
    fn test_presence_config_serde_json() {
        let json = serde_json::to_string(&PresenceConfig::default()).unwrap();
        let back: PresenceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PresenceConfig::default());
    }
}
